//! Engine objects, their variables and the configuration store
//!
//! Variables are read and written through the untagged variant union. Each
//! accessor interprets only the member that matches its declared type.

use std::ffi::{ c_int, CString };
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use crate::error::{ Result, VlcError };
use crate::ffi::{
    c_string, string_from_ptr, vlc_object_t, LibVlc, RawCommon, VLC_SUCCESS, VLC_VAR_FREELIST,
    VLC_VAR_GETLIST,
};
use crate::handle::{ ListHandle, ObjectHandle };
use crate::session::{ Locked, Session };
use crate::variant::VariantValue;


/// Kinds of engine objects that can be searched for.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
#[repr( i32 )]
pub enum ObjectType {
    Root = -1,
    Vlc = -2,
    Module = -3,
    Intf = -4,
    Playlist = -5,
    Item = -6,
    Input = -7,
    Decoder = -8,
    VideoOutput = -9,
    AudioOutput = -10,
    StreamOutput = -11,
    Httpd = -12,
    Packetizer = -13,
    Encoder = -14,
    Dialogs = -15,
    Vlm = -16,
    Announce = -17,
    Demux = -18,
    Access = -19,
    Stream = -20,
    OpenGl = -21,
    Filter = -22,
    Vod = -23,
    Spu = -24,
    Tls = -25,
    ServicesDiscovery = -26,
    Xml = -27,
    OsdMenu = -28,
    Stats = -29,
    HttpdHost = -30,
    Generic = -666,
}


/// Where to look for an object relative to the starting one. Flags combine with `|`.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct SearchMode( i32 );


impl SearchMode {
    pub const PARENT: SearchMode = SearchMode( 1 );
    pub const CHILD: SearchMode = SearchMode( 2 );
    pub const ANYWHERE: SearchMode = SearchMode( 3 );
    pub const STRICT: SearchMode = SearchMode( 4 );

    pub fn bits( self ) -> i32 {
        self.0
    }
}


impl BitOr for SearchMode {
    type Output = SearchMode;

    fn bitor( self, rhs: SearchMode ) -> SearchMode {
        SearchMode( self.0 | rhs.0 )
    }
}


/// Declared type of a variable, selecting which union member is read.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum VarType {
    Int,
    Bool,
    Float,
    String,
}


/// A variable's value, tagged on the Rust side.
#[derive( Debug, Clone, PartialEq )]
pub enum VarValue {
    Int( i32 ),
    Bool( bool ),
    Float( f32 ),
    String( String ),
}


impl VarValue {
    pub fn var_type( &self ) -> VarType {
        match self {
            VarValue::Int( _ ) => VarType::Int,
            VarValue::Bool( _ ) => VarType::Bool,
            VarValue::Float( _ ) => VarType::Float,
            VarValue::String( _ ) => VarType::String,
        }
    }
}


fn check_status( name: &str, status: c_int ) -> Result<()> {
    if status == VLC_SUCCESS {
        Ok(())
    } else {
        Err( VlcError::Engine( format!( "variable '{}' failed with status {}", name, status ) ) )
    }
}


/// Issues the free-list call for a successful get-list when dropped.
struct ChoiceList<'a> {
    api: &'a LibVlc,
    object: *mut vlc_object_t,
    name: &'a CString,
    values: VariantValue,
    texts: VariantValue,
}


impl Drop for ChoiceList<'_> {
    fn drop( &mut self ) {
        // SAFETY: both cells hold the lists filled in by the matching get-list call.
        let status = unsafe {
            ( self.api.var_change )(
                self.object,
                self.name.as_ptr(),
                VLC_VAR_FREELIST,
                self.values.as_mut_ptr(),
                self.texts.as_mut_ptr(),
            )
        };
        if status != VLC_SUCCESS {
            tracing::warn!( "Failed to free choice list {:?}: status {}", self.name, status );
        }
    }
}


/// An engine object: the instance root or one found from it.
///
/// An object that was not found is invalid; every operation on it fails with
/// `NullResource`.
pub struct Object {
    session: Arc<Session>,
    handle: ObjectHandle,
}

// SAFETY: The object pointer is only passed to the engine while the instance
// lock is held, including on drop.
unsafe impl Send for Object {}
unsafe impl Sync for Object {}


impl Object {
    /// Looks up the root object of the instance. The caller holds the lock of `session`.
    pub(crate) fn root( locked: &Locked<'_>, session: Arc<Session> ) -> Result<Self> {
        let vlc_id = locked.vlc_id()?;

        // SAFETY: the lock is held and vlc_id names a live instance.
        let raw = unsafe { ( locked.api().current_object )( vlc_id ) };
        let handle = unsafe { ObjectHandle::from_raw( Arc::clone( session.api() ), raw ) };
        if handle.is_invalid() {
            return Err( VlcError::Engine( format!( "no root object for instance {}", vlc_id ) ) );
        }
        tracing::debug!( "Acquired root object of instance {}", vlc_id );

        Ok( Self { session, handle } )
    }


    pub fn is_valid( &self ) -> bool {
        !self.handle.is_invalid()
    }


    /// Runs one `var_Get` and hands the filled cell to `read` under the lock.
    fn read<T>( &self, name: &str, read: impl FnOnce( &LibVlc, &VariantValue ) -> T ) -> Result<T> {
        let c_name = c_string( name )?;
        let locked = self.session.lock();
        let object = self.handle.get()?;
        let api = locked.api();

        let mut value = VariantValue::zeroed();
        // SAFETY: object is live, the lock is held and value is a full-size cell.
        let status = unsafe { ( api.var_get )( object, c_name.as_ptr(), value.as_mut_ptr() ) };
        check_status( name, status )?;

        Ok( read( api, &value ) )
    }


    fn write( &self, name: &str, value: VariantValue ) -> Result<()> {
        let c_name = c_string( name )?;
        let locked = self.session.lock();
        let object = self.handle.get()?;

        // SAFETY: object is live and the lock is held. Any string in value
        // outlives the call.
        let status = unsafe { ( locked.api().var_set )( object, c_name.as_ptr(), value.into_raw() ) };
        check_status( name, status )
    }


    pub fn get_int( &self, name: &str ) -> Result<i32> {
        self.read( name, |_, value| unsafe { value.int() } )
    }


    pub fn get_bool( &self, name: &str ) -> Result<bool> {
        self.read( name, |_, value| unsafe { value.bool() } )
    }


    pub fn get_float( &self, name: &str ) -> Result<f32> {
        self.read( name, |_, value| unsafe { value.float() } )
    }


    /// Reads a string variable. The engine's copy is freed after it is read.
    pub fn get_string( &self, name: &str ) -> Result<String> {
        self.read( name, |api, value| unsafe {
            let ptr = value.string_ptr();
            let text = string_from_ptr( ptr ).unwrap_or_default();
            if !ptr.is_null() {
                ( api.free )( ptr.cast() );
            }
            text
        })
    }


    pub fn set_int( &self, name: &str, value: i32 ) -> Result<()> {
        self.write( name, VariantValue::from_int( value ) )
    }


    pub fn set_bool( &self, name: &str, value: bool ) -> Result<()> {
        self.write( name, VariantValue::from_bool( value ) )
    }


    pub fn set_float( &self, name: &str, value: f32 ) -> Result<()> {
        self.write( name, VariantValue::from_float( value ) )
    }


    pub fn set_string( &self, name: &str, value: &str ) -> Result<()> {
        let text = c_string( value )?;
        self.write( name, VariantValue::from_string_ptr( text.as_ptr() ) )
    }


    /// Reads a variable as the given type.
    pub fn get( &self, name: &str, kind: VarType ) -> Result<VarValue> {
        Ok( match kind {
            VarType::Int => VarValue::Int( self.get_int( name )? ),
            VarType::Bool => VarValue::Bool( self.get_bool( name )? ),
            VarType::Float => VarValue::Float( self.get_float( name )? ),
            VarType::String => VarValue::String( self.get_string( name )? ),
        })
    }


    pub fn set( &self, name: &str, value: &VarValue ) -> Result<()> {
        match value {
            VarValue::Int( v ) => self.set_int( name, *v ),
            VarValue::Bool( v ) => self.set_bool( name, *v ),
            VarValue::Float( v ) => self.set_float( name, *v ),
            VarValue::String( v ) => self.set_string( name, v ),
        }
    }


    /// Text of every choice offered by a list variable.
    ///
    /// The engine's list is freed exactly once after a successful fetch, even
    /// when reading an entry fails.
    pub fn get_list_choices( &self, name: &str ) -> Result<Vec<String>> {
        let c_name = c_string( name )?;
        let locked = self.session.lock();
        let object = self.handle.get()?;
        let api = locked.api();

        let mut values = VariantValue::zeroed();
        let mut texts = VariantValue::zeroed();
        // SAFETY: object is live, the lock is held and both cells are full size.
        let status = unsafe {
            ( api.var_change )( object, c_name.as_ptr(), VLC_VAR_GETLIST, values.as_mut_ptr(), texts.as_mut_ptr() )
        };
        check_status( name, status )?;

        let list = ChoiceList { api, object, name: &c_name, values, texts };

        // SAFETY: a successful get-list fills the text cell's list member.
        let raw = unsafe { list.texts.list() };
        if raw.is_null() {
            return Err( VlcError::Engine( format!( "variable '{}' returned no choice list", name ) ) );
        }
        let raw = unsafe { &*raw };

        let count = raw.i_count.max( 0 ) as usize;
        let mut choices = Vec::with_capacity( count );
        for i in 0..count {
            // SAFETY: p_values holds i_count cells whose string members are live
            // until the list is freed.
            let text = unsafe {
                let entry = VariantValue::from_raw( *raw.p_values.add( i ) );
                string_from_ptr( entry.string_ptr() )
            };
            match text {
                Some( text ) => choices.push( text ),
                None => {
                    return Err( VlcError::Engine( format!( "choice {} of '{}' is null", i, name ) ) );
                }
            }
        }

        Ok( choices )
    }


    /// Finds a related object. Not finding one is not an error; the returned
    /// object is invalid instead.
    pub fn find_object( &self, kind: ObjectType, mode: SearchMode ) -> Result<Object> {
        let locked = self.session.lock();
        let object = self.handle.get()?;

        // SAFETY: object is live and the lock is held.
        let raw = unsafe { ( locked.api().object_find )( object, kind as c_int, mode.bits() ) };
        let handle = unsafe { ObjectHandle::from_raw( Arc::clone( self.session.api() ), raw ) };
        if handle.is_invalid() {
            tracing::debug!( "No {:?} object found", kind );
        }

        Ok( Object {
            session: Arc::clone( &self.session ),
            handle,
        })
    }


    /// Names of every loaded module.
    pub fn module_names( &self ) -> Result<Vec<String>> {
        let locked = self.session.lock();
        let object = self.handle.get()?;

        // SAFETY: object is live and the lock is held.
        let raw = unsafe {
            ( locked.api().list_find )( object, ObjectType::Module as c_int, SearchMode::ANYWHERE.bits() )
        };
        let mut list = unsafe { ListHandle::from_raw( Arc::clone( self.session.api() ), raw ) };
        if list.is_invalid() {
            return Ok( Vec::new() );
        }

        // SAFETY: the list stays valid until released below; each entry's object
        // member points at an engine object starting with the common header.
        let names = unsafe {
            let raw = &*list.get()?;
            ( 0..raw.i_count.max( 0 ) as usize )
                .map( |i| {
                    let common = ( *raw.p_values.add( i ) ).p_object.cast::<RawCommon>();
                    common
                        .as_ref()
                        .and_then( |common| string_from_ptr( common.psz_object_name ) )
                        .unwrap_or_default()
                })
                .collect()
        };

        list.release()?;
        Ok( names )
    }


    pub fn get_config_int( &self, name: &str ) -> Result<i32> {
        let c_name = c_string( name )?;
        let locked = self.session.lock();
        let object = self.handle.get()?;
        // SAFETY: object is live and the lock is held.
        Ok( unsafe { ( locked.api().config_get_int )( object, c_name.as_ptr() ) } )
    }


    pub fn set_config_int( &self, name: &str, value: i32 ) -> Result<()> {
        let c_name = c_string( name )?;
        let locked = self.session.lock();
        let object = self.handle.get()?;
        unsafe { ( locked.api().config_put_int )( object, c_name.as_ptr(), value ) };
        Ok(())
    }


    pub fn get_config_float( &self, name: &str ) -> Result<f32> {
        let c_name = c_string( name )?;
        let locked = self.session.lock();
        let object = self.handle.get()?;
        Ok( unsafe { ( locked.api().config_get_float )( object, c_name.as_ptr() ) } )
    }


    pub fn set_config_float( &self, name: &str, value: f32 ) -> Result<()> {
        let c_name = c_string( name )?;
        let locked = self.session.lock();
        let object = self.handle.get()?;
        unsafe { ( locked.api().config_put_float )( object, c_name.as_ptr(), value ) };
        Ok(())
    }


    /// Reads a string option. None if the option is unset.
    pub fn get_config_string( &self, name: &str ) -> Result<Option<String>> {
        let c_name = c_string( name )?;
        let locked = self.session.lock();
        let object = self.handle.get()?;
        let api = locked.api();

        // SAFETY: object is live and the lock is held. The returned copy is ours to free.
        unsafe {
            let ptr = ( api.config_get_psz )( object, c_name.as_ptr() );
            let text = string_from_ptr( ptr );
            if !ptr.is_null() {
                ( api.free )( ptr.cast() );
            }
            Ok( text )
        }
    }


    pub fn set_config_string( &self, name: &str, value: &str ) -> Result<()> {
        let c_name = c_string( name )?;
        let c_value = c_string( value )?;
        let locked = self.session.lock();
        let object = self.handle.get()?;
        unsafe { ( locked.api().config_put_psz )( object, c_name.as_ptr(), c_value.as_ptr() ) };
        Ok(())
    }
}


impl Drop for Object {
    fn drop( &mut self ) {
        let _locked = self.session.lock();
        let _ = self.handle.release();
    }
}


impl fmt::Debug for Object {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.debug_struct( "Object" ).field( "handle", &self.handle ).finish()
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::config::VlcConfig;
    use crate::fake::{ self, FakeVar };
    use crate::instance::Instance;


    fn instance_with_vars( vars: Vec<(&str, FakeVar)> ) -> Instance {
        let instance = Instance::new( fake::api(), &VlcConfig::default() ).unwrap();
        fake::with_instance( instance.raw(), |state| {
            for ( name, var ) in vars {
                state.vars.insert( name.to_string(), var );
            }
        });
        instance
    }


    #[test]
    fn test_typed_variables() {
        let instance = instance_with_vars( vec![
            ( "volume", FakeVar::Int( 256 ) ),
            ( "fullscreen", FakeVar::Bool( false ) ),
            ( "rate", FakeVar::Float( 1.0 ) ),
        ]);
        let object = instance.object().unwrap();

        assert_eq!( object.get_int( "volume" ).unwrap(), 256 );
        object.set_int( "volume", 128 ).unwrap();
        assert_eq!( object.get_int( "volume" ).unwrap(), 128 );

        object.set_bool( "fullscreen", true ).unwrap();
        assert!( object.get_bool( "fullscreen" ).unwrap() );

        object.set_float( "rate", 2.5 ).unwrap();
        assert_eq!( object.get_float( "rate" ).unwrap(), 2.5 );
    }


    #[test]
    fn test_string_variable_is_freed() {
        let instance = instance_with_vars( vec![ ( "title", FakeVar::Str( "dummy".to_string() ) ) ] );
        let object = instance.object().unwrap();

        let before = fake::strings_freed();
        assert_eq!( object.get_string( "title" ).unwrap(), "dummy" );
        assert_eq!( fake::strings_freed(), before + 1 );

        object.set_string( "title", "renamed" ).unwrap();
        assert_eq!( object.get_string( "title" ).unwrap(), "renamed" );
    }


    #[test]
    fn test_unknown_variable_is_engine_error() {
        let instance = instance_with_vars( Vec::new() );
        let object = instance.object().unwrap();

        match object.get_int( "no-such-var" ) {
            Err( VlcError::Engine( message ) ) => assert!( message.contains( "no-such-var" ) ),
            other => panic!( "expected engine error, got {:?}", other ),
        }
        assert!( object.set_bool( "no-such-var", true ).is_err() );
    }


    #[test]
    fn test_generic_access() {
        let instance = instance_with_vars( vec![ ( "spdif", FakeVar::Bool( false ) ) ] );
        let object = instance.object().unwrap();

        object.set( "spdif", &VarValue::Bool( true ) ).unwrap();
        let value = object.get( "spdif", VarType::Bool ).unwrap();
        assert_eq!( value, VarValue::Bool( true ) );
        assert_eq!( value.var_type(), VarType::Bool );
    }


    #[test]
    fn test_list_choices_freed_once() {
        let list = vec![ Some( "Auto".to_string() ), Some( "Stereo".to_string() ), Some( "Mono".to_string() ) ];
        let instance = instance_with_vars( vec![
            ( "audio-channels", FakeVar::Choices { current: "Auto".to_string(), list } ),
        ]);
        let object = instance.object().unwrap();

        let choices = object.get_list_choices( "audio-channels" ).unwrap();
        assert_eq!( choices, vec![ "Auto", "Stereo", "Mono" ] );

        let calls = fake::calls( instance.raw() );
        assert_eq!( calls.get_list, 1 );
        assert_eq!( calls.free_list, 1 );
    }


    #[test]
    fn test_list_choices_freed_on_copy_failure() {
        let list = vec![ Some( "Auto".to_string() ), None ];
        let instance = instance_with_vars( vec![
            ( "audio-channels", FakeVar::Choices { current: "Auto".to_string(), list } ),
        ]);
        let object = instance.object().unwrap();

        assert!( matches!( object.get_list_choices( "audio-channels" ), Err( VlcError::Engine( _ ) ) ) );
        let calls = fake::calls( instance.raw() );
        assert_eq!( calls.get_list, 1 );
        assert_eq!( calls.free_list, 1 );
    }


    #[test]
    fn test_list_choices_not_freed_when_fetch_fails() {
        let instance = instance_with_vars( vec![ ( "volume", FakeVar::Int( 0 ) ) ] );
        let object = instance.object().unwrap();

        assert!( object.get_list_choices( "volume" ).is_err() );
        assert_eq!( fake::calls( instance.raw() ).free_list, 0 );
    }


    #[test]
    fn test_find_object() {
        let instance = instance_with_vars( Vec::new() );
        let root = instance.object().unwrap();

        let playlist = root.find_object( ObjectType::Playlist, SearchMode::CHILD ).unwrap();
        assert!( playlist.is_valid() );

        let missing = root.find_object( ObjectType::Decoder, SearchMode::ANYWHERE | SearchMode::STRICT ).unwrap();
        assert!( !missing.is_valid() );
        assert!( matches!( missing.get_int( "volume" ), Err( VlcError::NullResource( "object" ) ) ) );
        assert!( matches!( missing.module_names(), Err( VlcError::NullResource( "object" ) ) ) );

        drop( playlist );
        drop( missing );
        assert_eq!( fake::calls( instance.raw() ).object_release, 1 );
    }


    #[test]
    fn test_module_names() {
        let instance = instance_with_vars( Vec::new() );
        let object = instance.object().unwrap();

        assert_eq!( object.module_names().unwrap(), vec![ "main", "dummy", "ffmpeg" ] );
        assert_eq!( fake::calls( instance.raw() ).list_release, 1 );
    }


    #[test]
    fn test_config_store() {
        let instance = instance_with_vars( Vec::new() );
        let object = instance.object().unwrap();

        assert_eq!( object.get_config_int( "volume" ).unwrap(), -1 );
        object.set_config_int( "volume", 300 ).unwrap();
        assert_eq!( object.get_config_int( "volume" ).unwrap(), 300 );

        object.set_config_float( "rate", 0.5 ).unwrap();
        assert_eq!( object.get_config_float( "rate" ).unwrap(), 0.5 );

        assert_eq!( object.get_config_string( "aspect-ratio" ).unwrap(), None );
        object.set_config_string( "aspect-ratio", "16:9" ).unwrap();
        assert_eq!( object.get_config_string( "aspect-ratio" ).unwrap().as_deref(), Some( "16:9" ) );
    }


    #[test]
    fn test_search_mode_flags() {
        assert_eq!( ( SearchMode::PARENT | SearchMode::CHILD ).bits(), SearchMode::ANYWHERE.bits() );
        assert_eq!( ( SearchMode::CHILD | SearchMode::STRICT ).bits(), 6 );
    }
}
