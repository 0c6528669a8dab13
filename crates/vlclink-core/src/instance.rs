//! Engine instance facade
//!
//! Owns the engine instance and hands out the subsystem facades bound to it.
//! The log and root object are opened on first use and kept; they are closed
//! before the instance is destroyed.

use std::ffi::{ c_char, c_int };
use std::fmt;
use std::sync::{ Arc, OnceLock };

use crate::config::VlcConfig;
use crate::error::{ Result, VlcError };
use crate::exception::ExceptionContext;
use crate::ffi::{ c_string, LibVlc };
use crate::handle::InstanceHandle;
use crate::input::Input;
use crate::log::Log;
use crate::object::Object;
use crate::playlist::Playlist;
use crate::session::Session;


/// A running engine.
///
/// Every native call made through the instance or its facades is serialized
/// on one lock, so the instance can be shared across threads.
pub struct Instance {
    session: Arc<Session>,
    log: OnceLock<Log>,
    object: OnceLock<Object>,
}


impl Instance {
    /// Starts an engine with the arguments built from `config`.
    pub fn new( api: Arc<LibVlc>, config: &VlcConfig ) -> Result<Self> {
        let args = config.arguments();
        let c_args = args.iter().map( |arg| c_string( arg ) ).collect::<Result<Vec<_>>>()?;
        let argv: Vec<*const c_char> = c_args.iter().map( |arg| arg.as_ptr() ).collect();

        tracing::info!( "Starting engine {} with {:?}", api.version(), args );

        let mut ex = ExceptionContext::new( &api );
        // SAFETY: argv holds argc pointers to NUL-terminated strings that outlive the call.
        let raw = unsafe { ( api.new )( argv.len() as c_int, argv.as_ptr(), ex.as_ptr() ) };
        let handle = unsafe { InstanceHandle::from_raw( Arc::clone( &api ), raw ) };
        ex.check()?;
        drop( ex );

        if handle.is_invalid() {
            return Err( VlcError::Engine( "engine returned no instance".to_string() ) );
        }

        Ok( Self {
            session: Arc::new( Session::new( api, handle ) ),
            log: OnceLock::new(),
            object: OnceLock::new(),
        })
    }


    /// The message log, opened on first use.
    pub fn log( &self ) -> Result<&Log> {
        if let Some( log ) = self.log.get() {
            return Ok( log );
        }

        let locked = self.session.lock();
        if let Some( log ) = self.log.get() {
            return Ok( log );
        }
        let log = Log::open( &locked, Arc::clone( &self.session ) )?;
        Ok( self.log.get_or_init( move || log ) )
    }


    /// The root object, looked up on first use.
    pub fn object( &self ) -> Result<&Object> {
        if let Some( object ) = self.object.get() {
            return Ok( object );
        }

        let locked = self.session.lock();
        if let Some( object ) = self.object.get() {
            return Ok( object );
        }
        let object = Object::root( &locked, Arc::clone( &self.session ) )?;
        Ok( self.object.get_or_init( move || object ) )
    }


    /// The current input. Inactive if nothing is playing right now.
    pub fn input( &self ) -> Result<Input<'_>> {
        Input::current( &self.session )
    }


    pub fn playlist( &self ) -> Playlist<'_> {
        Playlist::new( &self.session )
    }


    /// Numeric id the engine uses for this instance.
    pub fn object_id( &self ) -> Result<i32> {
        self.session.lock().vlc_id()
    }


    pub fn version( &self ) -> String {
        self.session.api().version()
    }


    pub fn volume( &self ) -> Result<i32> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.audio_get_volume )( instance, ex ) } )
    }


    pub fn set_volume( &self, volume: i32 ) -> Result<()> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.audio_set_volume )( instance, volume, ex ) } )
    }


    pub fn is_muted( &self ) -> Result<bool> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        let muted = locked.call( |api, ex| unsafe { ( api.audio_get_mute )( instance, ex ) } )?;
        Ok( muted != 0 )
    }


    pub fn set_muted( &self, muted: bool ) -> Result<()> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.audio_set_mute )( instance, muted as c_int, ex ) } )
    }


    pub fn toggle_mute( &self ) -> Result<()> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.audio_toggle_mute )( instance, ex ) } )
    }


    /// Closes the log and root object, then destroys the engine.
    pub fn close( mut self ) -> Result<()> {
        self.release_children();
        match Arc::get_mut( &mut self.session ) {
            Some( session ) => {
                tracing::info!( "Closing engine instance" );
                session.release()
            }
            None => Ok(()),
        }
    }


    fn release_children( &mut self ) {
        drop( self.log.take() );
        drop( self.object.take() );
    }


    #[cfg( test )]
    pub(crate) fn raw( &self ) -> *mut crate::ffi::libvlc_instance_t {
        self.session.lock().instance().expect( "instance already destroyed" )
    }
}


impl Drop for Instance {
    fn drop( &mut self ) {
        self.release_children();
    }
}


impl fmt::Debug for Instance {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.debug_struct( "Instance" )
            .field( "log_open", &self.log.get().is_some() )
            .field( "object_open", &self.object.get().is_some() )
            .finish_non_exhaustive()
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::fake;
    use std::thread;


    fn assert_send_sync<T: Send + Sync>() {}


    #[test]
    fn test_minimal_arguments() {
        let instance = Instance::new( fake::api(), &VlcConfig::default() ).unwrap();
        let args = fake::with_instance( instance.raw(), |state| state.args.clone() );
        assert_eq!( args, vec![ "-I", "dummy" ] );
        assert_eq!( instance.version(), "0.8.6 Janine" );
        assert_eq!( instance.object_id().unwrap(), instance.raw() as usize as i32 );
    }


    #[test]
    fn test_configured_volume() {
        let config = VlcConfig { volume: Some( 120 ), ..Default::default() };
        let instance = Instance::new( fake::api(), &config ).unwrap();
        assert_eq!( instance.volume().unwrap(), 120 );

        instance.set_volume( 300 ).unwrap();
        assert_eq!( instance.volume().unwrap(), 300 );
        assert!( matches!( instance.set_volume( 5000 ), Err( VlcError::Engine( _ ) ) ) );
    }


    #[test]
    fn test_engine_refuses_to_start() {
        let config = VlcConfig { extra_args: vec![ "--fake-raise".to_string() ], ..Default::default() };
        match Instance::new( fake::api(), &config ) {
            Err( VlcError::Engine( message ) ) => assert_eq!( message, "Cannot initialize engine" ),
            other => panic!( "expected engine error, got {:?}", other ),
        }

        let config = VlcConfig { extra_args: vec![ "--fake-null".to_string() ], ..Default::default() };
        assert!( matches!( Instance::new( fake::api(), &config ), Err( VlcError::Engine( _ ) ) ) );
    }


    #[test]
    fn test_log_and_object_are_cached() {
        let instance = Instance::new( fake::api(), &VlcConfig::default() ).unwrap();

        let first = instance.log().unwrap() as *const Log;
        let second = instance.log().unwrap() as *const Log;
        assert_eq!( first, second );

        let first = instance.object().unwrap() as *const Object;
        let second = instance.object().unwrap() as *const Object;
        assert_eq!( first, second );
    }


    #[test]
    fn test_input_when_idle() {
        let instance = Instance::new( fake::api(), &VlcConfig::default() ).unwrap();
        let input = instance.input().unwrap();
        assert!( !input.is_active() );
    }


    #[test]
    fn test_mute() {
        let instance = Instance::new( fake::api(), &VlcConfig::default() ).unwrap();
        assert!( !instance.is_muted().unwrap() );
        instance.toggle_mute().unwrap();
        assert!( instance.is_muted().unwrap() );
        instance.set_muted( false ).unwrap();
        assert!( !instance.is_muted().unwrap() );
    }


    #[test]
    fn test_teardown_order_on_drop() {
        let instance = Instance::new( fake::api(), &VlcConfig::default() ).unwrap();
        let raw = instance.raw();
        instance.log().unwrap();
        instance.object().unwrap();
        drop( instance );

        let events = fake::with_instance( raw, |state| state.events.clone() );
        assert_eq!( events, vec![ "log_close", "object_release", "destroy" ] );
    }


    #[test]
    fn test_close_destroys_once() {
        let instance = Instance::new( fake::api(), &VlcConfig::default() ).unwrap();
        let raw = instance.raw();
        instance.log().unwrap();

        instance.close().unwrap();
        let calls = fake::calls( raw );
        assert_eq!( calls.log_close, 1 );
        assert_eq!( calls.destroy, 1 );
    }


    #[test]
    fn test_shared_across_threads() {
        assert_send_sync::<Instance>();
        assert_send_sync::<Log>();
        assert_send_sync::<Object>();

        let instance = Arc::new( Instance::new( fake::api(), &VlcConfig::default() ).unwrap() );
        let handles: Vec<_> = ( 0..4 )
            .map( |i| {
                let instance = Arc::clone( &instance );
                thread::spawn( move || {
                    let playlist = instance.playlist();
                    playlist.add( &format!( "file:///tmp/{}.mp4", i ), None ).unwrap();
                    instance.log().unwrap().count().unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!( instance.playlist().count().unwrap(), 4 );
    }
}
