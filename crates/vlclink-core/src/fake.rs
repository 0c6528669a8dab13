//! In-process stand-in for libvlc used by the unit tests
//!
//! Every function-table entry is implemented as an `extern "C"` function over
//! the real `#[repr(C)]` layouts. Instances live in a global registry keyed by
//! id; the id doubles as the instance pointer. Release calls are counted per
//! instance so tests can assert on them after the handles are gone.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{ c_char, c_int, c_void, CStr, CString };
use std::mem;
use std::ptr;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex, OnceLock, PoisonError };

use crate::exception::ExceptionContext;
use crate::ffi::{
    libvlc_input_t, libvlc_instance_t, libvlc_log_iterator_t, libvlc_log_t, vlc_object_t,
    LibVlc, RawCommon, RawException, RawList, RawLogMessage, RawValue, VLC_SUCCESS,
    VLC_VAR_FREELIST, VLC_VAR_GETLIST,
};
use crate::handle::InstanceHandle;


const VLC_ENOVAR: c_int = -30;
const VLC_EGENERIC: c_int = -666;

const OBJECT_VLC: c_int = -2;
const OBJECT_MODULE: c_int = -3;
const OBJECT_PLAYLIST: c_int = -5;
const OBJECT_INPUT: c_int = -7;

const INVALID_INSTANCE: &str = "Invalid instance";


/// Native calls counted per instance.
#[derive( Debug, Default, Clone, Copy )]
pub struct Calls {
    pub destroy: usize,
    pub input_free: usize,
    pub log_close: usize,
    pub log_clear: usize,
    pub log_get_iterator: usize,
    pub log_iterator_free: usize,
    pub log_next: usize,
    pub object_release: usize,
    pub list_release: usize,
    pub get_list: usize,
    pub free_list: usize,
}


#[derive( Debug, Clone )]
pub enum FakeVar {
    Int( i32 ),
    Bool( bool ),
    Float( f32 ),
    Str( String ),
    Choices { current: String, list: Vec<Option<String>> },
}


#[derive( Debug, Clone )]
pub struct FakeMessage {
    pub severity: i32,
    pub kind: String,
    pub name: String,
    pub header: Option<String>,
    pub message: String,
}


impl FakeMessage {
    pub fn new( severity: i32, message: &str ) -> Self {
        Self {
            severity,
            kind: "main".to_string(),
            name: "libvlc".to_string(),
            header: None,
            message: message.to_string(),
        }
    }
}


/// State of one fake engine instance.
#[derive( Debug, Default )]
pub struct FakeInstance {
    pub calls: Calls,
    /// Release calls in the order they happened
    pub events: Vec<&'static str>,
    pub destroyed: bool,
    pub args: Vec<String>,

    pub playlist: Vec<(c_int, String)>,
    pub next_item: c_int,
    pub current: Option<usize>,
    pub playing: bool,
    pub pending_polls: u32,

    pub volume: c_int,
    pub muted: bool,

    pub log: Vec<FakeMessage>,
    pub verbosity: u32,
    pub fail_log_close: bool,
    pub fail_get_iterator: bool,
    pub fail_next_at: Option<usize>,

    pub vars: HashMap<String, FakeVar>,
    pub config_int: HashMap<String, c_int>,
    pub config_float: HashMap<String, f32>,
    pub config_str: HashMap<String, String>,
    pub modules: Vec<String>,

    pub time: i64,
    pub length: i64,
    pub position: f32,
    pub rate: f32,
    pub fullscreen: bool,
    pub aspect_ratio: Option<String>,
    pub snapshot: Option<String>,
}


fn registry() -> &'static Mutex<HashMap<usize, FakeInstance>> {
    static REGISTRY: OnceLock<Mutex<HashMap<usize, FakeInstance>>> = OnceLock::new();
    REGISTRY.get_or_init( Default::default )
}


static NEXT_ID: AtomicUsize = AtomicUsize::new( 1 );

thread_local! {
    static STRINGS_FREED: Cell<usize> = const { Cell::new( 0 ) };
}


/// Runs `f` on any instance, destroyed or not.
fn entry<R>( id: usize, f: impl FnOnce( &mut FakeInstance ) -> R ) -> Option<R> {
    let mut map = registry().lock().unwrap_or_else( PoisonError::into_inner );
    map.get_mut( &id ).map( f )
}


/// Runs `f` on a live instance.
fn live<R>( id: usize, f: impl FnOnce( &mut FakeInstance ) -> R ) -> Option<R> {
    let mut map = registry().lock().unwrap_or_else( PoisonError::into_inner );
    map.get_mut( &id ).filter( |state| !state.destroyed ).map( f )
}


/// Turns a state lookup into a return value, raising on failure.
unsafe fn finish<T: Default>( ex: *mut RawException, result: Option<Result<T, String>> ) -> T {
    match result {
        Some( Ok( value ) ) => value,
        Some( Err( message ) ) => {
            raise( ex, &message );
            T::default()
        }
        None => {
            raise( ex, INVALID_INSTANCE );
            T::default()
        }
    }
}


/// Marks `ex` as raised with `message`, the way the engine does.
pub unsafe fn raise( ex: *mut RawException, message: &str ) {
    if ex.is_null() {
        return;
    }
    exception_clear( ex );
    ( *ex ).raised = 1;
    ( *ex ).message = CString::new( message ).unwrap().into_raw();
}


/// Handle for anything that only needs to know its instance.
struct FakeHandle {
    instance: usize,
}


struct FakeIterator {
    instance: usize,
    position: usize,
    end: usize,
    strings: Vec<CString>,
}


struct FakeObject {
    instance: usize,
}


#[repr( C )]
struct FakeChoiceList {
    raw: RawList,
    values: Vec<RawValue>,
    texts: Vec<Option<CString>>,
    types: Vec<c_int>,
}


#[repr( C )]
struct FakeModuleList {
    raw: RawList,
    instance: usize,
    values: Vec<RawValue>,
    commons: Vec<RawCommon>,
    names: Vec<CString>,
}


fn boxed<T, R>( value: T ) -> *mut R {
    Box::into_raw( Box::new( value ) ).cast()
}


unsafe fn instance_of<T>( handle: *mut T ) -> usize {
    if handle.is_null() {
        0
    } else {
        ( *handle.cast::<FakeHandle>() ).instance
    }
}


unsafe fn object_of( object: *mut vlc_object_t ) -> Option<&'static FakeObject> {
    object.cast::<FakeObject>().as_ref()
}


unsafe fn name_of( name: *const c_char ) -> String {
    CStr::from_ptr( name ).to_string_lossy().into_owned()
}


// Exceptions

unsafe extern "C" fn exception_init( ex: *mut RawException ) {
    ( *ex ).raised = 0;
    ( *ex ).message = ptr::null_mut();
}


unsafe extern "C" fn exception_clear( ex: *mut RawException ) {
    if !( *ex ).message.is_null() {
        drop( CString::from_raw( ( *ex ).message ) );
    }
    ( *ex ).raised = 0;
    ( *ex ).message = ptr::null_mut();
}


unsafe extern "C" fn exception_raised( ex: *const RawException ) -> c_int {
    ( *ex ).raised
}


unsafe extern "C" fn exception_get_message( ex: *const RawException ) -> *const c_char {
    ( *ex ).message
}


// Instance

unsafe extern "C" fn new( argc: c_int, argv: *const *const c_char, ex: *mut RawException ) -> *mut libvlc_instance_t {
    if argc <= 0 || argv.is_null() {
        raise( ex, "no arguments given" );
        return ptr::null_mut();
    }

    let args: Vec<String> = ( 0..argc as usize ).map( |i| name_of( *argv.add( i ) ) ).collect();
    if args.iter().any( |arg| arg == "--fake-raise" ) {
        raise( ex, "Cannot initialize engine" );
        return ptr::null_mut();
    }
    if args.iter().any( |arg| arg == "--fake-null" ) {
        return ptr::null_mut();
    }

    let volume = args
        .iter()
        .position( |arg| arg == "--volume" )
        .and_then( |i| args.get( i + 1 ) )
        .and_then( |value| value.parse().ok() )
        .unwrap_or( 256 );

    let id = NEXT_ID.fetch_add( 1, Ordering::Relaxed );
    let state = FakeInstance {
        args,
        volume,
        rate: 1.0,
        length: 180_000,
        modules: vec![ "main".to_string(), "dummy".to_string(), "ffmpeg".to_string() ],
        ..Default::default()
    };
    registry().lock().unwrap_or_else( PoisonError::into_inner ).insert( id, state );

    id as *mut libvlc_instance_t
}


unsafe extern "C" fn destroy( instance: *mut libvlc_instance_t ) {
    entry( instance as usize, |state| {
        state.destroyed = true;
        state.calls.destroy += 1;
        state.events.push( "destroy" );
    });
}


unsafe extern "C" fn get_vlc_id( instance: *mut libvlc_instance_t ) -> c_int {
    instance as usize as c_int
}


unsafe extern "C" fn version() -> *const c_char {
    c"0.8.6 Janine".as_ptr()
}


unsafe extern "C" fn free( ptr: *mut c_void ) {
    if !ptr.is_null() {
        drop( CString::from_raw( ptr.cast() ) );
        STRINGS_FREED.with( |freed| freed.set( freed.get() + 1 ) );
    }
}


// Audio

unsafe extern "C" fn audio_get_volume( instance: *mut libvlc_instance_t, ex: *mut RawException ) -> c_int {
    finish( ex, live( instance as usize, |state| Ok( state.volume ) ) )
}


unsafe extern "C" fn audio_set_volume( instance: *mut libvlc_instance_t, volume: c_int, ex: *mut RawException ) {
    finish( ex, live( instance as usize, |state| {
        if !( 0..=1024 ).contains( &volume ) {
            return Err( "Volume out of range".to_string() );
        }
        state.volume = volume;
        Ok(())
    }))
}


unsafe extern "C" fn audio_get_mute( instance: *mut libvlc_instance_t, ex: *mut RawException ) -> c_int {
    finish( ex, live( instance as usize, |state| Ok( state.muted as c_int ) ) )
}


unsafe extern "C" fn audio_set_mute( instance: *mut libvlc_instance_t, muted: c_int, ex: *mut RawException ) {
    finish( ex, live( instance as usize, |state| {
        state.muted = muted != 0;
        Ok(())
    }))
}


unsafe extern "C" fn audio_toggle_mute( instance: *mut libvlc_instance_t, ex: *mut RawException ) {
    finish( ex, live( instance as usize, |state| {
        state.muted = !state.muted;
        Ok(())
    }))
}


// Playlist

unsafe extern "C" fn playlist_play(
    instance: *mut libvlc_instance_t,
    item: c_int,
    _argc: c_int,
    _argv: *const *const c_char,
    ex: *mut RawException,
) {
    finish( ex, live( instance as usize, |state| {
        if state.playlist.is_empty() {
            return Err( "Empty playlist".to_string() );
        }
        let index = if item < 0 {
            state.current.unwrap_or( 0 )
        } else {
            state
                .playlist
                .iter()
                .position( |( id, _ )| *id == item )
                .ok_or_else( || "Unable to find item".to_string() )?
        };
        state.current = Some( index );
        state.playing = false;
        state.pending_polls = 2;
        state.time = 0;
        Ok(())
    }))
}


unsafe extern "C" fn playlist_pause( instance: *mut libvlc_instance_t, ex: *mut RawException ) {
    finish( ex, live( instance as usize, |state| {
        if state.current.is_some() {
            state.playing = !state.playing;
            state.pending_polls = 0;
        }
        Ok(())
    }))
}


unsafe extern "C" fn playlist_isplaying( instance: *mut libvlc_instance_t, ex: *mut RawException ) -> c_int {
    finish( ex, live( instance as usize, |state| {
        if state.pending_polls > 0 {
            state.pending_polls -= 1;
            state.playing = state.pending_polls == 0;
        } else if state.playing {
            state.time += 1000;
        }
        Ok( state.playing as c_int )
    }))
}


unsafe extern "C" fn playlist_items_count( instance: *mut libvlc_instance_t, ex: *mut RawException ) -> c_int {
    finish( ex, live( instance as usize, |state| Ok( state.playlist.len() as c_int ) ) )
}


unsafe extern "C" fn playlist_stop( instance: *mut libvlc_instance_t, ex: *mut RawException ) {
    finish( ex, live( instance as usize, |state| {
        state.current = None;
        state.playing = false;
        state.pending_polls = 0;
        Ok(())
    }))
}


unsafe fn step( instance: *mut libvlc_instance_t, ex: *mut RawException, forward: bool ) {
    finish( ex, live( instance as usize, |state| {
        if state.playlist.is_empty() {
            return Err( "Empty playlist".to_string() );
        }
        let last = state.playlist.len() - 1;
        let index = match ( state.current, forward ) {
            ( None, _ ) => 0,
            ( Some( i ), true ) => ( i + 1 ).min( last ),
            ( Some( i ), false ) => i.saturating_sub( 1 ),
        };
        state.current = Some( index );
        Ok(())
    }))
}


unsafe extern "C" fn playlist_next( instance: *mut libvlc_instance_t, ex: *mut RawException ) {
    step( instance, ex, true )
}


unsafe extern "C" fn playlist_prev( instance: *mut libvlc_instance_t, ex: *mut RawException ) {
    step( instance, ex, false )
}


unsafe extern "C" fn playlist_clear( instance: *mut libvlc_instance_t, ex: *mut RawException ) {
    finish( ex, live( instance as usize, |state| {
        state.playlist.clear();
        state.current = None;
        state.playing = false;
        state.pending_polls = 0;
        Ok(())
    }))
}


unsafe extern "C" fn playlist_add(
    instance: *mut libvlc_instance_t,
    uri: *const c_char,
    _name: *const c_char,
    ex: *mut RawException,
) -> c_int {
    if uri.is_null() {
        raise( ex, "Empty URI" );
        return -1;
    }
    let uri = name_of( uri );
    finish( ex, live( instance as usize, |state| {
        let id = state.next_item;
        state.next_item += 1;
        state.playlist.push( ( id, uri ) );
        Ok( id )
    }))
}


unsafe extern "C" fn playlist_delete_item( instance: *mut libvlc_instance_t, item: c_int, ex: *mut RawException ) -> c_int {
    finish( ex, live( instance as usize, |state| {
        match state.playlist.iter().position( |( id, _ )| *id == item ) {
            Some( index ) => {
                state.playlist.remove( index );
                if state.current == Some( index ) {
                    state.current = None;
                    state.playing = false;
                }
                Ok( VLC_SUCCESS )
            }
            None => Ok( VLC_EGENERIC ),
        }
    }))
}


unsafe extern "C" fn playlist_get_input( instance: *mut libvlc_instance_t, ex: *mut RawException ) -> *mut libvlc_input_t {
    let id = instance as usize;
    let active = finish( ex, live( id, |state| {
        if state.current.is_some() {
            Ok( true )
        } else {
            Err( "No active input".to_string() )
        }
    }));
    if active {
        boxed( FakeHandle { instance: id } )
    } else {
        ptr::null_mut()
    }
}


unsafe extern "C" fn playlist_index( vlc_id: c_int ) -> c_int {
    live( vlc_id as usize, |state| {
        state.current.map( |index| state.playlist[ index ].0 ).unwrap_or( -1 )
    })
    .unwrap_or( -1 )
}


// Input

unsafe fn with_input<T: Default>(
    input: *mut libvlc_input_t,
    ex: *mut RawException,
    f: impl FnOnce( &mut FakeInstance ) -> Result<T, String>,
) -> T {
    finish( ex, live( instance_of( input ), |state| {
        if state.current.is_none() {
            return Err( "No active input".to_string() );
        }
        f( state )
    }))
}


unsafe extern "C" fn input_free( input: *mut libvlc_input_t ) {
    let handle = Box::from_raw( input.cast::<FakeHandle>() );
    entry( handle.instance, |state| {
        state.calls.input_free += 1;
        state.events.push( "input_free" );
    });
}


unsafe extern "C" fn input_get_length( input: *mut libvlc_input_t, ex: *mut RawException ) -> i64 {
    with_input( input, ex, |state| Ok( state.length ) )
}


unsafe extern "C" fn input_get_time( input: *mut libvlc_input_t, ex: *mut RawException ) -> i64 {
    with_input( input, ex, |state| Ok( state.time ) )
}


unsafe extern "C" fn input_set_time( input: *mut libvlc_input_t, time: i64, ex: *mut RawException ) {
    with_input( input, ex, |state| {
        state.time = time.clamp( 0, state.length );
        Ok(())
    })
}


unsafe extern "C" fn input_get_position( input: *mut libvlc_input_t, ex: *mut RawException ) -> f32 {
    with_input( input, ex, |state| Ok( state.position ) )
}


unsafe extern "C" fn input_set_position( input: *mut libvlc_input_t, position: f32, ex: *mut RawException ) {
    with_input( input, ex, |state| {
        state.position = position;
        Ok(())
    })
}


unsafe extern "C" fn input_get_rate( input: *mut libvlc_input_t, ex: *mut RawException ) -> f32 {
    with_input( input, ex, |state| Ok( state.rate ) )
}


unsafe extern "C" fn input_set_rate( input: *mut libvlc_input_t, rate: f32, ex: *mut RawException ) {
    with_input( input, ex, |state| {
        if rate <= 0.0 {
            return Err( "Rate value is invalid".to_string() );
        }
        state.rate = rate;
        Ok(())
    })
}


unsafe extern "C" fn input_get_state( input: *mut libvlc_input_t, ex: *mut RawException ) -> c_int {
    with_input( input, ex, |state| Ok( if state.playing { 3 } else { 4 } ) )
}


unsafe extern "C" fn input_will_play( input: *mut libvlc_input_t, ex: *mut RawException ) -> c_int {
    with_input( input, ex, |_| Ok( 1 ) )
}


unsafe extern "C" fn input_has_vout( input: *mut libvlc_input_t, ex: *mut RawException ) -> c_int {
    with_input( input, ex, |_| Ok( 0 ) )
}


unsafe extern "C" fn input_get_fps( input: *mut libvlc_input_t, ex: *mut RawException ) -> f32 {
    with_input( input, ex, |_| Ok( 25.0 ) )
}


unsafe extern "C" fn get_fullscreen( input: *mut libvlc_input_t, ex: *mut RawException ) -> c_int {
    with_input( input, ex, |state| Ok( state.fullscreen as c_int ) )
}


unsafe extern "C" fn set_fullscreen( input: *mut libvlc_input_t, fullscreen: c_int, ex: *mut RawException ) {
    with_input( input, ex, |state| {
        state.fullscreen = fullscreen != 0;
        Ok(())
    })
}


unsafe extern "C" fn toggle_fullscreen( input: *mut libvlc_input_t, ex: *mut RawException ) {
    with_input( input, ex, |state| {
        state.fullscreen = !state.fullscreen;
        Ok(())
    })
}


unsafe extern "C" fn video_get_height( input: *mut libvlc_input_t, ex: *mut RawException ) -> c_int {
    with_input( input, ex, |_| Ok( 576 ) )
}


unsafe extern "C" fn video_get_width( input: *mut libvlc_input_t, ex: *mut RawException ) -> c_int {
    with_input( input, ex, |_| Ok( 720 ) )
}


unsafe extern "C" fn video_set_aspect_ratio( input: *mut libvlc_input_t, ratio: *const c_char, ex: *mut RawException ) {
    let ratio = ( !ratio.is_null() ).then( || name_of( ratio ) );
    with_input( input, ex, |state| {
        state.aspect_ratio = ratio;
        Ok(())
    })
}


unsafe extern "C" fn video_take_snapshot( input: *mut libvlc_input_t, path: *const c_char, ex: *mut RawException ) {
    if path.is_null() {
        raise( ex, "Invalid snapshot path" );
        return;
    }
    let path = name_of( path );
    with_input( input, ex, |state| {
        state.snapshot = Some( path );
        Ok(())
    })
}


// Log

unsafe extern "C" fn log_open( instance: *mut libvlc_instance_t, ex: *mut RawException ) -> *mut libvlc_log_t {
    let id = instance as usize;
    if finish( ex, live( id, |_| Ok( true ) ) ) {
        boxed( FakeHandle { instance: id } )
    } else {
        ptr::null_mut()
    }
}


unsafe extern "C" fn log_close( log: *mut libvlc_log_t, ex: *mut RawException ) {
    let handle = Box::from_raw( log.cast::<FakeHandle>() );
    let failed = entry( handle.instance, |state| {
        state.calls.log_close += 1;
        state.events.push( "log_close" );
        state.fail_log_close
    });
    if failed.unwrap_or( false ) {
        raise( ex, "Log is busy" );
    }
}


unsafe extern "C" fn log_count( log: *mut libvlc_log_t, ex: *mut RawException ) -> u32 {
    finish( ex, live( instance_of( log ), |state| Ok( state.log.len() as u32 ) ) )
}


unsafe extern "C" fn log_clear( log: *mut libvlc_log_t, ex: *mut RawException ) {
    finish( ex, live( instance_of( log ), |state| {
        state.calls.log_clear += 1;
        state.log.clear();
        Ok(())
    }))
}


unsafe extern "C" fn get_log_verbosity( instance: *mut libvlc_instance_t, ex: *mut RawException ) -> u32 {
    finish( ex, live( instance as usize, |state| Ok( state.verbosity ) ) )
}


unsafe extern "C" fn set_log_verbosity( instance: *mut libvlc_instance_t, level: u32, ex: *mut RawException ) {
    finish( ex, live( instance as usize, |state| {
        state.verbosity = level;
        Ok(())
    }))
}


unsafe extern "C" fn log_get_iterator( log: *mut libvlc_log_t, ex: *mut RawException ) -> *mut libvlc_log_iterator_t {
    let id = instance_of( log );
    let end = finish( ex, live( id, |state| {
        state.calls.log_get_iterator += 1;
        if state.fail_get_iterator {
            Err( "Cannot create log iterator".to_string() )
        } else {
            Ok( Some( state.log.len() ) )
        }
    }));
    match end {
        Some( end ) => boxed( FakeIterator { instance: id, position: 0, end, strings: Vec::new() } ),
        None => ptr::null_mut(),
    }
}


unsafe extern "C" fn log_iterator_free( iterator: *mut libvlc_log_iterator_t, _ex: *mut RawException ) {
    let iterator = Box::from_raw( iterator.cast::<FakeIterator>() );
    entry( iterator.instance, |state| {
        state.calls.log_iterator_free += 1;
        state.events.push( "log_iterator_free" );
    });
}


unsafe extern "C" fn log_iterator_has_next( iterator: *mut libvlc_log_iterator_t, ex: *mut RawException ) -> c_int {
    let iterator = &*iterator.cast::<FakeIterator>();
    finish( ex, live( iterator.instance, |state| {
        Ok( ( iterator.position < iterator.end.min( state.log.len() ) ) as c_int )
    }))
}


unsafe extern "C" fn log_iterator_next(
    iterator: *mut libvlc_log_iterator_t,
    buffer: *mut RawLogMessage,
    ex: *mut RawException,
) -> *mut RawLogMessage {
    let iterator = &mut *iterator.cast::<FakeIterator>();
    if buffer.is_null() || ( *buffer ).message_size as usize != mem::size_of::<RawLogMessage>() {
        raise( ex, "Invalid message buffer" );
        return ptr::null_mut();
    }

    let position = iterator.position;
    let end = iterator.end;
    let message = finish( ex, live( iterator.instance, |state| {
        state.calls.log_next += 1;
        if state.fail_next_at == Some( position ) {
            return Err( "Message queue corrupted".to_string() );
        }
        if position >= end.min( state.log.len() ) {
            return Err( "No more messages in the log".to_string() );
        }
        Ok( Some( state.log[ position ].clone() ) )
    }));
    let Some( message ) = message else {
        return ptr::null_mut();
    };

    // The previous step's strings are freed here, as the engine reuses its buffer.
    let text = |s: &str| CString::new( s ).unwrap();
    iterator.strings = vec![ text( &message.kind ), text( &message.name ), text( &message.message ) ];
    let header = message.header.as_deref().map( text );

    let out = &mut *buffer;
    out.severity = message.severity;
    out.psz_type = iterator.strings[ 0 ].as_ptr();
    out.psz_name = iterator.strings[ 1 ].as_ptr();
    out.psz_message = iterator.strings[ 2 ].as_ptr();
    out.psz_header = match header {
        Some( header ) => {
            iterator.strings.push( header );
            iterator.strings[ 3 ].as_ptr()
        }
        None => ptr::null(),
    };
    iterator.position += 1;

    buffer
}


// Objects and variables

unsafe extern "C" fn current_object( vlc_id: c_int ) -> *mut vlc_object_t {
    let id = vlc_id as usize;
    match live( id, |_| () ) {
        Some(()) => boxed( FakeObject { instance: id } ),
        None => ptr::null_mut(),
    }
}


unsafe extern "C" fn object_find( object: *mut vlc_object_t, kind: c_int, _mode: c_int ) -> *mut vlc_object_t {
    let Some( parent ) = object_of( object ) else {
        return ptr::null_mut();
    };
    let found = live( parent.instance, |state| match kind {
        OBJECT_VLC | OBJECT_PLAYLIST => true,
        OBJECT_INPUT => state.current.is_some(),
        _ => false,
    });
    if found.unwrap_or( false ) {
        boxed( FakeObject { instance: parent.instance } )
    } else {
        ptr::null_mut()
    }
}


unsafe extern "C" fn object_release( object: *mut vlc_object_t ) {
    let object = Box::from_raw( object.cast::<FakeObject>() );
    entry( object.instance, |state| {
        state.calls.object_release += 1;
        state.events.push( "object_release" );
    });
}


unsafe extern "C" fn list_find( object: *mut vlc_object_t, kind: c_int, _mode: c_int ) -> *mut RawList {
    let Some( parent ) = object_of( object ) else {
        return ptr::null_mut();
    };
    let names = live( parent.instance, |state| {
        if kind == OBJECT_MODULE { state.modules.clone() } else { Vec::new() }
    })
    .unwrap_or_default();

    let names: Vec<CString> = names.into_iter().map( |name| CString::new( name ).unwrap() ).collect();
    let mut list = Box::new( FakeModuleList {
        raw: RawList { i_count: 0, p_values: ptr::null_mut(), pi_types: ptr::null_mut() },
        instance: parent.instance,
        values: Vec::new(),
        commons: Vec::new(),
        names,
    });
    list.commons = list
        .names
        .iter()
        .enumerate()
        .map( |( i, name )| RawCommon {
            i_object_id: i as c_int + 100,
            i_object_type: OBJECT_MODULE,
            psz_object_type: c"module".as_ptr(),
            psz_object_name: name.as_ptr(),
            psz_header: ptr::null(),
        })
        .collect();
    list.values = list
        .commons
        .iter_mut()
        .map( |common| RawValue { p_object: ( common as *mut RawCommon ).cast() } )
        .collect();
    list.raw.i_count = list.values.len() as c_int;
    list.raw.p_values = list.values.as_mut_ptr();

    Box::into_raw( list ).cast()
}


unsafe extern "C" fn list_release( list: *mut RawList ) {
    let list = Box::from_raw( list.cast::<FakeModuleList>() );
    entry( list.instance, |state| state.calls.list_release += 1 );
}


unsafe extern "C" fn var_get( object: *mut vlc_object_t, name: *const c_char, value: *mut RawValue ) -> c_int {
    let Some( object ) = object_of( object ) else {
        return VLC_EGENERIC;
    };
    let name = name_of( name );
    let var = live( object.instance, |state| state.vars.get( &name ).cloned() ).flatten();

    match var {
        Some( FakeVar::Int( v ) ) => ( *value ).i_int = v,
        Some( FakeVar::Bool( v ) ) => ( *value ).b_bool = v as c_int,
        Some( FakeVar::Float( v ) ) => ( *value ).f_float = v,
        Some( FakeVar::Str( v ) ) | Some( FakeVar::Choices { current: v, .. } ) => {
            ( *value ).psz_string = CString::new( v ).unwrap().into_raw();
        }
        None => return VLC_ENOVAR,
    }
    VLC_SUCCESS
}


unsafe extern "C" fn var_set( object: *mut vlc_object_t, name: *const c_char, value: RawValue ) -> c_int {
    let Some( object ) = object_of( object ) else {
        return VLC_EGENERIC;
    };
    let name = name_of( name );
    let status = live( object.instance, |state| {
        let Some( var ) = state.vars.get_mut( &name ) else {
            return VLC_ENOVAR;
        };
        match var {
            FakeVar::Int( v ) => *v = value.i_int,
            FakeVar::Bool( v ) => *v = value.b_bool != 0,
            FakeVar::Float( v ) => *v = value.f_float,
            FakeVar::Str( v ) | FakeVar::Choices { current: v, .. } => {
                if value.psz_string.is_null() {
                    return VLC_EGENERIC;
                }
                *v = name_of( value.psz_string );
            }
        }
        VLC_SUCCESS
    });
    status.unwrap_or( VLC_EGENERIC )
}


unsafe extern "C" fn var_change(
    object: *mut vlc_object_t,
    name: *const c_char,
    action: c_int,
    values: *mut RawValue,
    texts: *mut RawValue,
) -> c_int {
    let Some( object ) = object_of( object ) else {
        return VLC_EGENERIC;
    };
    let instance = object.instance;
    let name = name_of( name );

    match action {
        VLC_VAR_GETLIST => {
            let choices = live( instance, |state| match state.vars.get( &name ) {
                Some( FakeVar::Choices { list, .. } ) => {
                    state.calls.get_list += 1;
                    Some( list.clone() )
                }
                _ => None,
            })
            .flatten();
            let Some( choices ) = choices else {
                return VLC_ENOVAR;
            };

            let mut list = Box::new( FakeChoiceList {
                raw: RawList { i_count: 0, p_values: ptr::null_mut(), pi_types: ptr::null_mut() },
                values: Vec::new(),
                texts: choices.into_iter().map( |c| c.map( |c| CString::new( c ).unwrap() ) ).collect(),
                types: Vec::new(),
            });
            list.values = list
                .texts
                .iter()
                .map( |text| RawValue {
                    psz_string: text.as_ref().map_or( ptr::null_mut(), |t| t.as_ptr().cast_mut() ),
                })
                .collect();
            list.types = vec![ 0x0040; list.values.len() ];
            list.raw.i_count = list.values.len() as c_int;
            list.raw.p_values = list.values.as_mut_ptr();
            list.raw.pi_types = list.types.as_mut_ptr();

            ( *values ).p_list = ptr::null_mut();
            ( *texts ).p_list = Box::into_raw( list ).cast();
            VLC_SUCCESS
        }
        VLC_VAR_FREELIST => {
            let list = ( *texts ).p_list;
            if list.is_null() {
                return VLC_EGENERIC;
            }
            drop( Box::from_raw( list.cast::<FakeChoiceList>() ) );
            ( *texts ).p_list = ptr::null_mut();
            entry( instance, |state| state.calls.free_list += 1 );
            VLC_SUCCESS
        }
        _ => VLC_EGENERIC,
    }
}


unsafe extern "C" fn config_get_int( object: *mut vlc_object_t, name: *const c_char ) -> c_int {
    let name = name_of( name );
    object_of( object )
        .and_then( |object| live( object.instance, |state| state.config_int.get( &name ).copied() ) )
        .flatten()
        .unwrap_or( -1 )
}


unsafe extern "C" fn config_put_int( object: *mut vlc_object_t, name: *const c_char, value: c_int ) {
    let name = name_of( name );
    if let Some( object ) = object_of( object ) {
        live( object.instance, |state| state.config_int.insert( name, value ) );
    }
}


unsafe extern "C" fn config_get_float( object: *mut vlc_object_t, name: *const c_char ) -> f32 {
    let name = name_of( name );
    object_of( object )
        .and_then( |object| live( object.instance, |state| state.config_float.get( &name ).copied() ) )
        .flatten()
        .unwrap_or( -1.0 )
}


unsafe extern "C" fn config_put_float( object: *mut vlc_object_t, name: *const c_char, value: f32 ) {
    let name = name_of( name );
    if let Some( object ) = object_of( object ) {
        live( object.instance, |state| state.config_float.insert( name, value ) );
    }
}


unsafe extern "C" fn config_get_psz( object: *mut vlc_object_t, name: *const c_char ) -> *mut c_char {
    let name = name_of( name );
    object_of( object )
        .and_then( |object| live( object.instance, |state| state.config_str.get( &name ).cloned() ) )
        .flatten()
        .map_or( ptr::null_mut(), |value| CString::new( value ).unwrap().into_raw() )
}


unsafe extern "C" fn config_put_psz( object: *mut vlc_object_t, name: *const c_char, value: *const c_char ) {
    let name = name_of( name );
    let value = if value.is_null() { String::new() } else { name_of( value ) };
    if let Some( object ) = object_of( object ) {
        live( object.instance, |state| state.config_str.insert( name, value ) );
    }
}


/// Function table backed by the fake engine.
pub fn api() -> Arc<LibVlc> {
    Arc::new( LibVlc {
        _library: None,

        exception_init,
        exception_clear,
        exception_raised,
        exception_get_message,

        new,
        destroy,
        get_vlc_id,
        version,
        free,

        audio_get_volume,
        audio_set_volume,
        audio_get_mute,
        audio_set_mute,
        audio_toggle_mute,

        playlist_play,
        playlist_pause,
        playlist_isplaying,
        playlist_items_count,
        playlist_stop,
        playlist_next,
        playlist_prev,
        playlist_clear,
        playlist_add,
        playlist_delete_item,
        playlist_get_input,
        playlist_index,

        input_free,
        input_get_length,
        input_get_time,
        input_set_time,
        input_get_position,
        input_set_position,
        input_get_rate,
        input_set_rate,
        input_get_state,
        input_will_play,
        input_has_vout,
        input_get_fps,
        get_fullscreen,
        set_fullscreen,
        toggle_fullscreen,
        video_get_height,
        video_get_width,
        video_set_aspect_ratio,
        video_take_snapshot,

        log_open,
        log_close,
        log_count,
        log_clear,
        get_log_verbosity,
        set_log_verbosity,
        log_get_iterator,
        log_iterator_free,
        log_iterator_has_next,
        log_iterator_next,

        current_object,
        object_find,
        object_release,
        list_find,
        list_release,
        var_get,
        var_set,
        var_change,
        config_get_int,
        config_put_int,
        config_get_float,
        config_put_float,
        config_get_psz,
        config_put_psz,
    })
}


/// Creates an instance with the minimal argument list and wraps it.
pub fn instance( api: &Arc<LibVlc> ) -> InstanceHandle {
    let args = [ c"-I".as_ptr(), c"dummy".as_ptr() ];
    let mut ex = ExceptionContext::new( api );
    let raw = unsafe { ( api.new )( args.len() as c_int, args.as_ptr(), ex.as_ptr() ) };
    ex.check().unwrap();
    unsafe { InstanceHandle::from_raw( api.clone(), raw ) }
}


/// Runs `f` on the state behind an instance pointer.
pub fn with_instance<R>( instance: *mut libvlc_instance_t, f: impl FnOnce( &mut FakeInstance ) -> R ) -> R {
    entry( instance as usize, f ).expect( "unknown fake instance" )
}


/// Release and bookkeeping calls made against an instance so far.
pub fn calls( instance: *mut libvlc_instance_t ) -> Calls {
    with_instance( instance, |state| state.calls )
}


/// Strings handed back through `free` on this thread.
pub fn strings_freed() -> usize {
    STRINGS_FREED.with( Cell::get )
}
