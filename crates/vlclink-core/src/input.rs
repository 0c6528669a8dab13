//! The item currently being played
//!
//! An [`Input`] is a snapshot taken when it is requested: if nothing was
//! playing then, it stays inactive. Position reads on an inactive input
//! return zero so a polling loop does not have to special-case idle periods.

use std::ffi::c_int;
use std::path::Path;
use std::ptr;
use std::sync::Arc;

use crate::error::{ Result, VlcError, NO_ACTIVE_INPUT };
use crate::ffi::{ c_string, libvlc_input_t, LibVlc, RawException };
use crate::handle::InputHandle;
use crate::session::Session;


/// Playback state of an input.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum InputState {
    Init,
    Opening,
    Buffering,
    Playing,
    Paused,
    End,
    Error,
    Other( i32 ),
}


impl From<c_int> for InputState {
    fn from( value: c_int ) -> Self {
        match value {
            0 => InputState::Init,
            1 => InputState::Opening,
            2 => InputState::Buffering,
            3 => InputState::Playing,
            4 => InputState::Paused,
            5 => InputState::End,
            6 => InputState::Error,
            other => InputState::Other( other ),
        }
    }
}


/// Handle to the current input of an instance.
pub struct Input<'a> {
    session: &'a Session,
    handle: InputHandle,
    active: bool,
}


impl<'a> Input<'a> {
    /// Asks the engine for its current input. No active input is not an error.
    pub(crate) fn current( session: &'a Session ) -> Result<Self> {
        let locked = session.lock();
        let instance = locked.instance()?;

        let acquired: Result<InputHandle> = locked.acquire( VlcError::from_native, |api, ex| unsafe {
            ( api.playlist_get_input )( instance, ex )
        });
        let handle = match acquired {
            Ok( handle ) => handle,
            Err( err ) if err.is_no_active_input() => {
                // SAFETY: a null handle owns nothing.
                unsafe { InputHandle::from_raw( Arc::clone( session.api() ), ptr::null_mut() ) }
            }
            Err( err ) => return Err( err ),
        };
        let active = !handle.is_invalid();

        Ok( Self { session, handle, active } )
    }


    /// Whether something was playing when this input was requested.
    pub fn is_active( &self ) -> bool {
        self.active
    }


    /// The input pointer, or `NoActiveInput` if nothing was playing.
    fn require( &self ) -> Result<*mut libvlc_input_t> {
        if !self.active {
            return Err( VlcError::NoActiveInput( NO_ACTIVE_INPUT.to_string() ) );
        }
        self.handle.get()
    }


    fn call<T>( &self, f: impl FnOnce( &LibVlc, *mut libvlc_input_t, *mut RawException ) -> T ) -> Result<T> {
        let locked = self.session.lock();
        let input = self.require()?;
        locked.call( |api, ex| f( api, input, ex ) )
    }


    /// Like `call`, but an idle engine reads as the default value.
    fn read_or_default<T: Default>(
        &self,
        f: impl FnOnce( &LibVlc, *mut libvlc_input_t, *mut RawException ) -> T,
    ) -> Result<T> {
        match self.call( f ) {
            Err( err ) if err.is_no_active_input() => Ok( T::default() ),
            other => other,
        }
    }


    /// Elapsed time in milliseconds.
    pub fn time( &self ) -> Result<i64> {
        self.read_or_default( |api, input, ex| unsafe { ( api.input_get_time )( input, ex ) } )
    }


    /// Position as a fraction of the length, 0.0 to 1.0.
    pub fn position( &self ) -> Result<f32> {
        self.read_or_default( |api, input, ex| unsafe { ( api.input_get_position )( input, ex ) } )
    }


    /// Total length in milliseconds.
    pub fn length( &self ) -> Result<i64> {
        self.read_or_default( |api, input, ex| unsafe { ( api.input_get_length )( input, ex ) } )
    }


    pub fn set_time( &self, time_ms: i64 ) -> Result<()> {
        self.call( |api, input, ex| unsafe { ( api.input_set_time )( input, time_ms, ex ) } )
    }


    pub fn set_position( &self, position: f32 ) -> Result<()> {
        self.call( |api, input, ex| unsafe { ( api.input_set_position )( input, position, ex ) } )
    }


    pub fn rate( &self ) -> Result<f32> {
        self.call( |api, input, ex| unsafe { ( api.input_get_rate )( input, ex ) } )
    }


    pub fn set_rate( &self, rate: f32 ) -> Result<()> {
        self.call( |api, input, ex| unsafe { ( api.input_set_rate )( input, rate, ex ) } )
    }


    pub fn state( &self ) -> Result<InputState> {
        let state = self.call( |api, input, ex| unsafe { ( api.input_get_state )( input, ex ) } )?;
        Ok( InputState::from( state ) )
    }


    pub fn will_play( &self ) -> Result<bool> {
        let value = self.call( |api, input, ex| unsafe { ( api.input_will_play )( input, ex ) } )?;
        Ok( value != 0 )
    }


    /// Whether a video output is open for this input.
    pub fn has_vout( &self ) -> Result<bool> {
        let value = self.call( |api, input, ex| unsafe { ( api.input_has_vout )( input, ex ) } )?;
        Ok( value != 0 )
    }


    pub fn fps( &self ) -> Result<f32> {
        self.call( |api, input, ex| unsafe { ( api.input_get_fps )( input, ex ) } )
    }


    pub fn fullscreen( &self ) -> Result<bool> {
        let value = self.call( |api, input, ex| unsafe { ( api.get_fullscreen )( input, ex ) } )?;
        Ok( value != 0 )
    }


    pub fn set_fullscreen( &self, fullscreen: bool ) -> Result<()> {
        self.call( |api, input, ex| unsafe { ( api.set_fullscreen )( input, fullscreen as c_int, ex ) } )
    }


    pub fn toggle_fullscreen( &self ) -> Result<()> {
        self.call( |api, input, ex| unsafe { ( api.toggle_fullscreen )( input, ex ) } )
    }


    pub fn video_width( &self ) -> Result<i32> {
        self.call( |api, input, ex| unsafe { ( api.video_get_width )( input, ex ) } )
    }


    pub fn video_height( &self ) -> Result<i32> {
        self.call( |api, input, ex| unsafe { ( api.video_get_height )( input, ex ) } )
    }


    /// Forces an aspect ratio such as "16:9".
    pub fn set_aspect_ratio( &self, ratio: &str ) -> Result<()> {
        let ratio = c_string( ratio )?;
        self.call( |api, input, ex| unsafe { ( api.video_set_aspect_ratio )( input, ratio.as_ptr(), ex ) } )
    }


    /// Saves the current video frame to `path`.
    pub fn take_snapshot( &self, path: &Path ) -> Result<()> {
        let path = c_string( &path.to_string_lossy() )?;
        self.call( |api, input, ex| unsafe { ( api.video_take_snapshot )( input, path.as_ptr(), ex ) } )
    }


    /// Frees the native input. Later calls fail with `NullResource`.
    pub fn release( &mut self ) -> Result<()> {
        let _locked = self.session.lock();
        self.handle.release()
    }
}


impl Drop for Input<'_> {
    fn drop( &mut self ) {
        let _locked = self.session.lock();
        let _ = self.handle.release();
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::config::VlcConfig;
    use crate::fake;
    use crate::instance::Instance;


    fn playing_instance() -> Instance {
        let instance = Instance::new( fake::api(), &VlcConfig::default() ).unwrap();
        let playlist = instance.playlist();
        let id = playlist.add( "file:///tmp/a.mp4", None ).unwrap();
        playlist.play( Some( id ) ).unwrap();
        instance
    }


    #[test]
    fn test_idle_reads_are_zero() {
        let instance = Instance::new( fake::api(), &VlcConfig::default() ).unwrap();
        let input = instance.input().unwrap();

        assert!( !input.is_active() );
        assert_eq!( input.time().unwrap(), 0 );
        assert_eq!( input.position().unwrap(), 0.0 );
        assert_eq!( input.length().unwrap(), 0 );
    }


    #[test]
    fn test_idle_writes_fail() {
        let instance = Instance::new( fake::api(), &VlcConfig::default() ).unwrap();
        let input = instance.input().unwrap();

        assert!( input.set_time( 1000 ).unwrap_err().is_no_active_input() );
        assert!( input.set_position( 0.5 ).unwrap_err().is_no_active_input() );
        drop( input );
        assert_eq!( fake::calls( instance.raw() ).input_free, 0 );
    }


    #[test]
    fn test_active_input() {
        let instance = playing_instance();
        let input = instance.input().unwrap();

        assert!( input.is_active() );
        assert_eq!( input.length().unwrap(), 180_000 );
        input.set_time( 5000 ).unwrap();
        assert_eq!( input.time().unwrap(), 5000 );
        input.set_position( 0.25 ).unwrap();
        assert_eq!( input.position().unwrap(), 0.25 );

        input.set_rate( 2.0 ).unwrap();
        assert_eq!( input.rate().unwrap(), 2.0 );
        assert!( matches!( input.set_rate( -1.0 ), Err( VlcError::Engine( _ ) ) ) );

        assert!( input.will_play().unwrap() );
        assert!( !input.has_vout().unwrap() );
        assert_eq!( input.fps().unwrap(), 25.0 );
        assert_eq!( ( input.video_width().unwrap(), input.video_height().unwrap() ), ( 720, 576 ) );
    }


    #[test]
    fn test_video_controls() {
        let instance = playing_instance();
        let input = instance.input().unwrap();

        assert!( !input.fullscreen().unwrap() );
        input.toggle_fullscreen().unwrap();
        assert!( input.fullscreen().unwrap() );
        input.set_fullscreen( false ).unwrap();
        assert!( !input.fullscreen().unwrap() );

        input.set_aspect_ratio( "16:9" ).unwrap();
        input.take_snapshot( Path::new( "/tmp/frame.png" ) ).unwrap();
        fake::with_instance( instance.raw(), |state| {
            assert_eq!( state.aspect_ratio.as_deref(), Some( "16:9" ) );
            assert_eq!( state.snapshot.as_deref(), Some( "/tmp/frame.png" ) );
        });
    }


    #[test]
    fn test_stopped_after_acquire() {
        let instance = playing_instance();
        let input = instance.input().unwrap();
        instance.playlist().stop().unwrap();

        assert!( input.is_active() );
        assert_eq!( input.time().unwrap(), 0 );
        assert!( input.set_time( 1000 ).unwrap_err().is_no_active_input() );
    }


    #[test]
    fn test_release_once() {
        let instance = playing_instance();
        let mut input = instance.input().unwrap();

        input.release().unwrap();
        input.release().unwrap();
        assert!( matches!( input.time(), Err( VlcError::NullResource( "input" ) ) ) );
        drop( input );
        assert_eq!( fake::calls( instance.raw() ).input_free, 1 );
    }


    #[test]
    fn test_state_mapping() {
        assert_eq!( InputState::from( 3 ), InputState::Playing );
        assert_eq!( InputState::from( 42 ), InputState::Other( 42 ) );

        let instance = playing_instance();
        let input = instance.input().unwrap();
        assert_eq!( input.state().unwrap(), InputState::Paused );
        while !instance.playlist().is_playing().unwrap() {}
        assert_eq!( input.state().unwrap(), InputState::Playing );
    }
}
