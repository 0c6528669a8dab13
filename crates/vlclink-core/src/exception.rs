//! Exception context: the engine's out-of-band error channel
//!
//! Every fallible native call takes a pointer to a caller-allocated buffer and
//! reports failure by writing into it. A call's return value is meaningless
//! unless the context reports not-raised right after the call returns.

use std::ptr;

use crate::error::{ Result, VlcError };
use crate::ffi::{ string_from_ptr, LibVlc, RawException };


/// Owns one native exception buffer.
///
/// The buffer is heap-allocated so its address stays fixed while the engine
/// holds on to it during a call. It is freed exactly once, on `release` or drop.
pub struct ExceptionContext<'a> {
    api: &'a LibVlc,
    raw: *mut RawException,
}


impl<'a> ExceptionContext<'a> {
    /// Allocates and initializes a fresh context.
    pub fn new( api: &'a LibVlc ) -> Self {
        let raw = Box::into_raw( Box::new( RawException {
            raised: 0,
            message: ptr::null_mut(),
        }));

        // SAFETY: raw points to a live, properly aligned exception buffer.
        unsafe { ( api.exception_init )( raw ) };

        Self { api, raw }
    }


    /// Pointer handed to native calls. Null once the context is released.
    pub fn as_ptr( &mut self ) -> *mut RawException {
        self.raw
    }


    /// Queries the native state directly; the engine may have written to the
    /// buffer at any point before this call.
    pub fn raised( &self ) -> bool {
        if self.raw.is_null() {
            return false;
        }
        // SAFETY: raw is live until release.
        unsafe { ( self.api.exception_raised )( self.raw ) != 0 }
    }


    /// The native message. Empty unless `raised()` is true.
    pub fn message( &self ) -> String {
        if !self.raised() {
            return String::new();
        }
        // SAFETY: raw is live and raised; the message pointer is owned by the buffer.
        unsafe { string_from_ptr( ( self.api.exception_get_message )( self.raw ) ) }
            .unwrap_or_default()
    }


    /// Resets the native state so the context can be reused.
    pub fn clear( &mut self ) {
        if !self.raw.is_null() {
            // SAFETY: raw is live until release.
            unsafe { ( self.api.exception_clear )( self.raw ) };
        }
    }


    /// Converts a raised context into a typed error and clears it.
    pub fn check( &mut self ) -> Result<()> {
        self.check_with( VlcError::from_native )
    }


    /// Like `check`, with a caller-chosen mapping for the message.
    pub fn check_with( &mut self, map: impl FnOnce( String ) -> VlcError ) -> Result<()> {
        if self.raised() {
            let message = self.message();
            self.clear();
            return Err( map( message ) );
        }
        Ok(())
    }


    /// Frees the native buffer. Safe to call more than once.
    pub fn release( &mut self ) {
        if self.raw.is_null() {
            return;
        }
        let raw = std::mem::replace( &mut self.raw, ptr::null_mut() );

        // SAFETY: raw came from Box::into_raw in `new` and is freed only here.
        // Clearing first lets the engine free any message it allocated.
        unsafe {
            ( self.api.exception_clear )( raw );
            drop( Box::from_raw( raw ) );
        }
    }


    /// Returns true once the buffer has been freed.
    pub fn is_released( &self ) -> bool {
        self.raw.is_null()
    }
}


impl Drop for ExceptionContext<'_> {
    fn drop( &mut self ) {
        self.release();
    }
}


/// Runs one native call with a fresh context and checks it immediately.
pub(crate) fn guarded<T>(
    api: &LibVlc,
    call: impl FnOnce( *mut RawException ) -> T,
) -> Result<T> {
    guarded_with( api, VlcError::from_native, call )
}


/// `guarded` with a caller-chosen error mapping.
pub(crate) fn guarded_with<T>(
    api: &LibVlc,
    map: impl FnOnce( String ) -> VlcError,
    call: impl FnOnce( *mut RawException ) -> T,
) -> Result<T> {
    let mut ex = ExceptionContext::new( api );
    let value = call( ex.as_ptr() );
    ex.check_with( map )?;
    Ok( value )
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::fake;


    #[test]
    fn test_fresh_context_not_raised() {
        let api = fake::api();
        let ex = ExceptionContext::new( &api );
        assert!( !ex.raised() );
        assert_eq!( ex.message(), "" );
    }


    #[test]
    fn test_raised_and_cleared() {
        let api = fake::api();
        let mut ex = ExceptionContext::new( &api );
        unsafe { fake::raise( ex.as_ptr(), "Playlist is empty" ) };

        assert!( ex.raised() );
        assert_eq!( ex.message(), "Playlist is empty" );

        ex.clear();
        assert!( !ex.raised() );
        assert_eq!( ex.message(), "" );
    }


    #[test]
    fn test_check_maps_no_active_input() {
        let api = fake::api();
        let mut ex = ExceptionContext::new( &api );
        unsafe { fake::raise( ex.as_ptr(), "No active input" ) };

        let err = ex.check().unwrap_err();
        assert!( err.is_no_active_input() );
        // check clears, so the context is reusable.
        assert!( ex.check().is_ok() );
    }


    #[test]
    fn test_release_is_idempotent() {
        let api = fake::api();
        let mut ex = ExceptionContext::new( &api );
        unsafe { fake::raise( ex.as_ptr(), "leaks unless cleared" ) };

        ex.release();
        assert!( ex.is_released() );
        assert!( !ex.raised() );

        ex.release();
        assert!( ex.is_released() );
        assert!( ex.as_ptr().is_null() );
    }


    #[test]
    fn test_guarded_propagates() {
        let api = fake::api();
        let value = guarded( &api, |_| 7 ).unwrap();
        assert_eq!( value, 7 );

        let err = guarded( &api, |ex| unsafe { fake::raise( ex, "boom" ) } ).unwrap_err();
        assert!( matches!( err, VlcError::Engine( ref m ) if m == "boom" ) );

        let err = guarded_with( &api, VlcError::Iteration, |ex| unsafe { fake::raise( ex, "overrun" ) } )
            .unwrap_err();
        assert!( matches!( err, VlcError::Iteration( _ ) ) );
    }
}
