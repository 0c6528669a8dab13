//! RAII ownership of native handles
//!
//! Each native resource kind is a zero-sized marker implementing [`HandleKind`],
//! which names its raw type and its native release routine. [`NativeHandle`]
//! is generic over the kind and guarantees the routine runs at most once.

use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::Arc;

use crate::error::{ Result, VlcError };
use crate::exception::ExceptionContext;
use crate::ffi::{
    libvlc_input_t, libvlc_instance_t, libvlc_log_iterator_t, libvlc_log_t, vlc_object_t,
    LibVlc, RawList,
};


/// A kind of native resource and how to give it back to the engine.
pub trait HandleKind {
    /// Opaque native type the handle points to.
    type Raw;

    /// Name used in errors and log output.
    const NAME: &'static str;

    /// Runs the native release routine.
    ///
    /// # Safety
    ///
    /// `raw` must be a live, non-null pointer obtained from the engine behind
    /// `api`, and must not be used again after this call.
    unsafe fn release( api: &LibVlc, raw: *mut Self::Raw ) -> std::result::Result<(), String>;
}


/// Engine instance, destroyed with `libvlc_destroy`.
pub enum InstanceKind {}

/// Active input, freed with `libvlc_input_free`.
pub enum InputKind {}

/// Message log, closed with `libvlc_log_close`.
pub enum LogKind {}

/// Log cursor, freed with `libvlc_log_iterator_free`.
pub enum LogIteratorKind {}

/// Engine object, released with `vlc_object_release`.
pub enum ObjectKind {}

/// Object list from `vlc_list_find`, released with `vlc_list_release`.
pub enum ListKind {}


impl HandleKind for InstanceKind {
    type Raw = libvlc_instance_t;
    const NAME: &'static str = "instance";

    unsafe fn release( api: &LibVlc, raw: *mut Self::Raw ) -> std::result::Result<(), String> {
        ( api.destroy )( raw );
        Ok(())
    }
}


impl HandleKind for InputKind {
    type Raw = libvlc_input_t;
    const NAME: &'static str = "input";

    unsafe fn release( api: &LibVlc, raw: *mut Self::Raw ) -> std::result::Result<(), String> {
        ( api.input_free )( raw );
        Ok(())
    }
}


impl HandleKind for LogKind {
    type Raw = libvlc_log_t;
    const NAME: &'static str = "log";

    unsafe fn release( api: &LibVlc, raw: *mut Self::Raw ) -> std::result::Result<(), String> {
        let mut ex = ExceptionContext::new( api );
        ( api.log_close )( raw, ex.as_ptr() );
        ex.check().map_err( native_message )
    }
}


impl HandleKind for LogIteratorKind {
    type Raw = libvlc_log_iterator_t;
    const NAME: &'static str = "log iterator";

    unsafe fn release( api: &LibVlc, raw: *mut Self::Raw ) -> std::result::Result<(), String> {
        let mut ex = ExceptionContext::new( api );
        ( api.log_iterator_free )( raw, ex.as_ptr() );
        ex.check().map_err( native_message )
    }
}


impl HandleKind for ObjectKind {
    type Raw = vlc_object_t;
    const NAME: &'static str = "object";

    unsafe fn release( api: &LibVlc, raw: *mut Self::Raw ) -> std::result::Result<(), String> {
        ( api.object_release )( raw );
        Ok(())
    }
}


impl HandleKind for ListKind {
    type Raw = RawList;
    const NAME: &'static str = "object list";

    unsafe fn release( api: &LibVlc, raw: *mut Self::Raw ) -> std::result::Result<(), String> {
        ( api.list_release )( raw );
        Ok(())
    }
}


fn native_message( err: VlcError ) -> String {
    match err {
        VlcError::Engine( message ) | VlcError::NoActiveInput( message ) => message,
        other => other.to_string(),
    }
}


/// Exclusive owner of one native handle.
///
/// A null pointer means "invalid": either never acquired or already released.
/// The release routine runs at most once, whether through [`release`](Self::release)
/// or on drop. The function table is held by `Arc` so the library outlives
/// every handle it produced.
pub struct NativeHandle<K: HandleKind> {
    api: Arc<LibVlc>,
    raw: *mut K::Raw,
    _kind: PhantomData<K>,
}


pub type InstanceHandle = NativeHandle<InstanceKind>;
pub type InputHandle = NativeHandle<InputKind>;
pub type LogHandle = NativeHandle<LogKind>;
pub type LogIteratorHandle = NativeHandle<LogIteratorKind>;
pub type ObjectHandle = NativeHandle<ObjectKind>;
pub type ListHandle = NativeHandle<ListKind>;


impl<K: HandleKind> NativeHandle<K> {
    /// Takes ownership of a pointer returned by the engine. Null is allowed
    /// and yields an invalid handle.
    ///
    /// # Safety
    ///
    /// A non-null `raw` must have come from the engine behind `api`, be of kind
    /// `K`, and not be owned by anything else.
    pub unsafe fn from_raw( api: Arc<LibVlc>, raw: *mut K::Raw ) -> Self {
        Self { api, raw, _kind: PhantomData }
    }


    /// Returns true for a null or released handle.
    pub fn is_invalid( &self ) -> bool {
        self.raw.is_null()
    }


    /// The live pointer, or `NullResource` if the handle is invalid.
    pub fn get( &self ) -> Result<*mut K::Raw> {
        if self.raw.is_null() {
            Err( VlcError::NullResource( K::NAME ) )
        } else {
            Ok( self.raw )
        }
    }


    /// The function table this handle belongs to.
    pub fn api( &self ) -> &Arc<LibVlc> {
        &self.api
    }


    /// Runs the native release routine if it has not run yet.
    ///
    /// The handle is invalid afterwards even if the engine reported a failure,
    /// so a failed release is never retried.
    pub fn release( &mut self ) -> Result<()> {
        if self.raw.is_null() {
            return Ok(());
        }
        let raw = std::mem::replace( &mut self.raw, ptr::null_mut() );

        // SAFETY: raw is non-null and owned by this handle, and has just been
        // detached so no other path can release it again.
        match unsafe { K::release( &self.api, raw ) } {
            Ok(()) => {
                tracing::trace!( "Released {} handle", K::NAME );
                Ok(())
            }
            Err( message ) => {
                tracing::warn!( "Failed to release {} handle: {}", K::NAME, message );
                Err( VlcError::ReleaseFailure { kind: K::NAME, message } )
            }
        }
    }
}


impl<K: HandleKind> Drop for NativeHandle<K> {
    fn drop( &mut self ) {
        // Failures are already logged by release.
        let _ = self.release();
    }
}


impl<K: HandleKind> fmt::Debug for NativeHandle<K> {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.debug_struct( "NativeHandle" )
            .field( "kind", &K::NAME )
            .field( "raw", &self.raw )
            .finish()
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::fake;


    fn open_log( api: &Arc<LibVlc> ) -> (InstanceHandle, LogHandle) {
        let instance = fake::instance( api );
        let raw = instance.get().unwrap();
        let mut ex = ExceptionContext::new( api );
        let log = unsafe { ( api.log_open )( raw, ex.as_ptr() ) };
        ex.check().unwrap();
        let log = unsafe { LogHandle::from_raw( api.clone(), log ) };
        (instance, log)
    }


    #[test]
    fn test_null_handle_is_invalid() {
        let api = fake::api();
        let handle = unsafe { InputHandle::from_raw( api, ptr::null_mut() ) };
        assert!( handle.is_invalid() );
        assert!( matches!( handle.get(), Err( VlcError::NullResource( "input" ) ) ) );
    }


    #[test]
    fn test_double_release_calls_native_once() {
        let api = fake::api();
        let mut instance = fake::instance( &api );
        let raw = instance.get().unwrap();

        assert!( !instance.is_invalid() );
        instance.release().unwrap();
        instance.release().unwrap();
        drop( instance );

        assert_eq!( fake::calls( raw ).destroy, 1 );
    }


    #[test]
    fn test_drop_releases() {
        let api = fake::api();
        let raw = {
            let (instance, _log) = open_log( &api );
            instance.get().unwrap()
        };
        let calls = fake::calls( raw );
        assert_eq!( calls.log_close, 1 );
        assert_eq!( calls.destroy, 1 );
    }


    #[test]
    fn test_failed_release_invalidates() {
        let api = fake::api();
        let (instance, mut log) = open_log( &api );
        let raw = instance.get().unwrap();
        fake::with_instance( raw, |state| state.fail_log_close = true );

        let err = log.release().unwrap_err();
        assert!( matches!( err, VlcError::ReleaseFailure { kind: "log", .. } ) );
        assert!( log.is_invalid() );

        // Never retried, not even on drop.
        assert!( log.release().is_ok() );
        drop( log );
        assert_eq!( fake::calls( raw ).log_close, 1 );
    }


    #[test]
    fn test_get_after_release() {
        let api = fake::api();
        let mut instance = fake::instance( &api );
        instance.release().unwrap();
        assert!( matches!( instance.get(), Err( VlcError::NullResource( "instance" ) ) ) );
    }
}
