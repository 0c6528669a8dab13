//! Per-instance serialization of native calls
//!
//! The engine is not safe to enter from several threads through the same
//! instance. Every facade bound to an instance shares one [`Session`] and
//! takes its lock around each native call, teardown included.

use std::ffi::c_int;
use std::sync::{ Arc, Mutex, MutexGuard, PoisonError };

use crate::error::{ Result, VlcError };
use crate::exception::{ guarded, guarded_with, ExceptionContext };
use crate::ffi::{ libvlc_instance_t, LibVlc, RawException };
use crate::handle::{ HandleKind, InstanceHandle, NativeHandle };


/// Function table, instance handle and the lock guarding both.
pub(crate) struct Session {
    api: Arc<LibVlc>,
    instance: InstanceHandle,
    lock: Mutex<()>,
}

// SAFETY: The instance pointer is only dereferenced by the engine, and every
// native call through it happens while `lock` is held.
unsafe impl Send for Session {}
unsafe impl Sync for Session {}


impl Session {
    pub fn new( api: Arc<LibVlc>, instance: InstanceHandle ) -> Self {
        Self {
            api,
            instance,
            lock: Mutex::new( () ),
        }
    }


    pub fn api( &self ) -> &Arc<LibVlc> {
        &self.api
    }


    /// Takes the instance lock. A poisoned lock is recovered, since the guarded
    /// data is `()` and the native state cannot be rolled back anyway.
    pub fn lock( &self ) -> Locked<'_> {
        Locked {
            session: self,
            _guard: self.lock.lock().unwrap_or_else( PoisonError::into_inner ),
        }
    }


    /// Destroys the instance handle under the lock.
    pub fn release( &mut self ) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else( PoisonError::into_inner );
        self.instance.release()
    }
}


impl Drop for Session {
    fn drop( &mut self ) {
        if !self.instance.is_invalid() {
            tracing::debug!( "Destroying engine instance" );
            let _ = self.release();
        }
    }
}


/// Proof that the instance lock is held.
pub(crate) struct Locked<'a> {
    session: &'a Session,
    _guard: MutexGuard<'a, ()>,
}


impl<'a> Locked<'a> {
    pub fn api( &self ) -> &'a LibVlc {
        &self.session.api
    }


    /// The live instance pointer.
    pub fn instance( &self ) -> Result<*mut libvlc_instance_t> {
        self.session.instance.get()
    }


    /// Numeric id of the instance, used to address its root object.
    pub fn vlc_id( &self ) -> Result<c_int> {
        let instance = self.instance()?;
        // SAFETY: instance is live and the lock is held.
        Ok( unsafe { ( self.api().get_vlc_id )( instance ) } )
    }


    /// Runs one native call with a fresh exception context.
    pub fn call<T>( &self, f: impl FnOnce( &LibVlc, *mut RawException ) -> T ) -> Result<T> {
        let api = self.api();
        guarded( api, |ex| f( api, ex ) )
    }


    /// `call` with a caller-chosen error mapping.
    pub fn call_with<T>(
        &self,
        map: impl FnOnce( String ) -> VlcError,
        f: impl FnOnce( &LibVlc, *mut RawException ) -> T,
    ) -> Result<T> {
        let api = self.api();
        guarded_with( api, map, |ex| f( api, ex ) )
    }


    /// Runs a native call that returns a new resource.
    ///
    /// The pointer is wrapped before the context is checked, so anything the
    /// engine handed out is released even when it also raised. A null pointer
    /// comes back as an invalid handle.
    pub fn acquire<K: HandleKind>(
        &self,
        map: impl FnOnce( String ) -> VlcError,
        f: impl FnOnce( &LibVlc, *mut RawException ) -> *mut K::Raw,
    ) -> Result<NativeHandle<K>> {
        let api = self.api();
        let mut ex = ExceptionContext::new( api );
        let raw = f( api, ex.as_ptr() );

        // SAFETY: raw was just returned by the engine behind api and nothing else owns it.
        let handle = unsafe { NativeHandle::from_raw( Arc::clone( &self.session.api ), raw ) };
        ex.check_with( map )?;

        if !handle.is_invalid() {
            tracing::debug!( "Acquired {} handle", K::NAME );
        }
        Ok( handle )
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::fake;
    use std::thread;


    #[test]
    fn test_call_checks_context() {
        let api = fake::api();
        let session = Session::new( api.clone(), fake::instance( &api ) );
        let locked = session.lock();
        let instance = locked.instance().unwrap();

        let count = locked
            .call( |api, ex| unsafe { ( api.playlist_items_count )( instance, ex ) } )
            .unwrap();
        assert_eq!( count, 0 );

        let err = locked
            .call( |api, ex| unsafe { ( api.playlist_get_input )( instance, ex ) } )
            .unwrap_err();
        assert!( err.is_no_active_input() );
    }


    #[test]
    fn test_release_then_instance_is_null() {
        let api = fake::api();
        let mut session = Session::new( api.clone(), fake::instance( &api ) );
        let raw = session.lock().instance().unwrap();

        session.release().unwrap();
        assert!( matches!( session.lock().instance(), Err( VlcError::NullResource( "instance" ) ) ) );
        drop( session );
        assert_eq!( fake::calls( raw ).destroy, 1 );
    }


    #[test]
    fn test_lock_serializes_threads() {
        let api = fake::api();
        let session = Arc::new( Session::new( api.clone(), fake::instance( &api ) ) );

        let handles: Vec<_> = ( 0..4 )
            .map( |_| {
                let session = Arc::clone( &session );
                thread::spawn( move || {
                    for _ in 0..50 {
                        let locked = session.lock();
                        let instance = locked.instance().unwrap();
                        locked
                            .call( |api, ex| unsafe { ( api.audio_toggle_mute )( instance, ex ) } )
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 200 toggles leave the mute state where it started.
        let locked = session.lock();
        let instance = locked.instance().unwrap();
        let muted = locked
            .call( |api, ex| unsafe { ( api.audio_get_mute )( instance, ex ) } )
            .unwrap();
        assert_eq!( muted, 0 );
    }
}
