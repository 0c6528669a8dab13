//! Engine message log and its single-pass iterator
//!
//! The engine keeps recent messages in a ring buffer that can only be read
//! through a native cursor. [`LogIterator`] wraps that cursor as a lazy
//! sequence: each step copies one message out of a caller-owned buffer
//! before the engine reuses it.

use std::fmt;
use std::sync::Arc;

use crate::error::{ Result, VlcError };
use crate::ffi::{ string_from_ptr, RawLogMessage };
use crate::handle::{ LogHandle, LogIteratorHandle };
use crate::session::{ Locked, Session };


/// Message class reported by the engine.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum LogSeverity {
    Info,
    Error,
    Warning,
    Debug,
    Other( i32 ),
}


impl From<i32> for LogSeverity {
    fn from( value: i32 ) -> Self {
        match value {
            0 => LogSeverity::Info,
            1 => LogSeverity::Error,
            2 => LogSeverity::Warning,
            3 => LogSeverity::Debug,
            other => LogSeverity::Other( other ),
        }
    }
}


impl fmt::Display for LogSeverity {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        match self {
            LogSeverity::Info => write!( f, "info" ),
            LogSeverity::Error => write!( f, "error" ),
            LogSeverity::Warning => write!( f, "warning" ),
            LogSeverity::Debug => write!( f, "debug" ),
            LogSeverity::Other( value ) => write!( f, "severity {}", value ),
        }
    }
}


/// Owned copy of one log entry. Missing native strings are empty.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct LogMessage {
    pub severity: i32,
    /// Kind of object that emitted the message ("module", "input", ...)
    pub kind: String,
    /// Name of the emitting module
    pub name: String,
    pub header: String,
    pub message: String,
}


impl LogMessage {
    /// Copies the buffer contents out before the engine can reuse them.
    ///
    /// # Safety
    ///
    /// Every string pointer in `raw` must be null or valid for reads.
    unsafe fn copy_from( raw: &RawLogMessage ) -> Self {
        Self {
            severity: raw.severity,
            kind: string_from_ptr( raw.psz_type ).unwrap_or_default(),
            name: string_from_ptr( raw.psz_name ).unwrap_or_default(),
            header: string_from_ptr( raw.psz_header ).unwrap_or_default(),
            message: string_from_ptr( raw.psz_message ).unwrap_or_default(),
        }
    }


    pub fn level( &self ) -> LogSeverity {
        LogSeverity::from( self.severity )
    }
}


/// The instance's message log.
///
/// Obtained from [`Instance::log`](crate::Instance::log), which keeps one per
/// instance and closes it before the instance itself is destroyed.
pub struct Log {
    session: Arc<Session>,
    handle: LogHandle,
}

// SAFETY: The log pointer is only passed to the engine while the instance
// lock is held, including on drop.
unsafe impl Send for Log {}
unsafe impl Sync for Log {}


impl Log {
    /// Opens the log. The caller holds the lock of `session`.
    pub(crate) fn open( locked: &Locked<'_>, session: Arc<Session> ) -> Result<Self> {
        let instance = locked.instance()?;
        let handle: LogHandle = locked.acquire( VlcError::from_native, |api, ex| unsafe {
            ( api.log_open )( instance, ex )
        })?;
        if handle.is_invalid() {
            return Err( VlcError::Engine( "engine returned no log".to_string() ) );
        }
        Ok( Self { session, handle } )
    }


    /// Number of messages currently buffered.
    pub fn count( &self ) -> Result<u32> {
        let locked = self.session.lock();
        self.count_locked( &locked )
    }


    fn count_locked( &self, locked: &Locked<'_> ) -> Result<u32> {
        let log = self.handle.get()?;
        locked.call( |api, ex| unsafe { ( api.log_count )( log, ex ) } )
    }


    /// Empties the buffer. Does nothing if it is already empty.
    pub fn clear( &self ) -> Result<()> {
        let locked = self.session.lock();
        if self.count_locked( &locked )? == 0 {
            return Ok(());
        }
        let log = self.handle.get()?;
        locked.call( |api, ex| unsafe { ( api.log_clear )( log, ex ) } )
    }


    /// Minimum level of messages the engine records.
    pub fn verbosity( &self ) -> Result<u32> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.get_log_verbosity )( instance, ex ) } )
    }


    pub fn set_verbosity( &self, level: u32 ) -> Result<()> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.set_log_verbosity )( instance, level, ex ) } )
    }


    /// Starts a new pass over the buffered messages.
    pub fn iter( &self ) -> Result<LogIterator<'_>> {
        LogIterator::new( self )
    }
}


impl Drop for Log {
    fn drop( &mut self ) {
        let _locked = self.session.lock();
        let _ = self.handle.release();
    }
}


impl fmt::Debug for Log {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.debug_struct( "Log" ).field( "handle", &self.handle ).finish()
    }
}


/// Position of a [`LogIterator`] in its pass.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum IterState {
    /// Nothing read yet
    Fresh,
    /// `current()` holds the last message read
    HasCurrent,
    /// The pass is over; only `reset()` starts another
    Exhausted,
}


/// Lazy, single-pass cursor over the log.
///
/// `move_next` advances and `current` returns the message it copied. Once
/// the pass ends, further `move_next` calls return false without touching
/// the engine until `reset`. A failure while advancing ends the pass and is
/// kept in `last_error`.
pub struct LogIterator<'a> {
    log: &'a Log,
    handle: LogIteratorHandle,
    current: Option<LogMessage>,
    state: IterState,
    last_error: Option<VlcError>,
}


impl<'a> LogIterator<'a> {
    fn new( log: &'a Log ) -> Result<Self> {
        let locked = log.session.lock();
        let handle = Self::acquire( &locked, log )?;
        Ok( Self {
            log,
            handle,
            current: None,
            state: IterState::Fresh,
            last_error: None,
        })
    }


    fn acquire( locked: &Locked<'_>, log: &Log ) -> Result<LogIteratorHandle> {
        let raw_log = log.handle.get()?;
        let handle: LogIteratorHandle = locked.acquire( VlcError::Iteration, |api, ex| unsafe {
            ( api.log_get_iterator )( raw_log, ex )
        })?;
        if handle.is_invalid() {
            return Err( VlcError::Iteration( "engine returned no log iterator".to_string() ) );
        }
        Ok( handle )
    }


    /// Whether the engine has another message for this pass. Does not advance.
    pub fn has_next( &self ) -> Result<bool> {
        let locked = self.log.session.lock();
        self.has_next_locked( &locked )
    }


    fn has_next_locked( &self, locked: &Locked<'_> ) -> Result<bool> {
        let iterator = self.handle.get()?;
        let more = locked.call_with( VlcError::Iteration, |api, ex| unsafe {
            ( api.log_iterator_has_next )( iterator, ex )
        })?;
        Ok( more != 0 )
    }


    /// Copies the next message into `current`. Returns false at the end of
    /// the pass or on failure.
    pub fn move_next( &mut self ) -> bool {
        if self.state == IterState::Exhausted {
            return false;
        }

        match self.advance() {
            Ok( Some( message ) ) => {
                self.current = Some( message );
                self.state = IterState::HasCurrent;
                true
            }
            Ok( None ) => {
                self.exhaust();
                false
            }
            Err( err ) => {
                tracing::warn!( "Log iteration stopped: {}", err );
                self.last_error = Some( err );
                self.exhaust();
                false
            }
        }
    }


    fn advance( &self ) -> Result<Option<LogMessage>> {
        let locked = self.log.session.lock();
        if !self.has_next_locked( &locked )? {
            return Ok( None );
        }

        let iterator = self.handle.get()?;
        let mut buffer = RawLogMessage::sized();
        let filled = locked.call_with( VlcError::Iteration, |api, ex| unsafe {
            ( api.log_iterator_next )( iterator, &mut buffer, ex )
        })?;
        if filled.is_null() {
            return Err( VlcError::Iteration( "engine returned no message".to_string() ) );
        }

        // SAFETY: filled points at a buffer the engine just populated; its strings
        // stay valid until the next call on this iterator, which the lock prevents.
        Ok( Some( unsafe { LogMessage::copy_from( &*filled ) } ) )
    }


    fn exhaust( &mut self ) {
        self.current = None;
        self.state = IterState::Exhausted;
    }


    /// The message copied by the last successful `move_next`.
    pub fn current( &self ) -> Option<&LogMessage> {
        match self.state {
            IterState::HasCurrent => self.current.as_ref(),
            IterState::Fresh | IterState::Exhausted => None,
        }
    }


    /// Replaces the native cursor with a new one and starts over.
    ///
    /// A failure to release the old cursor is returned after the new one is
    /// in place.
    pub fn reset( &mut self ) -> Result<()> {
        let log = self.log;
        let locked = log.session.lock();
        let released = self.handle.release();

        self.exhaust();
        self.last_error = None;
        self.handle = Self::acquire( &locked, log )?;
        self.state = IterState::Fresh;

        released
    }


    pub fn state( &self ) -> IterState {
        self.state
    }


    /// The failure that ended the current pass, if any.
    pub fn last_error( &self ) -> Option<&VlcError> {
        self.last_error.as_ref()
    }
}


impl Iterator for LogIterator<'_> {
    type Item = LogMessage;

    fn next( &mut self ) -> Option<LogMessage> {
        if self.move_next() {
            self.current.clone()
        } else {
            None
        }
    }
}


impl Drop for LogIterator<'_> {
    fn drop( &mut self ) {
        let log = self.log;
        let _locked = log.session.lock();
        let _ = self.handle.release();
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::config::VlcConfig;
    use crate::fake::{ self, FakeMessage };
    use crate::instance::Instance;


    fn instance_with( messages: &[ FakeMessage ] ) -> Instance {
        let instance = Instance::new( fake::api(), &VlcConfig::default() ).unwrap();
        fake::with_instance( instance.raw(), |state| state.log = messages.to_vec() );
        instance
    }


    fn messages( n: usize ) -> Vec<FakeMessage> {
        ( 0..n ).map( |i| FakeMessage::new( ( i % 4 ) as i32, &format!( "message {}", i ) ) ).collect()
    }


    #[test]
    fn test_clear_empty_log_skips_native() {
        let instance = instance_with( &[] );
        let log = instance.log().unwrap();

        log.clear().unwrap();
        assert_eq!( fake::calls( instance.raw() ).log_clear, 0 );

        fake::with_instance( instance.raw(), |state| state.log = messages( 3 ) );
        assert_eq!( log.count().unwrap(), 3 );
        log.clear().unwrap();
        assert_eq!( fake::calls( instance.raw() ).log_clear, 1 );
        assert_eq!( log.count().unwrap(), 0 );
    }


    #[test]
    fn test_iterates_in_order() {
        let mut expected = messages( 3 );
        expected[ 1 ].header = Some( "[00000123]".to_string() );
        expected[ 2 ].kind = "input".to_string();
        let instance = instance_with( &expected );
        let log = instance.log().unwrap();

        let mut iter = log.iter().unwrap();
        let mut seen = Vec::new();
        while iter.move_next() {
            seen.push( iter.current().cloned().unwrap() );
        }

        assert_eq!( seen.len(), 3 );
        for ( got, want ) in seen.iter().zip( &expected ) {
            assert_eq!( got.severity, want.severity );
            assert_eq!( got.kind, want.kind );
            assert_eq!( got.name, want.name );
            assert_eq!( got.message, want.message );
        }
        assert_eq!( seen[ 0 ].header, "" );
        assert_eq!( seen[ 1 ].header, "[00000123]" );
        assert_eq!( seen[ 1 ].level(), LogSeverity::Error );
        assert!( iter.last_error().is_none() );
    }


    #[test]
    fn test_exhaustion_is_sticky_until_reset() {
        let instance = instance_with( &messages( 1 ) );
        let log = instance.log().unwrap();
        let mut iter = log.iter().unwrap();

        assert_eq!( iter.state(), IterState::Fresh );
        assert!( iter.current().is_none() );
        assert!( iter.move_next() );
        assert!( !iter.move_next() );
        assert_eq!( iter.state(), IterState::Exhausted );
        assert!( iter.current().is_none() );

        // New messages do not revive an exhausted pass, and the engine is not asked.
        fake::with_instance( instance.raw(), |state| state.log = messages( 2 ) );
        let before = fake::calls( instance.raw() ).log_next;
        assert!( !iter.move_next() );
        assert!( !iter.move_next() );
        assert_eq!( fake::calls( instance.raw() ).log_next, before );

        iter.reset().unwrap();
        assert_eq!( iter.state(), IterState::Fresh );
        assert_eq!( iter.by_ref().count(), 2 );
    }


    #[test]
    fn test_has_next_does_not_advance() {
        let instance = instance_with( &messages( 2 ) );
        let log = instance.log().unwrap();
        let mut iter = log.iter().unwrap();

        assert!( iter.has_next().unwrap() );
        assert!( iter.has_next().unwrap() );
        assert_eq!( iter.state(), IterState::Fresh );

        assert!( iter.move_next() );
        assert_eq!( iter.current().unwrap().message, "message 0" );
    }


    #[test]
    fn test_failure_ends_pass() {
        let instance = instance_with( &messages( 3 ) );
        fake::with_instance( instance.raw(), |state| state.fail_next_at = Some( 1 ) );
        let log = instance.log().unwrap();
        let mut iter = log.iter().unwrap();

        assert!( iter.move_next() );
        assert!( !iter.move_next() );
        assert_eq!( iter.state(), IterState::Exhausted );
        assert!( matches!( iter.last_error(), Some( VlcError::Iteration( _ ) ) ) );
    }


    #[test]
    fn test_iterator_acquire_failure() {
        let instance = instance_with( &messages( 1 ) );
        fake::with_instance( instance.raw(), |state| state.fail_get_iterator = true );
        let log = instance.log().unwrap();

        assert!( matches!( log.iter(), Err( VlcError::Iteration( _ ) ) ) );
    }


    #[test]
    fn test_iterator_released_on_drop() {
        let instance = instance_with( &messages( 2 ) );
        let log = instance.log().unwrap();

        let collected: Vec<LogMessage> = log.iter().unwrap().collect();
        assert_eq!( collected.len(), 2 );

        let calls = fake::calls( instance.raw() );
        assert_eq!( calls.log_get_iterator, 1 );
        assert_eq!( calls.log_iterator_free, 1 );
    }


    #[test]
    fn test_verbosity_round_trip() {
        let instance = instance_with( &[] );
        let log = instance.log().unwrap();
        log.set_verbosity( 2 ).unwrap();
        assert_eq!( log.verbosity().unwrap(), 2 );
    }


    #[test]
    fn test_severity_mapping() {
        assert_eq!( LogSeverity::from( 0 ), LogSeverity::Info );
        assert_eq!( LogSeverity::from( 2 ), LogSeverity::Warning );
        assert_eq!( LogSeverity::from( 9 ), LogSeverity::Other( 9 ) );
        assert_eq!( LogSeverity::Debug.to_string(), "debug" );
    }
}
