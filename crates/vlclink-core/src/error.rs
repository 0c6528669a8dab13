//! Typed failures reported by the engine
//!
//! Every error the engine raises through an exception context is mapped onto
//! one closed set of variants carrying the native message text.

use thiserror::Error;


/// Message the engine raises when no input is currently loaded.
pub(crate) const NO_ACTIVE_INPUT: &str = "No active input";


/// Errors that can occur while driving the engine.
#[derive( Debug, Error )]
pub enum VlcError {
    /// Nothing is loaded or playing. Expected in steady state.
    #[error( "{0}" )]
    NoActiveInput( String ),

    #[error( "Engine error: {0}" )]
    Engine( String ),

    #[error( "Log iteration failed: {0}" )]
    Iteration( String ),

    #[error( "{0} handle is null or already released" )]
    NullResource( &'static str ),

    #[error( "Failed to release {kind} handle: {message}" )]
    ReleaseFailure {
        kind: &'static str,
        message: String,
    },
}


impl VlcError {
    /// Classifies a message raised through an exception context.
    pub fn from_native( message: String ) -> Self {
        if message == NO_ACTIVE_INPUT {
            VlcError::NoActiveInput( message )
        } else {
            VlcError::Engine( message )
        }
    }


    /// Returns true for the recoverable "nothing is playing" condition.
    pub fn is_no_active_input( &self ) -> bool {
        matches!( self, VlcError::NoActiveInput( _ ) )
    }
}


/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, VlcError>;


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_classify_no_active_input() {
        let err = VlcError::from_native( "No active input".to_string() );
        assert!( err.is_no_active_input() );
        assert_eq!( err.to_string(), "No active input" );
    }


    #[test]
    fn test_classify_engine_error() {
        let err = VlcError::from_native( "Playlist is empty".to_string() );
        assert!( matches!( err, VlcError::Engine( ref m ) if m == "Playlist is empty" ) );
        assert!( !err.is_no_active_input() );
    }


    #[test]
    fn test_release_failure_message() {
        let err = VlcError::ReleaseFailure { kind: "log", message: "busy".into() };
        assert_eq!( err.to_string(), "Failed to release log handle: busy" );
    }
}
