//! vlclink Core - Safe bindings to the libvlc engine
//!
//! This crate wraps the exception-context era libvlc API: RAII ownership of
//! every native handle, typed errors for the out-of-band exception buffer,
//! a lazy iterator over the engine's log ring buffer, and typed access to
//! the untagged variant union used for object variables.

pub mod config;
pub mod error;
pub mod exception;
pub mod ffi;
pub mod handle;
pub mod input;
pub mod instance;
pub mod loader;
pub mod log;
pub mod object;
pub mod playlist;
mod session;
mod variant;

#[cfg( test )]
mod fake;

pub use config::{ DolbySurround, VlcConfig };
pub use error::{ Result, VlcError };
pub use exception::ExceptionContext;
pub use ffi::LibVlc;
pub use handle::NativeHandle;
pub use input::{ Input, InputState };
pub use instance::Instance;
pub use loader::LoadError;
pub use log::{ IterState, Log, LogIterator, LogMessage, LogSeverity };
pub use object::{ Object, ObjectType, SearchMode, VarType, VarValue };
pub use playlist::Playlist;
