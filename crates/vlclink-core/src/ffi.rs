//! Raw C layouts and the libvlc function table
//!
//! Everything here mirrors the native ABI. The structures are read and
//! written by the engine directly, so field order and widths must not change.
//! Nothing in this module is safe to use on its own; the facades in the rest
//! of the crate wrap it.

#![allow( non_camel_case_types )]

use std::ffi::{ c_char, c_int, c_void, CStr, CString };
use std::fmt;


/// Opaque engine instance.
#[repr( C )]
pub struct libvlc_instance_t {
    _private: [u8; 0],
}

/// Opaque handle to the currently active input.
#[repr( C )]
pub struct libvlc_input_t {
    _private: [u8; 0],
}

/// Opaque handle to the engine's message log.
#[repr( C )]
pub struct libvlc_log_t {
    _private: [u8; 0],
}

/// Opaque cursor over the message log.
#[repr( C )]
pub struct libvlc_log_iterator_t {
    _private: [u8; 0],
}

/// Opaque engine object (module, playlist, input, ...).
#[repr( C )]
pub struct vlc_object_t {
    _private: [u8; 0],
}


/// Exception buffer: {status flag, message pointer}.
///
/// Allocated by the caller, initialized and filled by the engine.
#[repr( C )]
#[derive( Debug )]
pub struct RawException {
    pub raised: c_int,
    pub message: *mut c_char,
}


/// Log message buffer.
///
/// `message_size` must hold `size_of::<RawLogMessage>()` before the buffer is
/// handed to the engine; the engine uses it to detect layout mismatches.
#[repr( C )]
#[derive( Debug, Clone, Copy )]
pub struct RawLogMessage {
    pub message_size: u32,
    pub severity: c_int,
    pub psz_type: *const c_char,
    pub psz_name: *const c_char,
    pub psz_header: *const c_char,
    pub psz_message: *const c_char,
}


impl RawLogMessage {
    /// Returns an empty buffer with the size handshake already filled in.
    pub fn sized() -> Self {
        Self {
            message_size: std::mem::size_of::<Self>() as u32,
            severity: 0,
            psz_type: std::ptr::null(),
            psz_name: std::ptr::null(),
            psz_header: std::ptr::null(),
            psz_message: std::ptr::null(),
        }
    }
}


/// Name/id pair overlaid on the variant union.
#[repr( C )]
#[derive( Debug, Clone, Copy )]
pub struct RawVarRef {
    pub psz_name: *mut c_char,
    pub i_object_id: c_int,
}


/// Untagged variant value (`vlc_value_t`).
///
/// No member says which one is live. The variable's documented type is the
/// only source of truth.
#[repr( C )]
#[derive( Clone, Copy )]
pub union RawValue {
    pub i_int: c_int,
    pub b_bool: c_int,
    pub f_float: f32,
    pub psz_string: *mut c_char,
    pub p_address: *mut c_void,
    pub p_object: *mut vlc_object_t,
    pub p_list: *mut RawList,
    pub i_time: i64,
    pub var: RawVarRef,
}


/// Native list: a count, an inline array of variants and a parallel type array.
#[repr( C )]
#[derive( Debug )]
pub struct RawList {
    pub i_count: c_int,
    pub p_values: *mut RawValue,
    pub pi_types: *mut c_int,
}


/// Leading members shared by every engine object.
///
/// Only this prefix is mirrored; the remainder of the native struct is not portable.
#[repr( C )]
#[derive( Debug )]
pub struct RawCommon {
    pub i_object_id: c_int,
    pub i_object_type: c_int,
    pub psz_object_type: *const c_char,
    pub psz_object_name: *const c_char,
    pub psz_header: *const c_char,
}


/// `var_Change` actions used by this crate.
pub const VLC_VAR_GETLIST: c_int = 0x26;
pub const VLC_VAR_FREELIST: c_int = 0x27;

/// Status returned by the variable calls on success.
pub const VLC_SUCCESS: c_int = 0;


/// Function table for one loaded copy of libvlc.
///
/// Built by [`LibVlc::load`](crate::loader) from the shared library; the
/// library stays mapped for as long as the table lives.
pub struct LibVlc {
    pub(crate) _library: Option<libloading::Library>,

    // Exceptions
    pub(crate) exception_init: unsafe extern "C" fn( *mut RawException ),
    pub(crate) exception_clear: unsafe extern "C" fn( *mut RawException ),
    pub(crate) exception_raised: unsafe extern "C" fn( *const RawException ) -> c_int,
    pub(crate) exception_get_message: unsafe extern "C" fn( *const RawException ) -> *const c_char,

    // Instance
    pub(crate) new: unsafe extern "C" fn( c_int, *const *const c_char, *mut RawException ) -> *mut libvlc_instance_t,
    pub(crate) destroy: unsafe extern "C" fn( *mut libvlc_instance_t ),
    pub(crate) get_vlc_id: unsafe extern "C" fn( *mut libvlc_instance_t ) -> c_int,
    pub(crate) version: unsafe extern "C" fn() -> *const c_char,
    pub(crate) free: unsafe extern "C" fn( *mut c_void ),

    // Audio
    pub(crate) audio_get_volume: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ) -> c_int,
    pub(crate) audio_set_volume: unsafe extern "C" fn( *mut libvlc_instance_t, c_int, *mut RawException ),
    pub(crate) audio_get_mute: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ) -> c_int,
    pub(crate) audio_set_mute: unsafe extern "C" fn( *mut libvlc_instance_t, c_int, *mut RawException ),
    pub(crate) audio_toggle_mute: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ),

    // Playlist
    pub(crate) playlist_play: unsafe extern "C" fn( *mut libvlc_instance_t, c_int, c_int, *const *const c_char, *mut RawException ),
    pub(crate) playlist_pause: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ),
    pub(crate) playlist_isplaying: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ) -> c_int,
    pub(crate) playlist_items_count: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ) -> c_int,
    pub(crate) playlist_stop: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ),
    pub(crate) playlist_next: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ),
    pub(crate) playlist_prev: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ),
    pub(crate) playlist_clear: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ),
    pub(crate) playlist_add: unsafe extern "C" fn( *mut libvlc_instance_t, *const c_char, *const c_char, *mut RawException ) -> c_int,
    pub(crate) playlist_delete_item: unsafe extern "C" fn( *mut libvlc_instance_t, c_int, *mut RawException ) -> c_int,
    pub(crate) playlist_get_input: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ) -> *mut libvlc_input_t,
    pub(crate) playlist_index: unsafe extern "C" fn( c_int ) -> c_int,

    // Input
    pub(crate) input_free: unsafe extern "C" fn( *mut libvlc_input_t ),
    pub(crate) input_get_length: unsafe extern "C" fn( *mut libvlc_input_t, *mut RawException ) -> i64,
    pub(crate) input_get_time: unsafe extern "C" fn( *mut libvlc_input_t, *mut RawException ) -> i64,
    pub(crate) input_set_time: unsafe extern "C" fn( *mut libvlc_input_t, i64, *mut RawException ),
    pub(crate) input_get_position: unsafe extern "C" fn( *mut libvlc_input_t, *mut RawException ) -> f32,
    pub(crate) input_set_position: unsafe extern "C" fn( *mut libvlc_input_t, f32, *mut RawException ),
    pub(crate) input_get_rate: unsafe extern "C" fn( *mut libvlc_input_t, *mut RawException ) -> f32,
    pub(crate) input_set_rate: unsafe extern "C" fn( *mut libvlc_input_t, f32, *mut RawException ),
    pub(crate) input_get_state: unsafe extern "C" fn( *mut libvlc_input_t, *mut RawException ) -> c_int,
    pub(crate) input_will_play: unsafe extern "C" fn( *mut libvlc_input_t, *mut RawException ) -> c_int,
    pub(crate) input_has_vout: unsafe extern "C" fn( *mut libvlc_input_t, *mut RawException ) -> c_int,
    pub(crate) input_get_fps: unsafe extern "C" fn( *mut libvlc_input_t, *mut RawException ) -> f32,
    pub(crate) get_fullscreen: unsafe extern "C" fn( *mut libvlc_input_t, *mut RawException ) -> c_int,
    pub(crate) set_fullscreen: unsafe extern "C" fn( *mut libvlc_input_t, c_int, *mut RawException ),
    pub(crate) toggle_fullscreen: unsafe extern "C" fn( *mut libvlc_input_t, *mut RawException ),
    pub(crate) video_get_height: unsafe extern "C" fn( *mut libvlc_input_t, *mut RawException ) -> c_int,
    pub(crate) video_get_width: unsafe extern "C" fn( *mut libvlc_input_t, *mut RawException ) -> c_int,
    pub(crate) video_set_aspect_ratio: unsafe extern "C" fn( *mut libvlc_input_t, *const c_char, *mut RawException ),
    pub(crate) video_take_snapshot: unsafe extern "C" fn( *mut libvlc_input_t, *const c_char, *mut RawException ),

    // Log
    pub(crate) log_open: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ) -> *mut libvlc_log_t,
    pub(crate) log_close: unsafe extern "C" fn( *mut libvlc_log_t, *mut RawException ),
    pub(crate) log_count: unsafe extern "C" fn( *mut libvlc_log_t, *mut RawException ) -> u32,
    pub(crate) log_clear: unsafe extern "C" fn( *mut libvlc_log_t, *mut RawException ),
    pub(crate) get_log_verbosity: unsafe extern "C" fn( *mut libvlc_instance_t, *mut RawException ) -> u32,
    pub(crate) set_log_verbosity: unsafe extern "C" fn( *mut libvlc_instance_t, u32, *mut RawException ),
    pub(crate) log_get_iterator: unsafe extern "C" fn( *mut libvlc_log_t, *mut RawException ) -> *mut libvlc_log_iterator_t,
    pub(crate) log_iterator_free: unsafe extern "C" fn( *mut libvlc_log_iterator_t, *mut RawException ),
    pub(crate) log_iterator_has_next: unsafe extern "C" fn( *mut libvlc_log_iterator_t, *mut RawException ) -> c_int,
    pub(crate) log_iterator_next: unsafe extern "C" fn( *mut libvlc_log_iterator_t, *mut RawLogMessage, *mut RawException ) -> *mut RawLogMessage,

    // Objects and variables
    pub(crate) current_object: unsafe extern "C" fn( c_int ) -> *mut vlc_object_t,
    pub(crate) object_find: unsafe extern "C" fn( *mut vlc_object_t, c_int, c_int ) -> *mut vlc_object_t,
    pub(crate) object_release: unsafe extern "C" fn( *mut vlc_object_t ),
    pub(crate) list_find: unsafe extern "C" fn( *mut vlc_object_t, c_int, c_int ) -> *mut RawList,
    pub(crate) list_release: unsafe extern "C" fn( *mut RawList ),
    pub(crate) var_get: unsafe extern "C" fn( *mut vlc_object_t, *const c_char, *mut RawValue ) -> c_int,
    pub(crate) var_set: unsafe extern "C" fn( *mut vlc_object_t, *const c_char, RawValue ) -> c_int,
    pub(crate) var_change: unsafe extern "C" fn( *mut vlc_object_t, *const c_char, c_int, *mut RawValue, *mut RawValue ) -> c_int,
    pub(crate) config_get_int: unsafe extern "C" fn( *mut vlc_object_t, *const c_char ) -> c_int,
    pub(crate) config_put_int: unsafe extern "C" fn( *mut vlc_object_t, *const c_char, c_int ),
    pub(crate) config_get_float: unsafe extern "C" fn( *mut vlc_object_t, *const c_char ) -> f32,
    pub(crate) config_put_float: unsafe extern "C" fn( *mut vlc_object_t, *const c_char, f32 ),
    pub(crate) config_get_psz: unsafe extern "C" fn( *mut vlc_object_t, *const c_char ) -> *mut c_char,
    pub(crate) config_put_psz: unsafe extern "C" fn( *mut vlc_object_t, *const c_char, *const c_char ),
}


impl LibVlc {
    /// Returns the engine's version string.
    ///
    /// The native string is static for the life of the process and is never freed.
    pub fn version( &self ) -> String {
        // SAFETY: the version call has no preconditions and returns a static string or null.
        unsafe { string_from_ptr( ( self.version )() ) }.unwrap_or_default()
    }


    /// Returns true if the table was resolved from a shared library.
    pub fn is_loaded( &self ) -> bool {
        self._library.is_some()
    }
}


impl fmt::Debug for LibVlc {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.debug_struct( "LibVlc" )
            .field( "loaded", &self.is_loaded() )
            .finish_non_exhaustive()
    }
}


/// Copies a NUL-terminated native string into an owned `String`.
///
/// Returns None for a null pointer. Invalid UTF-8 is replaced lossily.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub unsafe fn string_from_ptr( ptr: *const c_char ) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some( CStr::from_ptr( ptr ).to_string_lossy().into_owned() )
    }
}


/// Copies a Rust string into a NUL-terminated buffer for a native call.
pub(crate) fn c_string( value: &str ) -> crate::error::Result<CString> {
    CString::new( value ).map_err( |_| {
        crate::error::VlcError::Engine( format!( "{:?} contains an interior NUL byte", value ) )
    })
}


#[cfg( test )]
mod tests {
    use super::*;
    use std::mem::{ offset_of, size_of };


    #[test]
    fn test_log_message_handshake_size() {
        let buffer = RawLogMessage::sized();
        assert_eq!( buffer.message_size as usize, size_of::<RawLogMessage>() );
        assert_eq!( size_of::<RawLogMessage>(), 8 + 4 * size_of::<*const c_char>() );
    }


    #[test]
    fn test_variant_layout() {
        // The object id lives right after the name pointer, overlapping the wider members.
        assert_eq!( offset_of!( RawVarRef, i_object_id ), size_of::<*mut c_char>() );
        assert!( size_of::<RawValue>() >= 8 );
        assert_eq!( size_of::<RawValue>(), size_of::<RawVarRef>().max( 8 ) );
    }


    #[test]
    fn test_exception_layout() {
        assert_eq!( offset_of!( RawException, message ), size_of::<*mut c_char>().max( 4 ) );
    }


    #[test]
    fn test_string_from_null() {
        assert_eq!( unsafe { string_from_ptr( std::ptr::null() ) }, None );
        let owned = std::ffi::CString::new( "dummy" ).unwrap();
        assert_eq!( unsafe { string_from_ptr( owned.as_ptr() ) }, Some( "dummy".to_string() ) );
    }


    #[test]
    fn test_c_string_rejects_nul() {
        assert!( c_string( "file:///tmp/a.mp4" ).is_ok() );
        assert!( c_string( "bad\0name" ).is_err() );
    }
}
