//! Runtime loading of the libvlc shared library
//!
//! Resolves every entry point of the function table up front, so a missing
//! symbol is reported once at load time instead of on first use.

use std::ffi::c_void;
use std::path::{ Path, PathBuf };
use std::sync::Arc;

use libloading::{ Library, Symbol };
use thiserror::Error;

use crate::ffi::LibVlc;


/// Errors that can occur while loading libvlc.
#[derive( Debug, Error )]
pub enum LoadError {
    #[error( "Failed to load library {path}: {source}" )]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error( "Missing symbol `{name}`: {source}" )]
    Symbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },
}


/// Resolves one symbol and copies the function pointer out of it.
///
/// # Safety
///
/// `T` must be the exact function pointer type of the native symbol.
unsafe fn symbol<T: Copy>( library: &Library, name: &'static str ) -> Result<T, LoadError> {
    let mut bytes = Vec::with_capacity( name.len() + 1 );
    bytes.extend_from_slice( name.as_bytes() );
    bytes.push( 0 );

    let sym: Symbol<T> = library
        .get( &bytes )
        .map_err( |source| LoadError::Symbol { name, source } )?;
    Ok( *sym )
}


/// Frees strings the engine hands over to the caller.
///
/// The engine allocates them with the C runtime's `malloc`.
unsafe extern "C" fn c_free( ptr: *mut c_void ) {
    libc::free( ptr.cast() );
}


impl LibVlc {
    /// Loads libvlc and resolves its function table.
    ///
    /// With no path, the platform's default name for the library is searched
    /// on the usual loader path (`libvlc.so`, `libvlc.dylib`, `vlc.dll`).
    pub fn load( path: Option<&Path> ) -> Result<Arc<Self>, LoadError> {
        let path = path
            .map( Path::to_path_buf )
            .unwrap_or_else( || PathBuf::from( libloading::library_filename( "vlc" ) ) );

        tracing::info!( "Loading libvlc from {:?}", path );

        // SAFETY: Loading a shared library runs its initializers; libvlc has no
        // initialization requirements beyond being loaded once per table.
        let library = unsafe { Library::new( &path ) }
            .map_err( |source| LoadError::Library { path: path.clone(), source } )?;

        // SAFETY: Each field's declared type matches the C prototype of the symbol
        // it is resolved from.
        let table = unsafe {
            LibVlc {
                exception_init: symbol( &library, "libvlc_exception_init" )?,
                exception_clear: symbol( &library, "libvlc_exception_clear" )?,
                exception_raised: symbol( &library, "libvlc_exception_raised" )?,
                exception_get_message: symbol( &library, "libvlc_exception_get_message" )?,

                new: symbol( &library, "libvlc_new" )?,
                destroy: symbol( &library, "libvlc_destroy" )?,
                get_vlc_id: symbol( &library, "libvlc_get_vlc_id" )?,
                version: symbol( &library, "VLC_Version" )?,
                free: c_free,

                audio_get_volume: symbol( &library, "libvlc_audio_get_volume" )?,
                audio_set_volume: symbol( &library, "libvlc_audio_set_volume" )?,
                audio_get_mute: symbol( &library, "libvlc_audio_get_mute" )?,
                audio_set_mute: symbol( &library, "libvlc_audio_set_mute" )?,
                audio_toggle_mute: symbol( &library, "libvlc_audio_toggle_mute" )?,

                playlist_play: symbol( &library, "libvlc_playlist_play" )?,
                playlist_pause: symbol( &library, "libvlc_playlist_pause" )?,
                playlist_isplaying: symbol( &library, "libvlc_playlist_isplaying" )?,
                playlist_items_count: symbol( &library, "libvlc_playlist_items_count" )?,
                playlist_stop: symbol( &library, "libvlc_playlist_stop" )?,
                playlist_next: symbol( &library, "libvlc_playlist_next" )?,
                playlist_prev: symbol( &library, "libvlc_playlist_prev" )?,
                playlist_clear: symbol( &library, "libvlc_playlist_clear" )?,
                playlist_add: symbol( &library, "libvlc_playlist_add" )?,
                playlist_delete_item: symbol( &library, "libvlc_playlist_delete_item" )?,
                playlist_get_input: symbol( &library, "libvlc_playlist_get_input" )?,
                playlist_index: symbol( &library, "VLC_PlaylistIndex" )?,

                input_free: symbol( &library, "libvlc_input_free" )?,
                input_get_length: symbol( &library, "libvlc_input_get_length" )?,
                input_get_time: symbol( &library, "libvlc_input_get_time" )?,
                input_set_time: symbol( &library, "libvlc_input_set_time" )?,
                input_get_position: symbol( &library, "libvlc_input_get_position" )?,
                input_set_position: symbol( &library, "libvlc_input_set_position" )?,
                input_get_rate: symbol( &library, "libvlc_input_get_rate" )?,
                input_set_rate: symbol( &library, "libvlc_input_set_rate" )?,
                input_get_state: symbol( &library, "libvlc_input_get_state" )?,
                input_will_play: symbol( &library, "libvlc_input_will_play" )?,
                input_has_vout: symbol( &library, "libvlc_input_has_vout" )?,
                input_get_fps: symbol( &library, "libvlc_input_get_fps" )?,
                get_fullscreen: symbol( &library, "libvlc_get_fullscreen" )?,
                set_fullscreen: symbol( &library, "libvlc_set_fullscreen" )?,
                toggle_fullscreen: symbol( &library, "libvlc_toggle_fullscreen" )?,
                video_get_height: symbol( &library, "libvlc_video_get_height" )?,
                video_get_width: symbol( &library, "libvlc_video_get_width" )?,
                video_set_aspect_ratio: symbol( &library, "libvlc_video_set_aspect_ratio" )?,
                video_take_snapshot: symbol( &library, "libvlc_video_take_snapshot" )?,

                log_open: symbol( &library, "libvlc_log_open" )?,
                log_close: symbol( &library, "libvlc_log_close" )?,
                log_count: symbol( &library, "libvlc_log_count" )?,
                log_clear: symbol( &library, "libvlc_log_clear" )?,
                get_log_verbosity: symbol( &library, "libvlc_get_log_verbosity" )?,
                set_log_verbosity: symbol( &library, "libvlc_set_log_verbosity" )?,
                log_get_iterator: symbol( &library, "libvlc_log_get_iterator" )?,
                log_iterator_free: symbol( &library, "libvlc_log_iterator_free" )?,
                log_iterator_has_next: symbol( &library, "libvlc_log_iterator_has_next" )?,
                log_iterator_next: symbol( &library, "libvlc_log_iterator_next" )?,

                current_object: symbol( &library, "vlc_current_object" )?,
                object_find: symbol( &library, "__vlc_object_find" )?,
                object_release: symbol( &library, "__vlc_object_release" )?,
                list_find: symbol( &library, "__vlc_list_find" )?,
                list_release: symbol( &library, "vlc_list_release" )?,
                var_get: symbol( &library, "__var_Get" )?,
                var_set: symbol( &library, "__var_Set" )?,
                var_change: symbol( &library, "__var_Change" )?,
                config_get_int: symbol( &library, "__config_GetInt" )?,
                config_put_int: symbol( &library, "__config_PutInt" )?,
                config_get_float: symbol( &library, "__config_GetFloat" )?,
                config_put_float: symbol( &library, "__config_PutFloat" )?,
                config_get_psz: symbol( &library, "__config_GetPsz" )?,
                config_put_psz: symbol( &library, "__config_PutPsz" )?,

                _library: None,
            }
        };

        let table = LibVlc { _library: Some( library ), ..table };
        tracing::debug!( "Resolved libvlc function table" );

        Ok( Arc::new( table ) )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_load_missing_library() {
        let result = LibVlc::load( Some( Path::new( "/nonexistent/libvlc-missing.so" ) ) );
        match result {
            Err( LoadError::Library { path, .. } ) => {
                assert_eq!( path, PathBuf::from( "/nonexistent/libvlc-missing.so" ) );
            }
            other => panic!( "expected library error, got {:?}", other ),
        }
    }
}
