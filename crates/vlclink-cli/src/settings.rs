//! Persistent settings
//!
//! Engine options and the library location saved between runs. Command-line
//! flags are layered on top of whatever was saved.

use std::fs;
use std::path::PathBuf;

use serde::{ Deserialize, Serialize };

use vlclink_core::VlcConfig;

use crate::cli::Args;


/// Settings stored in `settings.json`.
#[derive( Debug, Clone, Default, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct Settings {
    /// Options the engine is started with
    pub engine: VlcConfig,

    /// libvlc shared library; the platform default name when unset
    pub library: Option<PathBuf>,

    /// Engine log verbosity applied after start-up
    pub verbosity: Option<u32>,
}


impl Settings {
    /// Returns the path to the settings file.
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map( |p| p.join( "vlclink" ).join( "settings.json" ) )
    }


    /// Loads settings from disk, or returns defaults if not found.
    pub fn load() -> Self {
        let path = match Self::settings_path() {
            Some( p ) => p,
            None => return Self::default(),
        };

        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string( &path ) {
            Ok( contents ) => serde_json::from_str( &contents ).unwrap_or_else( |e| {
                tracing::warn!( "Ignoring malformed settings {:?}: {}", path, e );
                Self::default()
            }),
            Err( e ) => {
                tracing::warn!( "Failed to read settings: {}", e );
                Self::default()
            }
        }
    }


    /// Saves settings to disk.
    pub fn save( &self ) {
        let path = match Self::settings_path() {
            Some( p ) => p,
            None => return,
        };

        if let Some( parent ) = path.parent() {
            if !parent.exists() {
                if let Err( e ) = fs::create_dir_all( parent ) {
                    tracing::warn!( "Failed to create settings directory: {}", e );
                    return;
                }
            }
        }

        match serde_json::to_string_pretty( self ) {
            Ok( json ) => {
                if let Err( e ) = fs::write( &path, json ) {
                    tracing::warn!( "Failed to save settings: {}", e );
                } else {
                    tracing::info!( "Saved settings to {:?}", path );
                }
            }
            Err( e ) => {
                tracing::warn!( "Failed to serialize settings: {}", e );
            }
        }
    }


    /// Overrides saved values with the ones given on the command line.
    pub fn apply_args( &mut self, args: &Args ) {
        if let Some( path ) = &args.plugin_path {
            self.engine.plugin_path = Some( path.clone() );
        }
        if args.no_audio {
            self.engine.audio = false;
        }
        if let Some( volume ) = args.volume {
            self.engine.volume = Some( volume );
        }
        if args.spdif {
            self.engine.spdif = true;
        }
        if args.fullscreen {
            self.engine.fullscreen = true;
        }
        if let Some( dolby ) = args.dolby {
            self.engine.dolby_surround = dolby.into();
        }
        if let Some( library ) = &args.library {
            self.library = Some( library.clone() );
        }
        if let Some( verbosity ) = args.verbosity {
            self.verbosity = Some( verbosity );
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use clap::Parser;
    use vlclink_core::DolbySurround;


    #[test]
    fn test_args_override_saved() {
        let mut settings = Settings {
            engine: VlcConfig { volume: Some( 100 ), spdif: true, ..Default::default() },
            library: Some( PathBuf::from( "/usr/lib/libvlc.so" ) ),
            verbosity: Some( 1 ),
        };
        let args = Args::try_parse_from([ "vlclink", "--volume", "300", "--dolby", "off", "a.mp4" ]).unwrap();
        settings.apply_args( &args );

        assert_eq!( settings.engine.volume, Some( 300 ) );
        assert!( settings.engine.spdif );
        assert_eq!( settings.engine.dolby_surround, DolbySurround::Off );
        assert_eq!( settings.library, Some( PathBuf::from( "/usr/lib/libvlc.so" ) ) );
        assert_eq!( settings.verbosity, Some( 1 ) );
    }


    #[test]
    fn test_partial_file() {
        let settings: Settings = serde_json::from_str( r#"{ "engine": { "audio": false } }"# ).unwrap();
        assert!( !settings.engine.audio );
        assert_eq!( settings.library, None );
        assert_eq!( settings.engine.arguments(), vec![ "-I", "dummy", "--no-audio" ] );
    }
}
