//! Engine start-up configuration
//!
//! Builds the ordered argument list handed to the engine when an instance is
//! created. Serializable so front ends can persist it.

use std::path::PathBuf;

use serde::{ Deserialize, Serialize };


/// Forced Dolby Surround decoding mode.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize )]
#[serde( rename_all = "lowercase" )]
pub enum DolbySurround {
    #[default]
    Auto = 0,
    On = 1,
    Off = 2,
}


/// Options the engine is started with.
#[derive( Debug, Clone, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct VlcConfig {
    /// Directory the engine loads its modules from
    pub plugin_path: Option<PathBuf>,

    /// Enable audio output
    pub audio: bool,

    /// Initial volume (engine range, 0-1024)
    pub volume: Option<u32>,

    /// Pass compressed audio through S/PDIF
    pub spdif: bool,

    /// Start video output in fullscreen
    pub fullscreen: bool,

    pub dolby_surround: DolbySurround,

    /// Appended verbatim after the generated arguments
    pub extra_args: Vec<String>,
}


impl Default for VlcConfig {
    fn default() -> Self {
        Self {
            plugin_path: None,
            audio: true,
            volume: None,
            spdif: false,
            fullscreen: false,
            dolby_surround: DolbySurround::Auto,
            extra_args: Vec::new(),
        }
    }
}


impl VlcConfig {
    /// Returns the argument list, always starting with the headless interface pair.
    pub fn arguments( &self ) -> Vec<String> {
        let mut args = vec![ "-I".to_string(), "dummy".to_string() ];

        if let Some( path ) = &self.plugin_path {
            let path = path.to_string_lossy();
            if !path.trim().is_empty() {
                args.push( format!( "--plugin-path={}", path ) );
            }
        }

        if !self.audio {
            args.push( "--no-audio".to_string() );
        }

        if let Some( volume ) = self.volume {
            args.push( "--volume".to_string() );
            args.push( volume.to_string() );
        }

        if self.spdif {
            args.push( "--spdif".to_string() );
        }

        if self.fullscreen {
            args.push( "--fullscreen".to_string() );
        }

        if self.dolby_surround != DolbySurround::Auto {
            args.push( "--force-dolby-surround".to_string() );
            args.push( ( self.dolby_surround as i32 ).to_string() );
        }

        args.extend( self.extra_args.iter().cloned() );
        args
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_default_arguments() {
        assert_eq!( VlcConfig::default().arguments(), vec![ "-I", "dummy" ] );
    }


    #[test]
    fn test_all_options_in_order() {
        let config = VlcConfig {
            plugin_path: Some( PathBuf::from( "/usr/lib/vlc/plugins" ) ),
            audio: false,
            volume: Some( 200 ),
            spdif: true,
            fullscreen: true,
            dolby_surround: DolbySurround::Off,
            extra_args: vec![ "--verbose=2".to_string() ],
        };
        assert_eq!(
            config.arguments(),
            vec![
                "-I", "dummy",
                "--plugin-path=/usr/lib/vlc/plugins",
                "--no-audio",
                "--volume", "200",
                "--spdif",
                "--fullscreen",
                "--force-dolby-surround", "2",
                "--verbose=2",
            ]
        );
    }


    #[test]
    fn test_blank_plugin_path_skipped() {
        let config = VlcConfig {
            plugin_path: Some( PathBuf::from( "  " ) ),
            ..Default::default()
        };
        assert_eq!( config.arguments(), vec![ "-I", "dummy" ] );
    }


    #[test]
    fn test_partial_json_uses_defaults() {
        let config: VlcConfig = serde_json::from_str( r#"{ "volume": 120, "dolby_surround": "on" }"# ).unwrap();
        assert!( config.audio );
        assert_eq!( config.volume, Some( 120 ) );
        assert_eq!( config.dolby_surround, DolbySurround::On );
        assert_eq!( config.arguments(), vec![ "-I", "dummy", "--volume", "120", "--force-dolby-surround", "1" ] );
    }
}
