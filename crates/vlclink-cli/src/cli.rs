//! Command-line argument parsing for vlclink.

use std::path::PathBuf;

use clap::{ Parser, ValueEnum };

use vlclink_core::DolbySurround;


/// vlclink - Plays one media location through libvlc and reports progress.
#[derive( Parser, Debug )]
#[command( name = "vlclink" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// Media location to play (path or URI).
    pub uri: String,

    /// Directory the engine loads its modules from.
    #[arg( long )]
    pub plugin_path: Option<PathBuf>,

    /// Disable audio output.
    #[arg( long )]
    pub no_audio: bool,

    /// Initial volume, 0 to 1024.
    #[arg( long, value_parser = clap::value_parser!( u32 ).range( 0..=1024 ) )]
    pub volume: Option<u32>,

    /// Pass compressed audio through S/PDIF.
    #[arg( long )]
    pub spdif: bool,

    /// Start video output in fullscreen.
    #[arg( long )]
    pub fullscreen: bool,

    /// Force Dolby Surround decoding.
    #[arg( long, value_enum )]
    pub dolby: Option<DolbyArg>,

    /// Path to the libvlc shared library.
    #[arg( long )]
    pub library: Option<PathBuf>,

    /// Engine log verbosity.
    #[arg( long )]
    pub verbosity: Option<u32>,

    /// Interval between progress reports, in milliseconds.
    #[arg( long, default_value_t = 1000 )]
    pub poll_ms: u64,

    /// Remember the engine options given on this command line.
    #[arg( long )]
    pub save_settings: bool,
}


/// Dolby Surround modes accepted on the command line.
#[derive( ValueEnum, Clone, Copy, Debug, PartialEq, Eq )]
pub enum DolbyArg {
    Auto,
    On,
    Off,
}


impl From<DolbyArg> for DolbySurround {
    fn from( arg: DolbyArg ) -> Self {
        match arg {
            DolbyArg::Auto => DolbySurround::Auto,
            DolbyArg::On => DolbySurround::On,
            DolbyArg::Off => DolbySurround::Off,
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_minimal_command_line() {
        let args = Args::try_parse_from([ "vlclink", "file:///tmp/a.mp4" ]).unwrap();
        assert_eq!( args.uri, "file:///tmp/a.mp4" );
        assert_eq!( args.poll_ms, 1000 );
        assert!( !args.no_audio );
        assert_eq!( args.dolby, None );
    }


    #[test]
    fn test_engine_options() {
        let args = Args::try_parse_from([
            "vlclink", "--no-audio", "--volume", "200", "--dolby", "on", "--plugin-path", "/opt/vlc", "a.mp4",
        ])
        .unwrap();
        assert!( args.no_audio );
        assert_eq!( args.volume, Some( 200 ) );
        assert_eq!( args.dolby.map( DolbySurround::from ), Some( DolbySurround::On ) );
        assert_eq!( args.plugin_path, Some( PathBuf::from( "/opt/vlc" ) ) );
    }


    #[test]
    fn test_volume_out_of_range() {
        assert!( Args::try_parse_from([ "vlclink", "--volume", "2000", "a.mp4" ]).is_err() );
    }
}
