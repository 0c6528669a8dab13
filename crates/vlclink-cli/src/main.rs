//! vlclink CLI - Headless media player
//!
//! Starts an engine, queues one location, and prints elapsed/total seconds
//! until playback ends. Engine log messages are forwarded to tracing.

mod cli;
mod settings;

use std::thread;
use std::time::Duration;

use anyhow::{ bail, Context, Result };
use clap::Parser;
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt, EnvFilter };

use cli::Args;
use settings::Settings;

use vlclink_core::{ Instance, LibVlc, LogSeverity };


/// Polls allowed for playback to start before giving up.
const START_POLLS: u32 = 50;
const START_POLL_INTERVAL: Duration = Duration::from_millis( 100 );


/// Forwards pending engine messages to tracing, then empties the engine log.
fn drain_log( instance: &Instance ) -> Result<()> {
    let log = instance.log()?;

    let mut messages = log.iter()?;
    while messages.move_next() {
        let Some( message ) = messages.current() else {
            continue;
        };
        match message.level() {
            LogSeverity::Error => tracing::error!( target: "vlc", "[{}] {}", message.name, message.message ),
            LogSeverity::Warning => tracing::warn!( target: "vlc", "[{}] {}", message.name, message.message ),
            LogSeverity::Debug => tracing::debug!( target: "vlc", "[{}] {}", message.name, message.message ),
            _ => tracing::info!( target: "vlc", "[{}] {}", message.name, message.message ),
        }
    }
    if let Some( err ) = messages.last_error() {
        tracing::warn!( "Engine log read stopped early: {}", err );
    }
    drop( messages );

    log.clear()?;
    Ok(())
}


/// Waits for the engine to report playback, draining its log meanwhile.
fn wait_for_start( instance: &Instance ) -> Result<()> {
    for _ in 0..START_POLLS {
        if instance.playlist().is_playing()? {
            return Ok(());
        }
        drain_log( instance )?;
        thread::sleep( START_POLL_INTERVAL );
    }
    bail!( "playback did not start" )
}


fn play( instance: &Instance, args: &Args ) -> Result<()> {
    let playlist = instance.playlist();
    let item = playlist.add( &args.uri, Some( "" ) )?;
    tracing::info!( "Queued {} as item {}", args.uri, item );

    playlist.play( Some( item ) ).with_context( || format!( "failed to play {}", args.uri ) )?;
    wait_for_start( instance )?;

    let interval = Duration::from_millis( args.poll_ms.max( 1 ) );
    while playlist.is_playing()? {
        let input = instance.input()?;
        println!( "{}/{}", input.time()? / 1000, input.length()? / 1000 );
        drop( input );

        drain_log( instance )?;
        thread::sleep( interval );
    }

    tracing::info!( "Playback finished" );
    Ok(())
}


fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else( |_| "vlclink_cli=info,vlclink_core=info,vlc=warn".into() ),
        )
        .with( tracing_subscriber::fmt::layer().with_writer( std::io::stderr ) )
        .init();

    let args = Args::parse();

    let mut settings = Settings::load();
    settings.apply_args( &args );
    if args.save_settings {
        settings.save();
    }

    let api = LibVlc::load( settings.library.as_deref() )?;
    let instance = Instance::new( api, &settings.engine ).context( "failed to start the engine" )?;
    tracing::info!( "Engine {} started", instance.version() );

    if let Some( level ) = settings.verbosity {
        instance.log()?.set_verbosity( level )?;
    }
    drain_log( &instance )?;

    let result = play( &instance, &args );
    if let Err( e ) = drain_log( &instance ) {
        tracing::warn!( "Failed to read the engine log: {}", e );
    }

    instance.close()?;
    result
}
