//! # Murmur
//!
//! Plays an endless crossfaded loop of ambient tracks from one directory
//! and drops in a random voice clip from another every so often.
//!
//! Runs until interrupted with Ctrl-C. Configuration is read from the file
//! named by `MURMUR_CONFIG`, or the platform config directory, or falls
//! back to defaults.

use std::time::Instant;

use anyhow::{Context, Result};
use murmur_audio::MixerEngine;
use murmur_core::Config;
use murmur_player::{LocalFs, SeededRandom, Session, SoundPool};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "murmur=info,murmur_app=info,murmur_player=info,murmur_audio=info".into()
            }),
        )
        .init();

    info!("Starting Murmur v{}", env!("CARGO_PKG_VERSION"));

    let result = match Config::load().context("Failed to load configuration") {
        Ok(config) => {
            debug!("Configuration: {config:?}");
            run(&config).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        if is_startup_failure(e) {
            error!("Cannot start: {e:#}");
        } else {
            error!("{e:#}");
        }
    }
    result
}

/// Bad configuration or sound directories, as opposed to a failure while
/// playing.
fn is_startup_failure(e: &anyhow::Error) -> bool {
    e.downcast_ref::<murmur_core::Error>()
        .is_some_and(murmur_core::Error::is_startup)
}

/// Open the engine and pools, then tick until Ctrl-C or a fatal error.
///
/// The session is dropped on every way out of this function, which
/// releases the pools and closes the engine.
async fn run(config: &Config) -> Result<()> {
    let engine =
        MixerEngine::new(config.max_channels).context("Failed to initialize audio engine")?;
    let mut session = Session::open(engine, &LocalFs, config, SeededRandom::from_time())
        .context("Failed to load sounds")?;
    info!(
        "{} ambient tracks, {} voice clips",
        session.ambient().map_or(0, SoundPool::len),
        session.voice().map_or(0, SoundPool::len)
    );

    session
        .start(Instant::now())
        .context("Failed to start playback")?;

    let mut ticker = tokio::time::interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.tick(Instant::now()).context("Playback failed")?;
            }
            signal = &mut shutdown => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted, shutting down");
                debug!("Final state: {:?}", session.scheduler().state());
                break;
            }
        }
    }

    Ok(())
}
