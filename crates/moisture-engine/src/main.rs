//! Moisture simulator binary.
//!
//! Wires the device store, broadcast hub, simulation clock, and HTTP server
//! together and runs until the process is asked to stop.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `moisture-config.yaml`
//! 3. Create the device store
//! 4. Seed the example devices if the store is empty
//! 5. Create the broadcast hub and start the simulation clock
//! 6. Serve HTTP + `WebSocket` until Ctrl-C or SIGTERM
//! 7. Stop the clock after the in-flight tick completes

mod error;
mod seed;

use std::path::Path;
use std::sync::Arc;

use moisture_core::clock::SimulationClock;
use moisture_core::config::SimulatorConfig;
use moisture_observer::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config file looked up relative to the working directory.
const CONFIG_PATH: &str = "moisture-config.yaml";

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1-2. Logging needs the configured level, so read the config first and
    // report where it came from once the subscriber is up.
    let config_path = Path::new(CONFIG_PATH);
    let config = SimulatorConfig::load_or_default(config_path);
    let level = config
        .as_ref()
        .map_or("info", |config| config.logging.level.as_str());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(true)
        .init();

    info!("moisture-engine starting");
    let config = config?;
    if !config_path.exists() {
        info!("Config file not found, using defaults");
    }
    info!(
        tick_seconds = config.simulation.tick_seconds,
        max_history = config.simulation.max_history,
        seed_examples = config.simulation.seed_examples,
        port = config.server.port,
        "Configuration loaded"
    );

    // 3-5. Store, hub, clock.
    let app_state = Arc::new(AppState::from_settings(config.simulation.clone()));
    if config.simulation.seed_examples {
        seed::seed_if_empty(&app_state.store).await;
    }

    let clock = SimulationClock::new(
        Arc::clone(&app_state.store),
        Arc::clone(&app_state.hub),
        config.simulation.tick_interval(),
    );
    clock.start().await;

    // 6. Serve until a shutdown signal arrives.
    let served =
        moisture_observer::start_server(&config.server, Arc::clone(&app_state), shutdown_signal())
            .await;

    // 7. The clock stops even if the server failed.
    clock.stop().await;
    served?;

    info!(
        ticks = clock.ticks_completed(),
        "moisture-engine shutdown complete"
    );
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("Shutdown signal received");
}
