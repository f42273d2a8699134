// Module declarations for the application's core components
pub mod channels;    // Inter-component communication channels
pub mod config;      // Configuration management
pub mod coordinator; // Poll loop: fetch, decode, publish
pub mod cursor;      // Bounds-checked cursor over raw register bytes
pub mod decoder;     // Register block decoding into samples
pub mod error;       // Error handling and types
pub mod influx;      // InfluxDB integration
pub mod modbus;      // Modbus TCP register fetcher
pub mod options;     // Command line options parsing
pub mod prelude;     // Common imports and types

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use std::sync::Arc;

/// Holds the long-lived components so shutdown can be coordinated from one
/// place.
#[derive(Clone)]
pub struct Components {
    pub coordinator: Coordinator,
    pub influx: Influx,
    pub channels: Channels,
}

impl Components {
    /// Stops components in order: the coordinator first so no new samples
    /// are produced, then the publisher so the queue drains.
    pub fn stop(&self) {
        info!("Stopping all components...");

        self.coordinator.stop();
        self.influx.stop();

        info!("Shutdown complete");
    }
}

/// Main application entry point
///
/// Starts the publisher and the poll loop, then waits for the shutdown
/// signal. Store initialization failure is fatal here, before the poll loop
/// produces anything; once the loop is running no single bad cycle ends the
/// process.
pub async fn app(
    mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    config: Arc<ConfigWrapper>,
) -> Result<()> {
    let inverter = config.inverter();

    info!("Starting solaredge-bridge {}", CARGO_PKG_VERSION);
    info!(
        "Connecting to SolarEdge inverter {} on port {} using unit id {}",
        inverter.host(),
        inverter.port(),
        inverter.unit_id()
    );
    info!(
        "Writing data to InfluxDB {} every {} seconds",
        config.influx().url(),
        config.period()
    );

    let channels = Channels::new();

    let influx = Influx::new((*config).clone(), channels.clone());
    influx.start().await?;

    let coordinator = Coordinator::new((*config).clone(), channels.clone());
    let coordinator_clone = coordinator.clone();
    let coordinator_handle = tokio::spawn(async move {
        if let Err(e) = coordinator_clone.start().await {
            error!("Coordinator task failed: {}", e);
        }
    });

    info!("Waiting for shutdown signal...");
    let _ = shutdown_rx.recv().await;

    info!("Shutdown signal received, stopping components...");
    let components = Components {
        coordinator,
        influx,
        channels,
    };
    components.stop();

    if let Err(e) = coordinator_handle.await {
        error!("Error waiting for coordinator task: {}", e);
    }

    info!("Application shutdown complete");
    Ok(())
}
