use anyhow::Result;
use log::error;
use std::sync::Arc;
use tokio::sync::broadcast;

use solaredge_bridge::prelude::*;

fn init_logging(level: &str) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init()
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();

    // Initialize logging with default level; the configured level takes
    // over once the config is loaded
    let _ = init_logging("info");

    let config = ConfigWrapper::new(options.config_file).unwrap_or_else(|err| {
        error!("Failed to load config: {:?}", err);
        std::process::exit(255);
    });

    if let Err(e) = init_logging(&config.loglevel()) {
        log::debug!("Log level already initialized: {}", e);
    }

    let config = Arc::new(config);

    // Create a channel for shutdown signaling
    let (shutdown_tx, _) = broadcast::channel(1);

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        if let Err(e) = shutdown_tx_clone.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    });

    // Run the application
    solaredge_bridge::app(shutdown_tx.subscribe(), config).await
}
