//! Demo payment service.
//!
//! Configuration is read from the path given as first argument, or from
//! `PAYLOG_CONFIG`; without either, defaults apply and hot reload is off.

use std::path::PathBuf;

use tokio::net::TcpListener;

use paylog::config::watcher::ConfigWatcher;
use paylog::config::{load_config, PaylogConfig};
use paylog::http::HttpServer;
use paylog::lifecycle::{self, signals, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PAYLOG_CONFIG").ok())
        .map(PathBuf::from);

    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => PaylogConfig::default(),
    };

    let components = lifecycle::initialize(config)?;
    tracing::info!(
        bind_address = %components.config.listener.bind_address,
        config = ?config_path,
        "Configuration loaded"
    );

    // Keep the watcher handle alive for the life of the process.
    let _watcher = match &config_path {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            let interceptor = components.interceptor.clone();
            tokio::spawn(async move {
                while let Some(reloaded) = updates.recv().await {
                    interceptor.reload(&reloaded.instrumentation);
                }
            });
            Some(handle)
        }
        None => None,
    };

    let shutdown = Shutdown::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move { signals::trigger_on_signal(&on_signal).await });

    let listener = TcpListener::bind(&components.config.listener.bind_address).await?;
    HttpServer::new(&components).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
