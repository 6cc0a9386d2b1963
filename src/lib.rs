pub mod api;
pub mod buffer;
pub mod config;
pub mod convert;
pub mod log;
pub mod market_data;
pub mod model;
pub mod pair;
pub mod persister;
pub mod poller;
pub mod providers;
pub mod registry;
pub mod store;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::buffer::QuoteBuffer;
use crate::config::AppConfig;
use crate::convert::ConversionEngine;
use crate::market_data::MarketDataSource;
use crate::persister::QuotePersister;
use crate::poller::QuotePoller;
use crate::providers::binance::BinanceSource;
use crate::registry::SymbolRegistry;
use crate::store::QuoteStore;

/// Builds every component once, runs the poller and persister alongside the
/// HTTP server, and tears everything down cooperatively on Ctrl-C.
pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("coinconv starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = Arc::new(QuoteStore::open(&config.data_path()?)?);
    let buffer = QuoteBuffer::new();
    let source: Arc<dyn MarketDataSource> = Arc::new(BinanceSource::new(
        &config.upstream.base_url,
        Duration::from_secs(config.upstream.request_timeout_secs),
    )?);
    let registry = Arc::new(SymbolRegistry::new(Arc::clone(&source)));
    let engine = Arc::new(ConversionEngine::new(
        Arc::clone(&registry),
        buffer.clone(),
        Arc::clone(&store),
        config.freshness_secs,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller = QuotePoller::new(
        source,
        registry,
        buffer.clone(),
        Duration::from_secs(config.poll_interval_secs),
        Duration::from_secs(config.symbol_refresh_secs),
    );
    let persister = QuotePersister::new(
        buffer,
        store,
        Duration::from_secs(config.save_interval_secs),
        config.retention_days,
    );

    let poller_handle = tokio::spawn(poller.run(shutdown_rx.clone()));
    let persister_handle = tokio::spawn(persister.run(shutdown_rx));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {addr}");

    let app = api::router(api::AppState { engine });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // Stop the periodic tasks; the persister performs a final flush.
    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(poller_handle, persister_handle);
    info!("coinconv stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
