//! Volspike server - intraday volume-spike scanner for NSE equities.
//!
//! Exposes the batch scan as a single-flight background job over a small
//! HTTP API:
//! - `POST /api/analyze` starts a scan (400 if one is already running)
//! - `GET /api/status` polls progress and the latest results
//!
//! # Environment Variables
//! See `Config::from_env` for the full list; everything has a default, so
//! `cargo run` on a fresh checkout works (worst case it scans the fallback
//! symbol list).

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;
use volspike::application::jobs::{JobRegistry, JobRunner};
use volspike::application::scanner::ScanOrchestrator;
use volspike::config::Config;
use volspike::infrastructure::api::{AppState, build_router};
use volspike::infrastructure::core::cooldown::CooldownGate;
use volspike::infrastructure::persistence::Database;
use volspike::infrastructure::symbols::{NseSymbolFeed, SymbolDirectory};
use volspike::infrastructure::yahoo::YahooMarketData;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Volspike {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: batch_size={}, workers={}, max_symbols={}, lookback={}/{}",
        config.batch_size,
        config.worker_count,
        config.max_symbols,
        config.lookback_range,
        config.bar_interval
    );

    let db = Database::new(&config.database_url).await?;

    let feed = Arc::new(NseSymbolFeed::new(
        config.symbol_feed_url.clone(),
        Duration::from_secs(config.feed_timeout_secs),
    ));
    let directory = Arc::new(SymbolDirectory::new(db, feed));

    let cooldown = Arc::new(CooldownGate::new(Duration::from_secs(
        config.rate_limit_cooldown_secs,
    )));
    let market_data = Arc::new(YahooMarketData::new(
        config.yahoo_base_url.clone(),
        config.lookback_range.clone(),
        config.bar_interval.clone(),
        Duration::from_secs(config.provider_timeout_secs),
        cooldown,
    ));

    let orchestrator = Arc::new(ScanOrchestrator::new(market_data, config.scan_settings()));
    let runner = Arc::new(JobRunner::new(
        Arc::new(JobRegistry::new()),
        directory,
        orchestrator,
    ));

    let app = build_router(AppState { jobs: runner });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
