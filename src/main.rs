use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

mod api;
mod cache;
mod config;
mod db;
mod matches;

use api::AppState;
use cache::{MatchCache, PersistenceBridge, Subscription};
use config::Config;
use db::Database;
use matches::{FootballData, MatchProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    if config.refresh_interval() < config.cache_ttl() {
        warn!(
            "Refresh interval ({}s) is shorter than the cache TTL ({}s); extra ticks will be no-ops",
            config.refresh_interval_secs, config.cache_ttl_secs
        );
    }

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    if config.matches_api_key.is_none() {
        warn!("No FOOTBALL_DATA_API_KEY set – provider will apply anonymous rate limits");
    }
    let provider: Arc<dyn MatchProvider> = Arc::new(FootballData::new(
        &config.matches_api_url,
        config.matches_api_key.clone(),
        config.competitions.as_deref(),
        config.request_timeout(),
    )?);
    let cache = MatchCache::builder(provider)
        .ttl(config.cache_ttl())
        .persistence(PersistenceBridge::new(Arc::new(db)))
        .build();
    info!(
        "Match provider: {} (ttl={:?}, refresh every {:?}, {} matches on warm start)",
        cache.provider_name(),
        cache.ttl(),
        config.refresh_interval(),
        cache.snapshot().matches.len()
    );

    // Log when the feed degrades or recovers
    let mut watcher = Subscription::activate(&cache, config.refresh_interval());
    tokio::spawn(async move {
        let mut degraded = false;
        while let Some(state) = watcher.changed().await {
            if state.loading {
                continue;
            }
            match (&state.error, degraded) {
                (Some(err), false) => {
                    warn!(
                        "Match feed degraded, serving {} cached matches: {}",
                        state.matches.len(),
                        err.message
                    );
                    degraded = true;
                }
                (None, true) => {
                    info!("Match feed recovered ({} live)", state.live_count());
                    degraded = false;
                }
                _ => {}
            }
        }
    });

    let feed = Subscription::activate(&cache, config.refresh_interval());
    let app = api::router(AppState { cache, feed });

    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Match API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run API server (blocks until shutdown)
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
