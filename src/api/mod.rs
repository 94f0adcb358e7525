use axum::{extract::State, response::IntoResponse, routing::get, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::cache::{CacheState, MatchCache, RefreshOutcome, Subscription};

pub struct AppState {
    pub cache: MatchCache,
    /// The API's own consumer of the cache; its timer keeps the data warm
    pub feed: Subscription,
}

/// Build the Axum router for the match API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/matches", get(matches_handler))
        .route("/api/matches/refresh", post(refresh_handler))
        .route("/api/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    outcome: RefreshOutcome,
    state: CacheState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    /// "ok" or "degraded" (last refresh failed)
    status: &'static str,
    provider: String,
    matches: usize,
    live: usize,
    stale: bool,
    last_fetched_at: Option<DateTime<Utc>>,
}

/// GET /api/matches
async fn matches_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.feed.snapshot())
}

/// POST /api/matches/refresh
async fn refresh_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let outcome = state.feed.refetch().await;
    Json(RefreshResponse {
        outcome,
        state: state.feed.snapshot(),
    })
}

/// GET /api/health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.feed.snapshot();
    Json(HealthResponse {
        status: if snapshot.error.is_some() { "degraded" } else { "ok" },
        provider: state.cache.provider_name().to_string(),
        matches: snapshot.matches.len(),
        live: snapshot.live_count(),
        stale: state.cache.is_stale(),
        last_fetched_at: snapshot.last_fetched_at,
    })
}
