use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::MatchRecord;

/// Why a provider call produced no usable collection.
///
/// The variants only matter for logs; the cache recovers from all of them
/// the same way.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Provider unreachable, timed out, or the body could not be read
    #[error("network error: {0}")]
    Network(String),

    /// Provider answered with a non-success status
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Payload did not have the expected shape
    #[error("invalid payload: {0}")]
    Validation(String),
}

/// Trait that every match-listing backend must implement.
#[async_trait]
pub trait MatchProvider: Send + Sync {
    /// Return the provider's current set of matches. No ordering or
    /// uniqueness is promised.
    async fn fetch_current_matches(&self) -> Result<Vec<MatchRecord>, FetchError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
