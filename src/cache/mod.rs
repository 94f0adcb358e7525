//! Shared freshness cache for the live match list.
//!
//! One `MatchCache` is built per process and cloned into every consumer.
//! It owns the only writable copy of `CacheState` and decides when the
//! upstream provider is asked again:
//!
//! ```text
//!  Subscription ──ensure_fresh()──▶ MatchCache ──(stale)──▶ MatchProvider
//!       ▲                              │ commit
//!       └──── watch::Receiver ◀────────┤
//!                                      └──post-commit──▶ PersistenceBridge
//! ```
//!
//! At most one provider call is in flight at a time, a successful fetch is
//! trusted for `ttl`, and a failed fetch never discards the last good data.

pub mod persistence;
pub mod subscription;
#[cfg(test)]
pub(crate) mod testing;

pub use persistence::PersistenceBridge;
pub use subscription::Subscription;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::db::models::MatchRecord;
use crate::matches::{FetchError, MatchProvider};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Source of wall-clock time for TTL decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Upstream,
    Validation,
    /// The refresh task itself died (provider panic, runtime shutdown)
    Internal,
}

/// Last refresh failure, as shown to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorInfo {
    fn from_fetch(err: &FetchError, occurred_at: DateTime<Utc>) -> Self {
        let kind = match err {
            FetchError::Network(_) => ErrorKind::Network,
            FetchError::Upstream { .. } => ErrorKind::Upstream,
            FetchError::Validation(_) => ErrorKind::Validation,
        };
        ErrorInfo {
            kind,
            message: err.to_string(),
            occurred_at,
        }
    }
}

/// Snapshot of what we currently believe the matches are.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheState {
    /// Sorted by kickoff, most recent first; ids are unique
    pub matches: Vec<MatchRecord>,
    /// True exactly while a provider call is in flight
    pub loading: bool,
    pub error: Option<ErrorInfo>,
    /// Time of the last successful fetch in this process
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl CacheState {
    /// Number of matches currently in play or at half time.
    pub fn live_count(&self) -> usize {
        self.matches.iter().filter(|m| m.status.is_live()).count()
    }
}

/// What a single `ensure_fresh` call ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Another call already has a fetch in flight
    InFlight,
    /// The last successful fetch is younger than the TTL
    Fresh,
    Refreshed { count: usize },
    Failed { kind: ErrorKind },
}

/// Cheap, cloneable handle to the shared cache.
#[derive(Clone)]
pub struct MatchCache {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn MatchProvider>,
    persistence: Option<PersistenceBridge>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    state: watch::Sender<CacheState>,
}

pub struct MatchCacheBuilder {
    provider: Arc<dyn MatchProvider>,
    ttl: Duration,
    persistence: Option<PersistenceBridge>,
    clock: Arc<dyn Clock>,
}

impl MatchCacheBuilder {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Mirror every successful refresh to `bridge` and warm-start from it.
    pub fn persistence(mut self, bridge: PersistenceBridge) -> Self {
        self.persistence = Some(bridge);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create the cache, seeding it from persistence when configured.
    /// Hydrated data never counts as fresh.
    pub fn build(self) -> MatchCache {
        let matches = self
            .persistence
            .as_ref()
            .map(|bridge| normalize_matches(bridge.hydrate()))
            .unwrap_or_default();

        let (state, _) = watch::channel(CacheState {
            matches,
            ..CacheState::default()
        });

        MatchCache {
            inner: Arc::new(Inner {
                provider: self.provider,
                persistence: self.persistence,
                clock: self.clock,
                ttl: self.ttl,
                state,
            }),
        }
    }
}

impl MatchCache {
    pub fn builder(provider: Arc<dyn MatchProvider>) -> MatchCacheBuilder {
        MatchCacheBuilder {
            provider,
            ttl: DEFAULT_CACHE_TTL,
            persistence: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn snapshot(&self) -> CacheState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<CacheState> {
        self.inner.state.subscribe()
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn provider_name(&self) -> &str {
        self.inner.provider.name()
    }

    /// True when no successful fetch is younger than the TTL.
    pub fn is_stale(&self) -> bool {
        let now = self.inner.clock.now();
        match self.inner.state.borrow().last_fetched_at {
            Some(last) => !within_ttl(now, last, self.inner.ttl),
            None => true,
        }
    }

    /// Refresh from the provider unless a fetch is already running or the
    /// last success is still within the TTL.
    ///
    /// Provider failures are recorded in the shared state, never returned.
    /// The fetch runs on its own task, so dropping this future does not
    /// cancel it.
    pub async fn ensure_fresh(&self) -> RefreshOutcome {
        let now = self.inner.clock.now();
        let ttl = self.inner.ttl;
        let mut skipped = None;

        self.inner.state.send_if_modified(|state| {
            if state.loading {
                skipped = Some(RefreshOutcome::InFlight);
                return false;
            }
            if let Some(last) = state.last_fetched_at {
                if within_ttl(now, last, ttl) {
                    skipped = Some(RefreshOutcome::Fresh);
                    return false;
                }
            }
            state.loading = true;
            state.error = None;
            true
        });

        if let Some(outcome) = skipped {
            debug!("Skipping match refresh: {:?}", outcome);
            return outcome;
        }

        let inner = Arc::clone(&self.inner);
        match tokio::spawn(inner.refresh()).await {
            Ok(outcome) => outcome,
            // LoadingGuard has already recorded the failure
            Err(_) => RefreshOutcome::Failed {
                kind: ErrorKind::Internal,
            },
        }
    }
}

impl Inner {
    async fn refresh(self: Arc<Self>) -> RefreshOutcome {
        let mut guard = LoadingGuard {
            inner: &self,
            armed: true,
        };
        let result = self.provider.fetch_current_matches().await;
        guard.armed = false;

        match result {
            Ok(raw) => self.commit(raw),
            Err(e) => self.fail(&e),
        }
    }

    fn commit(&self, raw: Vec<MatchRecord>) -> RefreshOutcome {
        let received = raw.len();
        let matches = normalize_matches(raw);
        let count = matches.len();
        let mut live = 0;
        for m in matches.iter().filter(|m| m.status.is_live()) {
            live += 1;
            debug!(
                "Live: {} {}-{} {} ({:?})",
                m.home_team.label(),
                m.score.full_time.home.unwrap_or(0),
                m.score.full_time.away.unwrap_or(0),
                m.away_team.label(),
                m.status
            );
        }
        let mirrored = self.persistence.as_ref().map(|_| matches.clone());
        let now = self.clock.now();

        self.state.send_modify(|state| {
            state.matches = matches;
            state.last_fetched_at = Some(now);
            state.error = None;
            state.loading = false;
        });

        info!(
            "Refreshed {} matches from {} ({} live, {} duplicates dropped)",
            count,
            self.provider.name(),
            live,
            received - count
        );

        if let (Some(bridge), Some(matches)) = (self.persistence.clone(), mirrored) {
            tokio::task::spawn_blocking(move || bridge.persist(&matches));
        }

        RefreshOutcome::Refreshed { count }
    }

    fn fail(&self, err: &FetchError) -> RefreshOutcome {
        let info = ErrorInfo::from_fetch(err, self.clock.now());
        let kind = info.kind;
        warn!(
            "Match refresh from {} failed ({:?}), keeping stale data: {}",
            self.provider.name(),
            kind,
            err
        );
        self.record_failure(info);
        RefreshOutcome::Failed { kind }
    }

    /// Publish a failure; matches and `last_fetched_at` are left alone.
    fn record_failure(&self, info: ErrorInfo) {
        self.state.send_modify(|state| {
            state.error = Some(info);
            state.loading = false;
        });
    }
}

/// Clears `loading` if a refresh task unwinds before reaching commit/fail.
struct LoadingGuard<'a> {
    inner: &'a Inner,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Match refresh from {} aborted", self.inner.provider.name());
        self.inner.record_failure(ErrorInfo {
            kind: ErrorKind::Internal,
            message: "refresh aborted before the provider answered".to_string(),
            occurred_at: self.inner.clock.now(),
        });
    }
}

/// A clock that went backwards counts as fresh rather than hammering the
/// provider.
fn within_ttl(now: DateTime<Utc>, last: DateTime<Utc>, ttl: Duration) -> bool {
    match (now - last).to_std() {
        Ok(elapsed) => elapsed < ttl,
        Err(_) => true,
    }
}

/// Deduplicate by id (last record wins) and sort by kickoff, newest first.
/// Ties are ordered by id so the result is deterministic.
pub fn normalize_matches(raw: Vec<MatchRecord>) -> Vec<MatchRecord> {
    let mut position: HashMap<u64, usize> = HashMap::with_capacity(raw.len());
    let mut unique: Vec<MatchRecord> = Vec::with_capacity(raw.len());

    for m in raw {
        match position.get(&m.id) {
            Some(&idx) => unique[idx] = m,
            None => {
                position.insert(m.id, unique.len());
                unique.push(m);
            }
        }
    }

    unique.sort_by(|a, b| b.utc_date.cmp(&a.utc_date).then(a.id.cmp(&b.id)));
    unique
}
