use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::{CacheState, MatchCache, RefreshOutcome};

/// One consumer's view of the shared cache.
///
/// Each subscription runs its own re-validation timer, but every tick goes
/// through `MatchCache::ensure_fresh`, so many subscriptions still cause at
/// most one provider call per TTL window.
pub struct Subscription {
    cache: MatchCache,
    updates: watch::Receiver<CacheState>,
    timer: JoinHandle<()>,
}

impl Subscription {
    /// Start consuming `cache`. The current snapshot is readable right away;
    /// the timer's first tick calls `ensure_fresh` immediately and then every
    /// `refresh_interval` (which must be non-zero).
    pub fn activate(cache: &MatchCache, refresh_interval: Duration) -> Self {
        let updates = cache.subscribe();
        let timer_cache = cache.clone();

        let timer = tokio::spawn(async move {
            let mut interval = tokio::time::interval(refresh_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let outcome = timer_cache.ensure_fresh().await;
                debug!("Scheduled match revalidation: {:?}", outcome);
            }
        });

        Subscription {
            cache: cache.clone(),
            updates,
            timer,
        }
    }

    pub fn snapshot(&self) -> CacheState {
        self.updates.borrow().clone()
    }

    /// Wait for the next published state. Returns `None` only if the cache
    /// has been torn down, which cannot happen while this subscription holds
    /// a handle to it.
    pub async fn changed(&mut self) -> Option<CacheState> {
        self.updates.changed().await.ok()?;
        Some(self.updates.borrow_and_update().clone())
    }

    /// Ask for fresh data now. Same TTL and coalescing rules as the timer;
    /// this never forces a provider call.
    pub async fn refetch(&self) -> RefreshOutcome {
        self.cache.ensure_fresh().await
    }

    /// Stop this subscription's timer. Shared state and any in-flight fetch
    /// are unaffected.
    #[allow(dead_code)]
    pub fn deactivate(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.timer.abort();
    }
}
