//! Fakes shared by the cache, subscription and API tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::Clock;
use crate::db::models::{Competition, MatchRecord, MatchStatus, Score, ScoreLine, Team};
use crate::matches::{FetchError, MatchProvider};

pub fn kickoff_base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 2, 15, 0, 0).unwrap()
}

/// A match kicking off `offset_mins` after the fixed base time.
pub fn record(id: u64, status: MatchStatus, offset_mins: i64) -> MatchRecord {
    MatchRecord {
        id,
        competition: Competition {
            id: 2021,
            name: "Premier League".into(),
            code: Some("PL".into()),
        },
        home_team: Team {
            id: Some(57),
            name: Some("Arsenal FC".into()),
            short_name: Some("Arsenal".into()),
            ..Team::default()
        },
        away_team: Team {
            id: Some(61),
            name: Some("Chelsea FC".into()),
            short_name: Some("Chelsea".into()),
            ..Team::default()
        },
        score: Score {
            full_time: ScoreLine {
                home: Some(0),
                away: Some(0),
            },
            half_time: ScoreLine::default(),
        },
        status,
        utc_date: kickoff_base() + ChronoDuration::minutes(offset_mins),
        venue: None,
        last_updated: None,
    }
}

/// Provider that replays queued responses and counts calls. Once the
/// script runs out it answers with an empty list.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Vec<MatchRecord>, FetchError>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Vec<MatchRecord>, FetchError>>) -> Self {
        ScriptedProvider {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, response: Result<Vec<MatchRecord>, FetchError>) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_current_matches(&self) -> Result<Vec<MatchRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Wall clock that only moves when told to.
pub struct ManualClock {
    start: DateTime<Utc>,
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            start,
            now: Mutex::new(start),
        }
    }

    /// Jump to `secs` seconds after the start time.
    pub fn set(&self, secs: i64) {
        *self.now.lock().unwrap() = self.start + ChronoDuration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Wall clock driven by tokio's (pausable) timer, for tests that also rely
/// on `tokio::time::interval`.
pub struct TokioClock {
    base: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        TokioClock {
            base: kickoff_base(),
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now() - self.started;
        self.base + ChronoDuration::from_std(elapsed).unwrap()
    }
}
