//! Durable mirror of the match list, used only for warm starts.
//!
//! The bridge never decides freshness: hydrated data seeds the cache but
//! leaves `lastFetchedAt` unset, and every failure is logged and dropped.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::models::MatchRecord;
use crate::db::KeyValueStore;

/// Slot holding the serialized match list (a bare JSON array).
pub const LIVE_MATCHES_KEY: &str = "live_matches";

#[derive(Clone)]
pub struct PersistenceBridge {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl PersistenceBridge {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        PersistenceBridge {
            store,
            key: LIVE_MATCHES_KEY.to_string(),
        }
    }

    /// Read the last persisted collection. Missing, unreadable or
    /// unparseable data all come back as an empty list.
    pub fn hydrate(&self) -> Vec<MatchRecord> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted matches under '{}'", self.key);
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read persisted matches: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<MatchRecord>>(&raw) {
            Ok(matches) => {
                info!("Hydrated {} matches from '{}'", matches.len(), self.key);
                matches
            }
            Err(e) => {
                warn!("Ignoring malformed persisted matches: {}", e);
                Vec::new()
            }
        }
    }

    /// Overwrite the slot with `matches`. Errors are logged, never returned.
    pub fn persist(&self, matches: &[MatchRecord]) {
        let json = match serde_json::to_string(matches) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize matches for persistence: {}", e);
                return;
            }
        };

        match self.store.set(&self.key, &json) {
            Ok(()) => debug!("Persisted {} matches to '{}'", matches.len(), self.key),
            Err(e) => warn!("Failed to persist matches: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::record;
    use crate::db::models::MatchStatus;
    use crate::db::Database;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("disk on fire")
        }

        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn bridge_with(db: &Database) -> PersistenceBridge {
        PersistenceBridge::new(Arc::new(db.clone()))
    }

    #[test]
    fn test_persist_then_hydrate() {
        let db = Database::open(":memory:").unwrap();
        let bridge = bridge_with(&db);
        let matches = vec![
            record(2, MatchStatus::InPlay, 0),
            record(1, MatchStatus::Finished, -120),
        ];

        bridge.persist(&matches);
        assert_eq!(bridge.hydrate(), matches);
    }

    #[test]
    fn test_slot_is_bare_json_array() {
        let db = Database::open(":memory:").unwrap();
        bridge_with(&db).persist(&[record(9, MatchStatus::Timed, 60)]);

        let raw = db.get(LIVE_MATCHES_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let arr = value.as_array().expect("slot should hold an array");
        assert_eq!(arr[0]["id"], 9);
        assert_eq!(arr[0]["status"], "TIMED");
        assert!(arr[0].get("utcDate").is_some());
    }

    #[test]
    fn test_hydrate_empty_slot() {
        let db = Database::open(":memory:").unwrap();
        assert!(bridge_with(&db).hydrate().is_empty());
    }

    #[test]
    fn test_hydrate_malformed_is_empty() {
        let db = Database::open(":memory:").unwrap();
        let bridge = bridge_with(&db);

        db.set(LIVE_MATCHES_KEY, "{not json").unwrap();
        assert!(bridge.hydrate().is_empty());

        // An envelope from some other format is not an array of records
        db.set(LIVE_MATCHES_KEY, r#"{"version":2,"matches":[]}"#).unwrap();
        assert!(bridge.hydrate().is_empty());

        // Records written under an older schema
        db.set(LIVE_MATCHES_KEY, r#"[{"matchId":"1","state":"live"}]"#).unwrap();
        assert!(bridge.hydrate().is_empty());
    }

    #[test]
    fn test_store_failures_are_swallowed() {
        let bridge = PersistenceBridge::new(Arc::new(BrokenStore));
        bridge.persist(&[record(1, MatchStatus::InPlay, 0)]);
        assert!(bridge.hydrate().is_empty());
    }
}
