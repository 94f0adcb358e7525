use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One match as reported by the provider at fetch time.
///
/// The same camelCase shape is used on the wire and in the persisted slot,
/// so a record read back from SQLite looks exactly like one fetched live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    /// Provider match ID
    pub id: u64,
    pub competition: Competition,
    pub home_team: Team,
    pub away_team: Team,
    #[serde(default)]
    pub score: Score,
    pub status: MatchStatus,
    /// Kickoff time
    pub utc_date: DateTime<Utc>,
    #[serde(default)]
    pub venue: Option<String>,
    /// Provider-side modification time of this record
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Team reference. Every field may be null for knockout fixtures whose
/// participants are not decided yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub tla: Option<String>,
    #[serde(default)]
    pub crest: Option<String>,
}

impl Team {
    /// Best label for logs: short name, then full name, then "TBD".
    pub fn label(&self) -> &str {
        self.short_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("TBD")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    #[serde(default)]
    pub full_time: ScoreLine,
    #[serde(default)]
    pub half_time: ScoreLine,
}

/// Home/away goals for one phase; null until that phase is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLine {
    #[serde(default)]
    pub home: Option<i32>,
    #[serde(default)]
    pub away: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Scheduled,
    Timed,
    InPlay,
    Paused,
    Finished,
}

impl MatchStatus {
    /// Whether the match is currently being played (including half time).
    pub fn is_live(self) -> bool {
        matches!(self, MatchStatus::InPlay | MatchStatus::Paused)
    }
}
