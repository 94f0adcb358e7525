use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::provider::{FetchError, MatchProvider};
use crate::db::models::MatchRecord;

/// Longest slice of an error body kept for logs.
const MAX_ERROR_BODY: usize = 200;

/// Match provider backed by the football-data.org v4 `/matches` listing.
/// Docs: <https://docs.football-data.org/general/v4/match.html>
pub struct FootballData {
    http: Client,
    matches_url: Url,
    api_key: Option<String>,
}

impl FootballData {
    /// `competitions` is a comma-separated list of competition codes
    /// (e.g. `PL,CL`) passed through as the provider's filter.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        competitions: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let mut matches_url = Url::parse(&format!("{}/matches", base_url.trim_end_matches('/')))
            .with_context(|| format!("Invalid matches API URL: {}", base_url))?;
        if let Some(codes) = competitions.filter(|c| !c.trim().is_empty()) {
            matches_url
                .query_pairs_mut()
                .append_pair("competitions", codes.trim());
        }

        Ok(FootballData {
            http,
            matches_url,
            api_key,
        })
    }
}

#[async_trait]
impl MatchProvider for FootballData {
    fn name(&self) -> &str {
        "football-data.org"
    }

    async fn fetch_current_matches(&self) -> Result<Vec<MatchRecord>, FetchError> {
        debug!("Fetching matches from {}", self.matches_url);

        let mut req = self.http.get(self.matches_url.clone());
        if let Some(key) = &self.api_key {
            req = req.header("X-Auth-Token", key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let raw: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| FetchError::Validation(format!("response is not JSON: {}", e)))?;

        parse_matches_response(&raw)
    }
}

/// Pull the match list out of a `/matches` payload.
///
/// The top-level `matches` field must be an array; anything else fails the
/// whole payload. Single records that do not deserialize are dropped.
fn parse_matches_response(raw: &serde_json::Value) -> Result<Vec<MatchRecord>, FetchError> {
    let entries = raw
        .get("matches")
        .and_then(|m| m.as_array())
        .ok_or_else(|| FetchError::Validation("top-level `matches` is not an array".into()))?;

    let matches: Vec<MatchRecord> = entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<MatchRecord>(entry.clone()) {
            Ok(m) => Some(m),
            Err(e) => {
                debug!("Skipping unparseable match {}: {}", entry["id"], e);
                None
            }
        })
        .collect();

    if matches.len() < entries.len() {
        debug!(
            "Kept {} of {} matches from provider payload",
            matches.len(),
            entries.len()
        );
    }

    Ok(matches)
}
