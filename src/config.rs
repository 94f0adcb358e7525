use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Live football match feed with a shared freshness cache
#[derive(Parser, Debug, Clone)]
#[command(name = "livematch-cache", version, about)]
pub struct Config {
    /// How long a successful fetch is trusted before the provider is asked again (seconds)
    #[arg(long, env = "CACHE_TTL_SECS", default_value = "300")]
    pub cache_ttl_secs: u64,

    /// How often each consumer re-validates the cache (seconds)
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value = "300")]
    pub refresh_interval_secs: u64,

    /// Match provider base URL (football-data.org v4 compatible)
    #[arg(
        long,
        env = "MATCHES_API_URL",
        default_value = "https://api.football-data.org/v4"
    )]
    pub matches_api_url: String,

    /// Provider API token, sent as X-Auth-Token
    #[arg(long, env = "FOOTBALL_DATA_API_KEY")]
    pub matches_api_key: Option<String>,

    /// Comma-separated competition codes to restrict the listing to (e.g. "PL,CL")
    #[arg(long, env = "COMPETITIONS")]
    pub competitions: Option<String>,

    /// Timeout for a single provider request (seconds)
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,

    /// SQLite database path used for warm starts
    #[arg(long, env = "DATABASE_PATH", default_value = "matches.db")]
    pub database_path: String,

    /// HTTP API listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache_ttl_secs == 0 {
            anyhow::bail!("cache_ttl_secs must be positive");
        }
        if self.refresh_interval_secs == 0 {
            anyhow::bail!("refresh_interval_secs must be positive");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }
        if let Err(e) = url::Url::parse(&self.matches_api_url) {
            anyhow::bail!("matches_api_url '{}' is not a valid URL: {}", self.matches_api_url, e);
        }
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("listen_addr '{}' is not a socket address", self.listen_addr);
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["livematch-cache"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_durations_from_secs() {
        let config = parse(&[
            "--cache-ttl-secs",
            "300",
            "--refresh-interval-secs",
            "300",
            "--listen-addr",
            "0.0.0.0:8080",
        ]);
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.refresh_interval(), Duration::from_secs(300));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = parse(&["--cache-ttl-secs", "0"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = parse(&["--refresh-interval-secs", "0"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_url_rejected() {
        let config = parse(&["--matches-api-url", "football data"]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("matches_api_url"));
    }

    #[test]
    fn test_bad_listen_addr_rejected() {
        let config = parse(&["--listen-addr", "localhost"]);
        assert!(config.validate().is_err());
    }
}
