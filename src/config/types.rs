use serde::{Deserialize, Serialize};
use url::Url;

use super::ConfigError;
use crate::scoring::DEFAULT_TOP_N;

/// Top-level settings persisted in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Backend origin and endpoint paths.
    #[serde(default)]
    pub backend: BackendSettings,
    /// HTTP agent timeouts and retry bounds.
    #[serde(default)]
    pub network: NetworkSettings,
    /// Orchestrator behavior.
    #[serde(default, rename = "match")]
    pub matching: MatchSettings,
}

impl GameConfig {
    /// Check values that serde cannot validate on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.origin_url()?;
        if self.matching.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::PollIntervalTooShort {
                value_ms: self.matching.poll_interval_ms,
                min_ms: MIN_POLL_INTERVAL_MS,
            });
        }
        Ok(())
    }
}

/// Where the game backend lives.
///
/// Config keys: `origin`, `classify_path`, `match_join_path`,
/// `match_status_path`, `match_result_path`, `score_submit_path`,
/// `leaderboard_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub origin: String,
    pub classify_path: String,
    pub match_join_path: String,
    pub match_status_path: String,
    pub match_result_path: String,
    pub score_submit_path: String,
    pub leaderboard_path: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:8000".to_string(),
            classify_path: "/visualize/visualize".to_string(),
            match_join_path: "/match/join".to_string(),
            match_status_path: "/match/status".to_string(),
            match_result_path: "/match/result".to_string(),
            score_submit_path: "/compete/submit".to_string(),
            leaderboard_path: "/ranking/top10".to_string(),
        }
    }
}

impl BackendSettings {
    /// Parse the configured origin, rejecting anything but absolute http(s) URLs.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidOrigin {
            origin: self.origin.clone(),
            reason,
        };
        let url = Url::parse(self.origin.trim()).map_err(|err| invalid(err.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        }
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(invalid("origin must include a host".to_string()));
        }
        Ok(url)
    }

    /// Resolve an endpoint path against the origin.
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        let origin = self.origin_url()?;
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        origin.join(&path).map_err(|err| ConfigError::InvalidOrigin {
            origin: self.origin.clone(),
            reason: format!("cannot join '{path}': {err}"),
        })
    }
}

/// HTTP agent settings.
///
/// Config keys: `connect_timeout_secs`, `read_timeout_secs` (0 = unbounded),
/// `write_timeout_secs`, `leaderboard_attempts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub leaderboard_attempts: usize,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 0,
            write_timeout_secs: 30,
            leaderboard_attempts: 3,
        }
    }
}

/// Shortest delay allowed between poll requests.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Orchestrator settings.
///
/// Config keys: `top_n`, `poll_for_pairing`, `poll_for_opponent`,
/// `poll_interval_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// How many ranked predictions to keep before the residual bucket.
    pub top_n: usize,
    /// Whether to re-send the join request while queued.
    ///
    /// Off by default: a queue that pops the waiting player when an opponent
    /// joins will re-queue them on the next join, so a re-join can miss the
    /// pairing it was waiting for.
    pub poll_for_pairing: bool,
    /// Whether to poll the match status for the opponent's score.
    pub poll_for_opponent: bool,
    /// Delay between poll requests; at least [`MIN_POLL_INTERVAL_MS`].
    pub poll_interval_ms: u64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            poll_for_pairing: false,
            poll_for_opponent: true,
            poll_interval_ms: 2_000,
        }
    }
}
