use url::Url;

use crate::config::{ConfigError, GameConfig};
use crate::http_client::{self, RetryConfig};

/// Resolved endpoint URLs.
#[derive(Debug, Clone)]
pub(crate) struct Endpoints {
    pub(crate) classify: Url,
    pub(crate) match_join: Url,
    pub(crate) match_status: Url,
    pub(crate) match_result: Url,
    pub(crate) score_submit: Url,
    pub(crate) leaderboard: Url,
}

/// Blocking HTTP client for every backend collaborator.
#[derive(Clone)]
pub struct HttpBackend {
    pub(crate) agent: ureq::Agent,
    pub(crate) endpoints: Endpoints,
    pub(crate) leaderboard_retry: RetryConfig,
}

impl HttpBackend {
    /// Resolve endpoints against the configured origin and build the agent.
    pub fn new(config: &GameConfig) -> Result<Self, ConfigError> {
        let backend = &config.backend;
        let endpoints = Endpoints {
            classify: backend.endpoint(&backend.classify_path)?,
            match_join: backend.endpoint(&backend.match_join_path)?,
            match_status: backend.endpoint(&backend.match_status_path)?,
            match_result: backend.endpoint(&backend.match_result_path)?,
            score_submit: backend.endpoint(&backend.score_submit_path)?,
            leaderboard: backend.endpoint(&backend.leaderboard_path)?,
        };
        tracing::debug!("Backend origin {}", backend.origin);
        Ok(Self {
            agent: http_client::build_agent(&config.network),
            endpoints,
            leaderboard_retry: RetryConfig::from_settings(&config.network),
        })
    }

    /// Backend aimed at a loopback test server, without leaderboard retries.
    #[cfg(test)]
    pub(crate) fn for_origin(origin: &str) -> Self {
        let mut config = GameConfig::default();
        config.backend.origin = origin.to_string();
        config.network.leaderboard_attempts = 1;
        Self::new(&config).unwrap()
    }
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}
