//! Backend collaborators: classification, matchmaking and the scoreboard.
//!
//! The orchestrator talks to these through trait objects so tests can swap in
//! fakes. [`HttpBackend`] implements all three against one HTTP origin.

mod classify;
mod http;
mod matchmaking;
mod multipart;
mod scores;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::http_client::BodyReadError;
use crate::intake::ImagePayload;
use crate::scoring::Prediction;

pub use classify::parse_predictions;
pub use http::HttpBackend;
pub use matchmaking::{parse_join_response, parse_match_status};
pub use scores::parse_leaderboard;

/// Sends an image to the classifier.
pub trait Classifier: Send + Sync {
    /// One request, no retry.
    fn classify(&self, image: &ImagePayload) -> Result<Vec<Prediction>, ClassificationError>;
}

/// Pairs players and exchanges match state.
pub trait Matchmaker: Send + Sync {
    /// Enter the matchmaking queue, or learn that a pairing happened.
    fn join(&self, user_id: &str) -> Result<JoinOutcome, MatchmakingError>;
    /// Opponent's confidence for a match, once the backend knows it.
    fn opponent_confidence(
        &self,
        match_id: &str,
        opponent_id: &str,
    ) -> Result<Option<f64>, MatchmakingError>;
    /// Record the winner of a decided match.
    fn report_result(&self, report: &MatchReport) -> Result<(), MatchmakingError>;
}

/// Stores scores and serves the leaderboard.
pub trait Scoreboard: Send + Sync {
    fn submit_score(&self, submission: &ScoreSubmission) -> Result<(), ScoreError>;
    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError>;
}

/// Shared handles to every backend collaborator.
#[derive(Clone)]
pub struct Services {
    pub classifier: Arc<dyn Classifier>,
    pub matchmaker: Arc<dyn Matchmaker>,
    pub scoreboard: Arc<dyn Scoreboard>,
}

impl Services {
    /// Route every collaborator through one HTTP backend.
    pub fn http(backend: HttpBackend) -> Self {
        let backend = Arc::new(backend);
        Self {
            classifier: backend.clone(),
            matchmaker: backend.clone(),
            scoreboard: backend,
        }
    }
}

/// Result of a matchmaking join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Matched { match_id: String, opponent_id: String },
    Waiting,
}

/// Body of the match result report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub match_id: String,
    pub winner_id: String,
    pub loser_id: String,
}

/// Body of a score submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSubmission {
    pub user_id: String,
    /// Classifier label of the target shape.
    pub shape: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub score: f64,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassificationError {
    #[error("Classifier unavailable: {cause}")]
    Unavailable { cause: String },
    #[error("Classifier returned a malformed response: {detail}")]
    MalformedResponse { detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Matchmaking unavailable: {cause}")]
    Unavailable { cause: String },
    #[error("Matchmaking returned a malformed response: {detail}")]
    MalformedResponse { detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("Score submission failed: {cause}")]
    SubmissionFailed { cause: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaderboardError {
    #[error("Leaderboard unavailable: {cause}")]
    Unavailable { cause: String },
    #[error("Leaderboard returned a malformed response: {detail}")]
    MalformedResponse { detail: String },
}

impl From<BodyReadError> for ClassificationError {
    fn from(err: BodyReadError) -> Self {
        match err {
            BodyReadError::Transport(_) => Self::Unavailable {
                cause: err.to_string(),
            },
            BodyReadError::Invalid(detail) => Self::MalformedResponse { detail },
        }
    }
}

impl From<BodyReadError> for MatchmakingError {
    fn from(err: BodyReadError) -> Self {
        match err {
            BodyReadError::Transport(_) => Self::Unavailable {
                cause: err.to_string(),
            },
            BodyReadError::Invalid(detail) => Self::MalformedResponse { detail },
        }
    }
}

impl From<BodyReadError> for LeaderboardError {
    fn from(err: BodyReadError) -> Self {
        match err {
            BodyReadError::Transport(_) => Self::Unavailable {
                cause: err.to_string(),
            },
            BodyReadError::Invalid(detail) => Self::MalformedResponse { detail },
        }
    }
}

/// Check a confidence value read off the wire.
pub(crate) fn valid_confidence(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
