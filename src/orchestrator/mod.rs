//! Match orchestration: one state machine for free play, daily and compete.
//!
//! The orchestrator is owned by a single caller. Network work runs on
//! background threads; the caller applies finished work by calling
//! [`MatchOrchestrator::poll_background_jobs`].

mod background;
mod jobs;
mod mode;
mod session;


use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::backend::{
    ClassificationError, LeaderboardEntry, LeaderboardError, MatchmakingError, ScoreError,
    Services,
};
use crate::config::{MIN_POLL_INTERVAL_MS, MatchSettings};
use crate::intake::{ImageIntake, IntakeError, SelectedFile, StagedImage};
use crate::scoring::{AggregatedResult, BattleResult, ShapeVerdict};
use crate::session::SessionIdentity;
use crate::shapes::{self, CatalogError, Shape, ShapeCatalog};

use jobs::OrchestratorJobs;

pub use mode::{PlayMode, TargetSource};
pub use session::MatchSession;

/// Where the round currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Idle,
    ImageStaged,
    ShapeChosen,
    Classifying,
    Scored,
    Done,
    MatchPending(PendingStage),
    MatchResolved,
}

/// What a compete round is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStage {
    /// Join request in flight.
    Joining,
    /// Queued, no opponent yet.
    AwaitingOpponent,
    /// Own score known, opponent's not yet.
    AwaitingOpponentScore,
}

/// Result of choosing a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeChoice {
    Chosen,
    /// Nobody is logged in; send the player to the login flow.
    RedirectToLogin,
}

/// Something that happened while applying background work.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    Classified {
        target_confidence: f64,
        verdict: Option<ShapeVerdict>,
    },
    ClassificationFailed(ClassificationError),
    Paired {
        match_id: String,
        opponent_id: String,
    },
    WaitingForOpponent,
    MatchmakingFailed(MatchmakingError),
    ScoreSubmitted,
    ScoreSubmissionFailed(ScoreError),
    LeaderboardUpdated {
        entries: usize,
    },
    LeaderboardFailed(LeaderboardError),
    OpponentScored {
        confidence: f64,
    },
    OpponentPollFailed(MatchmakingError),
    MatchResolved(BattleResult),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
    #[error(transparent)]
    Matchmaking(#[from] MatchmakingError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Cannot {operation} while {phase:?}")]
    InvalidPhase {
        operation: &'static str,
        phase: MatchPhase,
    },
    #[error("'{shape}' cannot be chosen in this mode (expected {expected})")]
    ShapeNotSelectable { shape: String, expected: String },
}

/// Drives one player's rounds from image to score or match outcome.
pub struct MatchOrchestrator {
    mode: PlayMode,
    catalog: ShapeCatalog,
    services: Services,
    session: Arc<dyn SessionIdentity>,
    settings: MatchSettings,
    clock: fn() -> OffsetDateTime,
    intake: ImageIntake,
    jobs: OrchestratorJobs,
    phase: MatchPhase,
    chosen_shape: Option<Shape>,
    player_id: Option<String>,
    aggregated: Option<AggregatedResult>,
    target_confidence: Option<f64>,
    verdict: Option<ShapeVerdict>,
    match_session: Option<MatchSession>,
    leaderboard: Option<Vec<LeaderboardEntry>>,
    last_error: Option<OrchestratorError>,
}

impl MatchOrchestrator {
    pub fn new(
        mode: PlayMode,
        catalog: ShapeCatalog,
        services: Services,
        session: Arc<dyn SessionIdentity>,
        settings: MatchSettings,
    ) -> Self {
        Self {
            mode,
            catalog,
            services,
            session,
            settings,
            clock: OffsetDateTime::now_utc,
            intake: ImageIntake::new(),
            jobs: OrchestratorJobs::new(),
            phase: MatchPhase::Idle,
            chosen_shape: None,
            player_id: None,
            aggregated: None,
            target_confidence: None,
            verdict: None,
            match_session: None,
            leaderboard: None,
            last_error: None,
        }
    }

    /// Replace the clock used to pick the daily shape.
    pub fn with_clock(mut self, clock: fn() -> OffsetDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Stage a new image, discarding everything derived from the previous one.
    pub fn stage_image(&mut self, file: SelectedFile) -> Result<&StagedImage, OrchestratorError> {
        // Validate before touching round state.
        self.intake.stage(file)?;
        self.discard_round();
        self.set_phase(MatchPhase::ImageStaged);
        self.intake
            .staged()
            .ok_or(OrchestratorError::InvalidPhase {
                operation: "stage an image",
                phase: self.phase,
            })
    }

    /// Pick the round's target shape.
    ///
    /// Without a logged-in player this is a no-op that asks for a login.
    pub fn choose_shape(&mut self, shape: &Shape) -> Result<ShapeChoice, OrchestratorError> {
        self.require_phase(
            "choose a shape",
            &[MatchPhase::ImageStaged, MatchPhase::ShapeChosen],
        )?;
        let Some(player_id) = self.session.current_user() else {
            tracing::info!("No active session; redirecting to login");
            return Ok(ShapeChoice::RedirectToLogin);
        };
        let shape = self.selectable_shape(shape)?;
        tracing::info!("{} target shape: {}", self.mode, shape);
        self.chosen_shape = Some(shape);
        self.player_id = Some(player_id);
        self.set_phase(MatchPhase::ShapeChosen);
        Ok(ShapeChoice::Chosen)
    }

    /// Choose today's shape.
    pub fn confirm_daily_shape(&mut self) -> Result<ShapeChoice, OrchestratorError> {
        let today = self.target_shape_for_today()?.clone();
        self.choose_shape(&today)
    }

    /// Start the round: classification, or matchmaking first in compete mode.
    pub fn execute(&mut self) -> Result<(), OrchestratorError> {
        self.require_phase("start the round", &[MatchPhase::ShapeChosen])?;
        self.last_error = None;
        if self.mode.is_competitive() && self.match_session.is_none() {
            let player_id = self.player_id.clone().unwrap_or_default();
            tracing::info!("Joining matchmaking as {player_id}");
            self.jobs
                .begin_join(self.services.matchmaker.clone(), player_id);
            self.set_phase(MatchPhase::MatchPending(PendingStage::Joining));
            return Ok(());
        }
        self.start_classification()
    }

    /// Deliver the opponent's confidence for the current match directly.
    ///
    /// Returns the battle result when this completes the match. Other match
    /// ids are ignored.
    pub fn record_opponent_confidence(
        &mut self,
        match_id: &str,
        confidence: f64,
    ) -> Option<BattleResult> {
        let session = self.match_session.as_mut()?;
        if session.match_id != match_id || session.is_resolved() {
            tracing::debug!("Ignoring opponent score for match {match_id}");
            return None;
        }
        session.opponent_confidence = Some(confidence.clamp(0.0, 1.0));
        self.jobs.clear_opponent_poll();
        self.try_resolve_match()
    }

    /// Reload the leaderboard in the background.
    pub fn refresh_leaderboard(&mut self) {
        self.jobs.begin_leaderboard(self.services.scoreboard.clone());
    }

    /// Drop the round entirely and return to `Idle`.
    pub fn reset(&mut self) {
        self.intake.clear();
        self.discard_round();
        self.set_phase(MatchPhase::Idle);
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn catalog(&self) -> &ShapeCatalog {
        &self.catalog
    }

    pub fn chosen_shape(&self) -> Option<&Shape> {
        self.chosen_shape.as_ref()
    }

    pub fn staged_image(&self) -> Option<&StagedImage> {
        self.intake.staged()
    }

    pub fn aggregated(&self) -> Option<&AggregatedResult> {
        self.aggregated.as_ref()
    }

    pub fn target_confidence(&self) -> Option<f64> {
        self.target_confidence
    }

    pub fn verdict(&self) -> Option<ShapeVerdict> {
        self.verdict
    }

    pub fn match_session(&self) -> Option<&MatchSession> {
        self.match_session.as_ref()
    }

    pub fn leaderboard(&self) -> Option<&[LeaderboardEntry]> {
        self.leaderboard.as_deref()
    }

    pub fn last_error(&self) -> Option<&OrchestratorError> {
        self.last_error.as_ref()
    }

    /// Live staged-image handles; never more than one.
    pub fn live_image_handles(&self) -> usize {
        self.intake.live_handle_count()
    }

    pub fn target_shape_for_today(&self) -> Result<&Shape, CatalogError> {
        shapes::shape_for_date(&self.catalog, (self.clock)())
    }

    fn selectable_shape(&self, shape: &Shape) -> Result<Shape, OrchestratorError> {
        let Some(known) = self.catalog.by_classifier_label(&shape.classifier_label) else {
            return Err(OrchestratorError::ShapeNotSelectable {
                shape: shape.display_name.clone(),
                expected: "a catalog shape".to_string(),
            });
        };
        if self.mode.target_source() == TargetSource::DailyRotation {
            let today = self.target_shape_for_today()?;
            if today != known {
                return Err(OrchestratorError::ShapeNotSelectable {
                    shape: known.display_name.clone(),
                    expected: today.display_name.clone(),
                });
            }
        }
        Ok(known.clone())
    }

    fn start_classification(&mut self) -> Result<(), OrchestratorError> {
        let Some(staged) = self.intake.staged() else {
            return Err(OrchestratorError::InvalidPhase {
                operation: "classify without an image",
                phase: self.phase,
            });
        };
        self.jobs
            .begin_classify(self.services.classifier.clone(), staged.payload());
        self.set_phase(MatchPhase::Classifying);
        Ok(())
    }

    fn discard_round(&mut self) {
        self.jobs.advance_attempt();
        self.chosen_shape = None;
        self.player_id = None;
        self.aggregated = None;
        self.target_confidence = None;
        self.verdict = None;
        self.match_session = None;
        self.last_error = None;
    }

    fn require_phase(
        &self,
        operation: &'static str,
        allowed: &[MatchPhase],
    ) -> Result<(), OrchestratorError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    fn set_phase(&mut self, phase: MatchPhase) {
        if self.phase != phase {
            tracing::debug!("Phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.settings.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}
