use std::sync::mpsc::TryRecvError;

use super::jobs::{
    ClassifyResult, JobMessage, JoinResult, LeaderboardResult, OpponentScoreResult,
    ResultReportResult, ScoreSubmitResult,
};
use super::{MatchEvent, MatchOrchestrator, MatchPhase, MatchSession, PendingStage};
use crate::backend::{JoinOutcome, MatchReport, ScoreSubmission};
use crate::scoring::{self, BattleOutcome, BattleResult, ConfidenceAggregator, ShapeVerdict};

impl MatchOrchestrator {
    /// Apply every finished background job and report what changed.
    ///
    /// Results from a superseded attempt are dropped without touching state.
    pub fn poll_background_jobs(&mut self) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        loop {
            let message = match self.jobs.try_recv_message() {
                Ok(message) => message,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            match message {
                JobMessage::Classified(message) => self.apply_classification(message, &mut events),
                JobMessage::Joined(message) => self.apply_join(message, &mut events),
                JobMessage::ScoreSubmitted(message) => {
                    self.apply_score_submission(message, &mut events)
                }
                JobMessage::LeaderboardLoaded(message) => self.apply_leaderboard(message, &mut events),
                JobMessage::OpponentScored(message) => self.apply_opponent_score(message, &mut events),
                JobMessage::ResultReported(message) => log_result_report(message),
            }
        }
        events
    }

    fn apply_classification(&mut self, message: ClassifyResult, events: &mut Vec<MatchEvent>) {
        if !self.jobs.is_current(message.attempt) || self.phase != MatchPhase::Classifying {
            tracing::debug!("Discarding stale classification (attempt {})", message.attempt);
            return;
        }
        let predictions = match message.result {
            Ok(predictions) => predictions,
            Err(err) => {
                tracing::warn!("Classification failed: {err}");
                self.last_error = Some(err.clone().into());
                self.set_phase(MatchPhase::ShapeChosen);
                events.push(MatchEvent::ClassificationFailed(err));
                return;
            }
        };
        let Some(shape) = self.chosen_shape.clone() else {
            self.set_phase(MatchPhase::ImageStaged);
            return;
        };
        let aggregated =
            ConfidenceAggregator::new(&self.catalog).aggregate(&predictions, self.settings.top_n);
        let target_confidence = scoring::confidence_for(&predictions, &shape);
        tracing::info!("{shape} confidence {target_confidence:.3}");
        let verdict = (!self.mode.is_competitive())
            .then(|| ShapeVerdict::evaluate(&shape, &aggregated, target_confidence));
        self.aggregated = Some(aggregated);
        self.target_confidence = Some(target_confidence);
        self.verdict = verdict;
        self.set_phase(MatchPhase::Scored);
        events.push(MatchEvent::Classified {
            target_confidence,
            verdict,
        });

        let match_id = self.match_session.as_ref().map(|s| s.match_id.clone());
        if let Some(user_id) = self.player_id.clone() {
            self.jobs.begin_score_submit(
                self.services.scoreboard.clone(),
                ScoreSubmission {
                    user_id,
                    shape: shape.classifier_label.clone(),
                    confidence: target_confidence,
                    match_id,
                },
            );
        } else if !self.mode.is_competitive() {
            self.set_phase(MatchPhase::Done);
        }

        if self.mode.is_competitive() {
            if let Some(session) = self.match_session.as_mut() {
                session.my_confidence = Some(target_confidence);
            }
            if let Some(result) = self.try_resolve_match() {
                events.push(MatchEvent::MatchResolved(result));
            } else {
                self.await_opponent_score();
            }
        }
    }

    fn apply_join(&mut self, message: JoinResult, events: &mut Vec<MatchEvent>) {
        let joining = matches!(
            self.phase,
            MatchPhase::MatchPending(PendingStage::Joining | PendingStage::AwaitingOpponent)
        );
        if !self.jobs.is_current(message.attempt) || !joining {
            tracing::debug!("Discarding stale join response (attempt {})", message.attempt);
            return;
        }
        match message.result {
            Ok(JoinOutcome::Matched {
                match_id,
                opponent_id,
            }) => {
                self.jobs.clear_pairing_poll();
                tracing::info!("Paired with {opponent_id} in match {match_id}");
                self.match_session = Some(MatchSession::new(match_id.clone(), opponent_id.clone()));
                events.push(MatchEvent::Paired {
                    match_id,
                    opponent_id,
                });
                if let Err(err) = self.start_classification() {
                    tracing::warn!("Cannot classify after pairing: {err}");
                    self.last_error = Some(err);
                    self.set_phase(MatchPhase::ShapeChosen);
                }
            }
            Ok(JoinOutcome::Waiting) => {
                if self.phase == MatchPhase::MatchPending(PendingStage::AwaitingOpponent) {
                    return;
                }
                tracing::info!("Waiting for an opponent");
                self.set_phase(MatchPhase::MatchPending(PendingStage::AwaitingOpponent));
                events.push(MatchEvent::WaitingForOpponent);
                if self.settings.poll_for_pairing {
                    let user_id = self.player_id.clone().unwrap_or_default();
                    let interval = self.poll_interval();
                    self.jobs
                        .begin_pairing_poll(self.services.matchmaker.clone(), user_id, interval);
                }
            }
            Err(err) => {
                tracing::warn!("Matchmaking failed: {err}");
                self.jobs.clear_pairing_poll();
                self.match_session = None;
                self.last_error = Some(err.clone().into());
                self.set_phase(MatchPhase::ShapeChosen);
                events.push(MatchEvent::MatchmakingFailed(err));
            }
        }
    }

    fn apply_score_submission(&mut self, message: ScoreSubmitResult, events: &mut Vec<MatchEvent>) {
        if !self.jobs.is_current(message.attempt) {
            tracing::debug!("Discarding stale score acknowledgement");
            return;
        }
        match message.result {
            Ok(()) => {
                tracing::info!("Score submitted");
                events.push(MatchEvent::ScoreSubmitted);
            }
            Err(err) => {
                tracing::warn!("{err}");
                events.push(MatchEvent::ScoreSubmissionFailed(err));
            }
        }
        self.refresh_leaderboard();
        if !self.mode.is_competitive() && self.phase == MatchPhase::Scored {
            self.set_phase(MatchPhase::Done);
        }
    }

    fn apply_leaderboard(&mut self, message: LeaderboardResult, events: &mut Vec<MatchEvent>) {
        self.jobs.clear_leaderboard();
        match message.result {
            Ok(entries) => {
                tracing::debug!("Leaderboard loaded ({} entries)", entries.len());
                events.push(MatchEvent::LeaderboardUpdated {
                    entries: entries.len(),
                });
                self.leaderboard = Some(entries);
            }
            Err(err) => {
                tracing::warn!("{err}");
                events.push(MatchEvent::LeaderboardFailed(err));
            }
        }
    }

    fn apply_opponent_score(&mut self, message: OpponentScoreResult, events: &mut Vec<MatchEvent>) {
        let current_match = self
            .match_session
            .as_ref()
            .is_some_and(|session| session.match_id == message.match_id);
        if !self.jobs.is_current(message.attempt) || !current_match {
            tracing::debug!("Discarding stale opponent score for {}", message.match_id);
            return;
        }
        self.jobs.clear_opponent_poll();
        match message.result {
            Ok(confidence) => {
                events.push(MatchEvent::OpponentScored { confidence });
                if let Some(result) = self.record_opponent_confidence(&message.match_id, confidence)
                {
                    events.push(MatchEvent::MatchResolved(result));
                }
            }
            Err(err) => {
                tracing::warn!("Opponent score poll stopped: {err}");
                events.push(MatchEvent::OpponentPollFailed(err));
            }
        }
    }

    /// Start the opponent-score poll, or just wait for a direct delivery.
    fn await_opponent_score(&mut self) {
        self.set_phase(MatchPhase::MatchPending(PendingStage::AwaitingOpponentScore));
        if !self.settings.poll_for_opponent {
            return;
        }
        let Some(session) = self.match_session.as_ref() else {
            return;
        };
        let match_id = session.match_id.clone();
        let opponent_id = session.opponent_id.clone();
        let interval = self.poll_interval();
        self.jobs.begin_opponent_poll(
            self.services.matchmaker.clone(),
            match_id,
            opponent_id,
            interval,
        );
    }

    /// Resolve the match once both confidences are in.
    pub(super) fn try_resolve_match(&mut self) -> Option<BattleResult> {
        let session = self.match_session.as_mut()?;
        if session.is_resolved() {
            return None;
        }
        let (mine, theirs) = session.confidences()?;
        let result = scoring::resolve(mine, theirs);
        session.result = Some(result);
        let report = self.player_id.as_ref().and_then(|player_id| {
            let (winner_id, loser_id) = match result.outcome {
                BattleOutcome::Win => (player_id.clone(), session.opponent_id.clone()),
                BattleOutcome::Lose => (session.opponent_id.clone(), player_id.clone()),
                BattleOutcome::Draw => return None,
            };
            Some(MatchReport {
                match_id: session.match_id.clone(),
                winner_id,
                loser_id,
            })
        });
        tracing::info!(
            "Match resolved: {} ({}), {mine:.3} vs {theirs:.3}",
            result.outcome,
            result.tier
        );
        self.jobs.clear_opponent_poll();
        self.set_phase(MatchPhase::MatchResolved);
        if let Some(report) = report {
            self.jobs
                .begin_result_report(self.services.matchmaker.clone(), report);
        }
        Some(result)
    }
}

fn log_result_report(message: ResultReportResult) {
    match message.result {
        Ok(()) => tracing::info!("Reported result of match {}", message.match_id),
        Err(err) => tracing::warn!("Failed to report match {}: {err}", message.match_id),
    }
}
