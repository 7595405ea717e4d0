use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, Sender, TryRecvError},
    },
    thread,
    time::Duration,
};

use crate::backend::{
    ClassificationError, Classifier, JoinOutcome, LeaderboardEntry, LeaderboardError,
    MatchReport, Matchmaker, MatchmakingError, ScoreError, ScoreSubmission, Scoreboard,
};
use crate::intake::ImagePayload;
use crate::scoring::Prediction;

/// Longest uninterrupted sleep inside a poll loop.
const CANCEL_CHECK_SLICE: Duration = Duration::from_millis(50);

pub(super) enum JobMessage {
    Classified(ClassifyResult),
    Joined(JoinResult),
    ScoreSubmitted(ScoreSubmitResult),
    LeaderboardLoaded(LeaderboardResult),
    OpponentScored(OpponentScoreResult),
    ResultReported(ResultReportResult),
}

#[derive(Debug)]
pub(super) struct ClassifyResult {
    pub(super) attempt: u64,
    pub(super) result: Result<Vec<Prediction>, ClassificationError>,
}

#[derive(Debug)]
pub(super) struct JoinResult {
    pub(super) attempt: u64,
    pub(super) result: Result<JoinOutcome, MatchmakingError>,
}

#[derive(Debug)]
pub(super) struct ScoreSubmitResult {
    pub(super) attempt: u64,
    pub(super) result: Result<(), ScoreError>,
}

#[derive(Debug)]
pub(super) struct LeaderboardResult {
    pub(super) result: Result<Vec<LeaderboardEntry>, LeaderboardError>,
}

#[derive(Debug)]
pub(super) struct OpponentScoreResult {
    pub(super) attempt: u64,
    pub(super) match_id: String,
    pub(super) result: Result<f64, MatchmakingError>,
}

#[derive(Debug)]
pub(super) struct ResultReportResult {
    pub(super) match_id: String,
    pub(super) result: Result<(), MatchmakingError>,
}

/// Background work owned by one orchestrator.
///
/// Every round-bound job carries the attempt id current when it was spawned;
/// advancing the attempt turns everything still in flight into stale work.
pub(super) struct OrchestratorJobs {
    message_tx: Sender<JobMessage>,
    message_rx: Receiver<JobMessage>,
    attempt: u64,
    leaderboard_in_progress: bool,
    pairing_poll_cancel: Option<Arc<AtomicBool>>,
    opponent_poll_cancel: Option<Arc<AtomicBool>>,
}

impl OrchestratorJobs {
    pub(super) fn new() -> Self {
        let (message_tx, message_rx) = std::sync::mpsc::channel::<JobMessage>();
        Self {
            message_tx,
            message_rx,
            attempt: 1,
            leaderboard_in_progress: false,
            pairing_poll_cancel: None,
            opponent_poll_cancel: None,
        }
    }

    pub(super) fn try_recv_message(&self) -> Result<JobMessage, TryRecvError> {
        self.message_rx.try_recv()
    }

    pub(super) fn attempt(&self) -> u64 {
        self.attempt
    }

    pub(super) fn is_current(&self, attempt: u64) -> bool {
        attempt == self.attempt
    }

    /// Stop poll tasks and invalidate in-flight round work.
    pub(super) fn advance_attempt(&mut self) {
        self.cancel_polls();
        self.attempt = self.attempt.wrapping_add(1).max(1);
    }

    pub(super) fn begin_classify(&self, classifier: Arc<dyn Classifier>, image: ImagePayload) {
        let attempt = self.attempt;
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let result = classifier.classify(&image);
            let _ = tx.send(JobMessage::Classified(ClassifyResult { attempt, result }));
        });
    }

    pub(super) fn begin_join(&self, matchmaker: Arc<dyn Matchmaker>, user_id: String) {
        let attempt = self.attempt;
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let result = matchmaker.join(&user_id);
            let _ = tx.send(JobMessage::Joined(JoinResult { attempt, result }));
        });
    }

    /// Re-issue the join request every `interval` until a pairing or an error.
    pub(super) fn begin_pairing_poll(
        &mut self,
        matchmaker: Arc<dyn Matchmaker>,
        user_id: String,
        interval: Duration,
    ) {
        if self.pairing_poll_cancel.is_some() {
            return;
        }
        let cancel = Arc::new(AtomicBool::new(false));
        self.pairing_poll_cancel = Some(cancel.clone());
        let attempt = self.attempt;
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            loop {
                if !sleep_unless_cancelled(&cancel, interval) {
                    break;
                }
                match matchmaker.join(&user_id) {
                    Ok(JoinOutcome::Waiting) => {
                        // Still queued
                    }
                    result => {
                        if !cancel.load(Ordering::Relaxed) {
                            let _ = tx.send(JobMessage::Joined(JoinResult { attempt, result }));
                        }
                        break;
                    }
                }
            }
        });
    }

    /// Ask for the opponent's confidence every `interval` until it is known.
    pub(super) fn begin_opponent_poll(
        &mut self,
        matchmaker: Arc<dyn Matchmaker>,
        match_id: String,
        opponent_id: String,
        interval: Duration,
    ) {
        if self.opponent_poll_cancel.is_some() {
            return;
        }
        let cancel = Arc::new(AtomicBool::new(false));
        self.opponent_poll_cancel = Some(cancel.clone());
        let attempt = self.attempt;
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            loop {
                if !sleep_unless_cancelled(&cancel, interval) {
                    break;
                }
                let result = match matchmaker.opponent_confidence(&match_id, &opponent_id) {
                    Ok(None) => continue,
                    Ok(Some(confidence)) => Ok(confidence),
                    Err(err) => Err(err),
                };
                if !cancel.load(Ordering::Relaxed) {
                    let _ = tx.send(JobMessage::OpponentScored(OpponentScoreResult {
                        attempt,
                        match_id,
                        result,
                    }));
                }
                break;
            }
        });
    }

    pub(super) fn begin_score_submit(
        &self,
        scoreboard: Arc<dyn Scoreboard>,
        submission: ScoreSubmission,
    ) {
        let attempt = self.attempt;
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let result = scoreboard.submit_score(&submission);
            let _ = tx.send(JobMessage::ScoreSubmitted(ScoreSubmitResult { attempt, result }));
        });
    }

    pub(super) fn begin_leaderboard(&mut self, scoreboard: Arc<dyn Scoreboard>) {
        if self.leaderboard_in_progress {
            return;
        }
        self.leaderboard_in_progress = true;
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let result = scoreboard.leaderboard();
            let _ = tx.send(JobMessage::LeaderboardLoaded(LeaderboardResult { result }));
        });
    }

    pub(super) fn clear_leaderboard(&mut self) {
        self.leaderboard_in_progress = false;
    }

    pub(super) fn begin_result_report(&self, matchmaker: Arc<dyn Matchmaker>, report: MatchReport) {
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let result = matchmaker.report_result(&report);
            let _ = tx.send(JobMessage::ResultReported(ResultReportResult {
                match_id: report.match_id,
                result,
            }));
        });
    }

    pub(super) fn clear_pairing_poll(&mut self) {
        if let Some(cancel) = self.pairing_poll_cancel.take() {
            cancel.store(true, Ordering::Relaxed);
        }
    }

    pub(super) fn clear_opponent_poll(&mut self) {
        if let Some(cancel) = self.opponent_poll_cancel.take() {
            cancel.store(true, Ordering::Relaxed);
        }
    }

    pub(super) fn cancel_polls(&mut self) {
        self.clear_pairing_poll();
        self.clear_opponent_poll();
    }

    pub(super) fn polls_running(&self) -> bool {
        self.pairing_poll_cancel.is_some() || self.opponent_poll_cancel.is_some()
    }
}

impl Drop for OrchestratorJobs {
    fn drop(&mut self) {
        self.cancel_polls();
    }
}

/// Sleep for `interval` in short slices. Returns false once cancelled.
fn sleep_unless_cancelled(cancel: &AtomicBool, interval: Duration) -> bool {
    let mut remaining = interval;
    loop {
        if cancel.load(Ordering::Relaxed) {
            return false;
        }
        if remaining.is_zero() {
            return true;
        }
        let step = remaining.min(CANCEL_CHECK_SLICE);
        thread::sleep(step);
        remaining -= step;
    }
}
