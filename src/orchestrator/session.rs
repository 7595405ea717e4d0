use crate::scoring::{BattleOutcome, BattleResult};

/// State of one paired head-to-head round.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSession {
    pub match_id: String,
    pub opponent_id: String,
    pub my_confidence: Option<f64>,
    pub opponent_confidence: Option<f64>,
    /// Set once both confidences are known.
    pub result: Option<BattleResult>,
}

impl MatchSession {
    pub(crate) fn new(match_id: String, opponent_id: String) -> Self {
        Self {
            match_id,
            opponent_id,
            my_confidence: None,
            opponent_confidence: None,
            result: None,
        }
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        self.result.map(|result| result.outcome)
    }

    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }

    /// Both confidences, once both have arrived.
    pub(crate) fn confidences(&self) -> Option<(f64, f64)> {
        self.my_confidence.zip(self.opponent_confidence)
    }
}
