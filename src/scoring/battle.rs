use std::fmt;

const DRAW_BAND: f64 = 0.05;
const DECISIVE_MARGIN: f64 = 0.15;
/// Slack applied at band edges so decimal inputs land where they read.
const BOUNDARY_TOLERANCE: f64 = 1e-9;

/// Head-to-head outcome from the local player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BattleOutcome {
    Win,
    Draw,
    Lose,
}

impl BattleOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            BattleOutcome::Win => "win",
            BattleOutcome::Draw => "draw",
            BattleOutcome::Lose => "lose",
        }
    }

    /// Outcome seen from the other side.
    pub fn flipped(self) -> Self {
        match self {
            BattleOutcome::Win => BattleOutcome::Lose,
            BattleOutcome::Draw => BattleOutcome::Draw,
            BattleOutcome::Lose => BattleOutcome::Win,
        }
    }
}

impl fmt::Display for BattleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strength of a win or loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BattleTier {
    Decisive,
    Narrow,
    Even,
}

impl BattleTier {
    pub fn as_str(self) -> &'static str {
        match self {
            BattleTier::Decisive => "decisive",
            BattleTier::Narrow => "narrow",
            BattleTier::Even => "even",
        }
    }
}

impl fmt::Display for BattleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleResult {
    pub outcome: BattleOutcome,
    pub tier: BattleTier,
}

/// Compare two confidences.
///
/// `|diff| <= 0.05` is a draw; `0.05 < |diff| <= 0.15` is narrow; anything
/// wider is decisive.
pub fn resolve(my_confidence: f64, opponent_confidence: f64) -> BattleResult {
    let diff = my_confidence - opponent_confidence;
    let (outcome, tier) = if diff > DECISIVE_MARGIN + BOUNDARY_TOLERANCE {
        (BattleOutcome::Win, BattleTier::Decisive)
    } else if diff > DRAW_BAND + BOUNDARY_TOLERANCE {
        (BattleOutcome::Win, BattleTier::Narrow)
    } else if diff >= -DRAW_BAND - BOUNDARY_TOLERANCE {
        (BattleOutcome::Draw, BattleTier::Even)
    } else if diff >= -DECISIVE_MARGIN - BOUNDARY_TOLERANCE {
        (BattleOutcome::Lose, BattleTier::Narrow)
    } else {
        (BattleOutcome::Lose, BattleTier::Decisive)
    };
    BattleResult { outcome, tier }
}
