//! Pure scoring: confidence aggregation, battle resolution and round verdicts.

mod aggregate;
mod battle;
mod verdict;

pub use aggregate::{AggregatedResult, ConfidenceAggregator, Prediction, confidence_for};
pub use battle::{BattleOutcome, BattleResult, BattleTier, resolve};
pub use verdict::ShapeVerdict;

/// Number of ranked predictions kept before the residual bucket.
pub const DEFAULT_TOP_N: usize = 3;
