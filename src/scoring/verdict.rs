use std::fmt;

use super::AggregatedResult;
use crate::shapes::Shape;

const CONFIRMED_AT: f64 = 0.70;
const LIKELY_AT: f64 = 0.40;
const PLAUSIBLE_AT: f64 = 0.20;

/// How convincingly a free-play or daily image shows the target shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeVerdict {
    Confirmed,
    Likely,
    Plausible,
    Unlikely,
}

impl ShapeVerdict {
    /// Grade a round.
    ///
    /// Only a round whose top-ranked label is the target earns more than
    /// `Unlikely`; the tier then follows the target confidence.
    pub fn evaluate(target: &Shape, aggregated: &AggregatedResult, target_confidence: f64) -> Self {
        let leads = aggregated
            .leader()
            .is_some_and(|leader| target.matches_label(&leader.label));
        if !leads {
            return ShapeVerdict::Unlikely;
        }
        if target_confidence >= CONFIRMED_AT {
            ShapeVerdict::Confirmed
        } else if target_confidence >= LIKELY_AT {
            ShapeVerdict::Likely
        } else if target_confidence >= PLAUSIBLE_AT {
            ShapeVerdict::Plausible
        } else {
            ShapeVerdict::Unlikely
        }
    }

    /// Player-facing summary.
    pub fn message(self) -> &'static str {
        match self {
            ShapeVerdict::Confirmed => "That is exactly the shape. Well spotted!",
            ShapeVerdict::Likely => "Very likely the right shape.",
            ShapeVerdict::Plausible => "It could be the shape, but the classifier is unsure.",
            ShapeVerdict::Unlikely => "This does not look like the target shape. Try another photo.",
        }
    }
}

impl fmt::Display for ShapeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShapeVerdict::Confirmed => "confirmed",
            ShapeVerdict::Likely => "likely",
            ShapeVerdict::Plausible => "plausible",
            ShapeVerdict::Unlikely => "unlikely",
        })
    }
}
