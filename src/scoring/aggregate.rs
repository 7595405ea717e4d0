use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::shapes::{Shape, ShapeCatalog};

/// One classifier output: a label and its confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Ranked head of a prediction list plus the mass left outside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedResult {
    /// Highest-confidence predictions, descending.
    pub top_n: Vec<Prediction>,
    /// Sum of every confidence not in `top_n`.
    pub residual: f64,
}

impl AggregatedResult {
    /// Highest-ranked prediction, if any.
    pub fn leader(&self) -> Option<&Prediction> {
        self.top_n.first()
    }
}

/// Ranks predictions, breaking confidence ties by catalog order.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceAggregator<'a> {
    catalog: &'a ShapeCatalog,
}

impl<'a> ConfidenceAggregator<'a> {
    pub fn new(catalog: &'a ShapeCatalog) -> Self {
        Self { catalog }
    }

    /// Sort descending by confidence and split after `top_n` entries.
    ///
    /// Labels outside the catalog rank after catalog labels on ties, then
    /// lexicographically.
    pub fn aggregate(&self, predictions: &[Prediction], top_n: usize) -> AggregatedResult {
        let mut ranked: Vec<(Option<usize>, &Prediction)> = predictions
            .iter()
            .map(|prediction| (self.catalog.position_of_label(&prediction.label), prediction))
            .collect();
        ranked.sort_by(|a, b| compare_ranked(*a, *b));

        let split = top_n.min(ranked.len());
        let residual = ranked[split..]
            .iter()
            .map(|(_, prediction)| prediction.confidence)
            .sum::<f64>();
        AggregatedResult {
            top_n: ranked[..split]
                .iter()
                .map(|(_, prediction)| (*prediction).clone())
                .collect(),
            residual,
        }
    }
}

fn compare_ranked(a: (Option<usize>, &Prediction), b: (Option<usize>, &Prediction)) -> Ordering {
    b.1.confidence
        .total_cmp(&a.1.confidence)
        .then_with(|| match (a.0, b.0) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.1.label.cmp(&b.1.label))
}

/// Confidence the classifier assigned to `shape`, or 0 when it is absent.
///
/// Reads the full prediction list, so a target outside the ranked head is
/// still found. Duplicate labels resolve to their highest confidence.
pub fn confidence_for(predictions: &[Prediction], shape: &Shape) -> f64 {
    let by_label = predictions
        .iter()
        .filter(|prediction| {
            prediction
                .label
                .trim()
                .eq_ignore_ascii_case(&shape.classifier_label)
        })
        .map(|prediction| prediction.confidence)
        .reduce(f64::max);
    by_label
        .or_else(|| {
            predictions
                .iter()
                .filter(|prediction| shape.matches_label(&prediction.label))
                .map(|prediction| prediction.confidence)
                .reduce(f64::max)
        })
        .unwrap_or(0.0)
}
