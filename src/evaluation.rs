//! # Evaluator
//!
//! Ranks consolidation candidates:
//! - threshold filter on minimum freight and minimum distance
//! - optional Pareto frontier maximizing both distance and freight

use std::cmp::Ordering;

use log::info;
use serde::{Deserialize, Serialize};

use crate::combinations::ContiguousSectionCombination;

/// Configuration for candidate evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationConfig {
    /// Candidates must carry strictly more freight than this.
    /// Default: 100.0
    pub min_freight_amount: f64,
    /// Candidates must be strictly longer than this.
    /// Default: 100.0
    pub min_distance: f64,
    /// Also compute the Pareto frontier of the filtered candidates.
    /// Default: false
    pub pareto_front: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            min_freight_amount: 100.0,
            min_distance: 100.0,
            pareto_front: false,
        }
    }
}

/// Result of evaluating a set of combinations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Candidates passing both thresholds, by freight then distance, descending
    pub candidates: Vec<ContiguousSectionCombination>,
    /// Non-dominated candidates, by freight descending
    pub pareto_front: Option<Vec<ContiguousSectionCombination>>,
}

/// Freight descending, then distance descending, then key ascending.
fn by_value(a: &ContiguousSectionCombination, b: &ContiguousSectionCombination) -> Ordering {
    b.freight_amount
        .total_cmp(&a.freight_amount)
        .then(b.distance.total_cmp(&a.distance))
        .then(a.key().cmp(&b.key()))
}

/// Combinations with `freight_amount > min_freight_amount` and `distance > min_distance`.
pub fn filter_candidates(
    combinations: &[ContiguousSectionCombination],
    config: &EvaluationConfig,
) -> Vec<ContiguousSectionCombination> {
    let mut candidates: Vec<ContiguousSectionCombination> = combinations
        .iter()
        .filter(|c| c.freight_amount > config.min_freight_amount && c.distance > config.min_distance)
        .cloned()
        .collect();
    candidates.sort_by(by_value);
    candidates
}

/// Combinations not dominated by any other in both distance and freight.
///
/// Walks candidates by freight descending and keeps one only if it is
/// strictly longer than everything kept so far. Of several candidates with
/// equal freight only the longest survives; exact duplicates keep the first.
pub fn pareto_front(
    combinations: &[ContiguousSectionCombination],
) -> Vec<ContiguousSectionCombination> {
    let mut sorted: Vec<&ContiguousSectionCombination> = combinations.iter().collect();
    sorted.sort_by(|a, b| by_value(a, b));

    sorted
        .into_iter()
        .fold(
            (Vec::new(), f64::NEG_INFINITY),
            |(mut front, longest), candidate| {
                if candidate.distance > longest {
                    front.push(candidate.clone());
                    (front, candidate.distance)
                } else {
                    (front, longest)
                }
            },
        )
        .0
}

/// Filter combinations and optionally compute the frontier of the survivors.
pub fn evaluate(
    combinations: &[ContiguousSectionCombination],
    config: &EvaluationConfig,
) -> Evaluation {
    let candidates = filter_candidates(combinations, config);
    let front = config.pareto_front.then(|| pareto_front(&candidates));

    info!(
        "[Evaluation] {} of {} combinations above freight {} and distance {}{}",
        candidates.len(),
        combinations.len(),
        config.min_freight_amount,
        config.min_distance,
        front
            .as_ref()
            .map(|f| format!(", {} on the Pareto front", f.len()))
            .unwrap_or_default()
    );

    Evaluation {
        candidates,
        pareto_front: front,
    }
}
