//! # Fusion Module
//!
//! Combines the six method outcomes into one confidence and a verdict.
//!
//! ## How It Works
//! 1. Failed methods degrade to a score of 0.0 and are listed in `degraded`
//! 2. Scores are combined as a weighted sum using the configured weights
//! 3. The pair is similar when the sum reaches the threshold (inclusive)
//! 4. The best method is the highest raw score; ties go to the earlier method

use crate::core::scoring::{MethodMap, MethodOutcome, MethodScores, ScoringMethod};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A method whose outcome was replaced by 0.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedMethod {
    pub method: ScoringMethod,
    pub reason: String,
}

/// Fused similarity verdict for one image pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Weighted sum of the method scores, in [0, 1]
    pub confidence: f64,
    /// Whether `confidence` reached the similarity threshold
    pub is_similar: bool,
    /// Method with the highest raw score
    pub best_method: ScoringMethod,
    /// Raw score of every method
    pub scores: MethodScores,
    /// Methods that failed and were scored 0.0
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<DegradedMethod>,
}

impl SimilarityResult {
    /// Score of the best method
    pub fn best_score(&self) -> f64 {
        self.scores[self.best_method]
    }

    /// Weighted contribution of each method to the confidence
    pub fn contributions(&self, weights: &MethodMap<f64>) -> MethodScores {
        self.scores.map(|method, score| score * weights[method])
    }
}

/// Apply the degrade-to-zero policy and fuse the outcomes
pub fn fuse(outcomes: &MethodMap<MethodOutcome>, weights: &MethodMap<f64>, threshold: f64) -> SimilarityResult {
    let mut degraded = Vec::new();
    let scores = outcomes.map(|method, outcome| match outcome {
        Ok(score) => *score,
        Err(e) => {
            warn!("{} degraded to 0.0: {}", method, e);
            degraded.push(DegradedMethod {
                method,
                reason: e.to_string(),
            });
            0.0
        }
    });

    fuse_scores(scores, weights, threshold, degraded)
}

/// Fuse scores that are already known to be valid
pub fn fuse_scores(
    scores: MethodScores,
    weights: &MethodMap<f64>,
    threshold: f64,
    degraded: Vec<DegradedMethod>,
) -> SimilarityResult {
    let confidence = scores
        .iter()
        .map(|(method, score)| score * weights[method])
        .sum::<f64>()
        .clamp(0.0, 1.0);

    SimilarityResult {
        confidence,
        is_similar: confidence >= threshold,
        best_method: best_method(&scores),
        scores,
        degraded,
    }
}

/// Argmax of the raw scores; the first method in fusion order wins ties
pub fn best_method(scores: &MethodScores) -> ScoringMethod {
    let mut best = ScoringMethod::ALL[0];
    for (method, &score) in scores.iter() {
        if score > scores[best] {
            best = method;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DEFAULT_WEIGHTS;
    use crate::error::MethodError;

    fn ok_scores(values: [f64; 6]) -> MethodMap<MethodOutcome> {
        MethodMap::from_fn(|m| Ok(values[m.index()]))
    }

    #[test]
    fn all_ones_fuse_to_one() {
        let result = fuse(&ok_scores([1.0; 6]), &DEFAULT_WEIGHTS, 0.5);
        assert!((result.confidence - 1.0).abs() < 1e-9);
        assert!(result.is_similar);
        assert!(result.degraded.is_empty());
    }

    #[test]
    fn threshold_is_inclusive() {
        let result = fuse(&ok_scores([0.5; 6]), &DEFAULT_WEIGHTS, 0.5);
        assert!((result.confidence - 0.5).abs() < 1e-9);

        let at_threshold = fuse_scores(
            MethodMap::from_fn(|m| if m == ScoringMethod::Features { 1.0 } else { 0.0 }),
            &DEFAULT_WEIGHTS,
            0.3,
            vec![],
        );
        assert_eq!(at_threshold.confidence, 0.3);
        assert!(at_threshold.is_similar);
    }

    #[test]
    fn failed_methods_degrade_to_zero() {
        let mut outcomes = ok_scores([1.0; 6]);
        outcomes.phase = Err(MethodError::Numeric("nan peak".to_string()));
        let result = fuse(&outcomes, &DEFAULT_WEIGHTS, 0.95);

        assert_eq!(result.scores.phase, 0.0);
        assert!((result.confidence - 0.9).abs() < 1e-9);
        assert!(!result.is_similar);
        assert_eq!(result.degraded.len(), 1);
        assert_eq!(result.degraded[0].method, ScoringMethod::Phase);
        assert!(result.degraded[0].reason.contains("nan peak"));
    }

    #[test]
    fn confidence_stays_in_unit_range() {
        for value in [0.0, 0.13, 0.5, 0.77, 1.0] {
            let result = fuse(&ok_scores([value; 6]), &DEFAULT_WEIGHTS, 0.5);
            assert!((0.0..=1.0).contains(&result.confidence));
        }
    }

    #[test]
    fn best_method_ties_go_to_earlier_method() {
        let scores = MethodMap::from_fn(|m| match m {
            ScoringMethod::Template | ScoringMethod::Structural => 0.8,
            _ => 0.2,
        });
        assert_eq!(best_method(&scores), ScoringMethod::Template);
        assert_eq!(best_method(&MethodMap::from_fn(|_| 0.0)), ScoringMethod::Histogram);
    }

    #[test]
    fn best_method_picks_maximum() {
        let scores = MethodMap::from_fn(|m| if m == ScoringMethod::Augmentation { 0.9 } else { 0.1 });
        let result = fuse_scores(scores, &DEFAULT_WEIGHTS, 0.5, vec![]);
        assert_eq!(result.best_method, ScoringMethod::Augmentation);
        assert_eq!(result.best_score(), 0.9);
    }

    #[test]
    fn serializes_with_stable_field_names() {
        let result = fuse(&ok_scores([0.4; 6]), &DEFAULT_WEIGHTS, 0.5);
        let json = serde_json::to_value(&result).unwrap();
        for field in ["confidence", "is_similar", "best_method", "scores"] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(json["scores"]["features"], 0.4);
    }
}
