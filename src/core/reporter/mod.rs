//! # Reporter Module
//!
//! Turns an analysis into something a person can act on.
//!
//! ## Outputs
//! 1. **Record**: [`AnalysisReport`], the serializable result of one pair
//! 2. **Summary**: a few plain lines, "Similarity: SIMILAR (confidence: 97.2%)"
//! 3. **Export**: pretty JSON to any writer or file

mod explanation;
mod export;
mod visualization;

pub use explanation::{explain, Explanation};
pub use export::{export_json, export_to_file};
pub use visualization::{score_bar, ScoreTable};

use crate::core::changes::ChangeResult;
use crate::core::fusion::SimilarityResult;
use crate::core::regions::{ConfidenceLevel, DetectionBox};
use serde::{Deserialize, Serialize};

/// Complete result for one reference/target pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Label of the reference capture
    pub reference: String,
    /// Label of the target capture
    pub target: String,
    /// Fused similarity verdict
    pub similarity: SimilarityResult,
    /// Region change verdict, when region comparison ran
    pub changes: Option<ChangeResult>,
    /// Counts of the supplied boxes by confidence
    pub detection_summary: DetectionSummary,
    /// Wall-clock time per stage
    pub timings: StageTimings,
}

impl AnalysisReport {
    /// Whether the target shows a significant change
    pub fn significant_change(&self) -> bool {
        self.changes.as_ref().is_some_and(|c| c.significant_change)
    }

    /// One-line summary of the verdicts
    pub fn headline(&self) -> String {
        explain(self).headline
    }
}

/// Detector box counts split at the confidence threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub total: usize,
    pub high_confidence: usize,
    pub low_confidence: usize,
}

impl DetectionSummary {
    pub fn from_boxes(boxes: &[DetectionBox], split: f64) -> Self {
        let high_confidence = boxes
            .iter()
            .filter(|b| b.confidence_level(split) == ConfidenceLevel::High)
            .count();
        Self {
            total: boxes.len(),
            high_confidence,
            low_confidence: boxes.len() - high_confidence,
        }
    }
}

/// Milliseconds spent in each stage
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageTimings {
    /// Decoding and preprocessing both captures
    pub preprocess_ms: f64,
    /// Running the six methods and fusing them
    pub scoring_ms: f64,
    /// Region extraction, comparison and aggregation
    pub regions_ms: f64,
    pub total_ms: f64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::core::changes::ChangeAggregator;
    use crate::core::fusion::fuse_scores;
    use crate::core::regions::RegionComparison;
    use crate::core::scoring::MethodMap;

    pub fn report(confidence_each: f64, combined: Option<f64>) -> AnalysisReport {
        let weights = crate::core::config::DEFAULT_WEIGHTS;
        let similarity = fuse_scores(MethodMap::from_fn(|_| confidence_each), &weights, 0.5, vec![]);
        let detection = DetectionBox::new(1, "hotspot", 0.85, [10.0, 10.0, 60.0, 40.0]);
        let changes = combined.map(|value| {
            ChangeAggregator::default().aggregate(
                vec![RegionComparison {
                    index: 0,
                    detection: detection.clone(),
                    pixel_difference: value,
                    histogram_difference: value,
                    combined_difference: value,
                    significant: value > 0.3,
                }],
                vec![],
            )
        });

        let boxes: &[DetectionBox] = if changes.is_some() {
            std::slice::from_ref(&detection)
        } else {
            &[]
        };

        AnalysisReport {
            reference: "baseline.png".to_string(),
            target: "inspection.png".to_string(),
            similarity,
            detection_summary: DetectionSummary::from_boxes(boxes, 0.3),
            changes,
            timings: StageTimings {
                preprocess_ms: 12.0,
                scoring_ms: 80.5,
                regions_ms: 3.25,
                total_ms: 95.75,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_summary_splits_on_confidence() {
        let boxes = vec![
            DetectionBox::new(0, "a", 0.9, [0.0, 0.0, 1.0, 1.0]),
            DetectionBox::new(0, "a", 0.3, [0.0, 0.0, 1.0, 1.0]),
            DetectionBox::new(1, "b", 0.1, [0.0, 0.0, 1.0, 1.0]),
        ];
        let summary = DetectionSummary::from_boxes(&boxes, 0.3);
        assert_eq!(summary, DetectionSummary { total: 3, high_confidence: 2, low_confidence: 1 });
    }

    #[test]
    fn significant_change_requires_changes() {
        assert!(!fixtures::report(0.9, None).significant_change());
        assert!(fixtures::report(0.9, Some(0.8)).significant_change());
        assert!(!fixtures::report(0.9, Some(0.05)).significant_change());
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = fixtures::report(0.7, Some(0.4));
        let json = serde_json::to_string(&report).unwrap();
        let restored: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, report);
    }
}
