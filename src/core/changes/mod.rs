//! # Changes Module
//!
//! Reduces per-region comparisons to an overall change verdict, and compares
//! whole detection sets between two captures.
//!
//! ## Verdicts
//! - `change_magnitude` is the unweighted mean combined difference of the compared regions
//! - `significant_change` holds when the magnitude reaches the change threshold
//! - `status` is `regions_changed` as soon as one region is individually significant

mod detection_sets;

pub use detection_sets::{compare_detection_sets, ClassChange, ClassTrend, DetectionSetChange, DetectionSetKind};

use crate::core::regions::RegionComparison;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Overall classification of a region comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    /// No boxes were supplied
    NoDetections,
    /// At least one region changed significantly
    RegionsChanged,
    /// Regions were compared and none changed significantly
    RegionsStable,
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeStatus::NoDetections => write!(f, "no_detections"),
            ChangeStatus::RegionsChanged => write!(f, "regions_changed"),
            ChangeStatus::RegionsStable => write!(f, "regions_stable"),
        }
    }
}

/// A box that could not be compared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRegion {
    pub index: usize,
    pub class_name: String,
    pub reason: String,
}

/// Change verdict for one capture pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeResult {
    /// Comparisons in box order
    pub regions: Vec<RegionComparison>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRegion>,
    pub change_magnitude: f64,
    pub significant_change: bool,
    pub status: ChangeStatus,
    pub significant_region_count: usize,
    pub summary: String,
}

impl ChangeResult {
    /// Result for an empty box list
    pub fn no_detections() -> Self {
        Self {
            regions: Vec::new(),
            skipped: Vec::new(),
            change_magnitude: 0.0,
            significant_change: false,
            status: ChangeStatus::NoDetections,
            significant_region_count: 0,
            summary: "No detections supplied for the target image".to_string(),
        }
    }

    /// Number of boxes that were supplied, compared or not
    pub fn detection_count(&self) -> usize {
        self.regions.len() + self.skipped.len()
    }

    /// Regions whose combined difference exceeded the region threshold
    pub fn significant_regions(&self) -> impl Iterator<Item = &RegionComparison> {
        self.regions.iter().filter(|r| r.significant)
    }
}

/// Aggregates region comparisons into a [`ChangeResult`]
#[derive(Debug, Clone, Copy)]
pub struct ChangeAggregator {
    change_threshold: f64,
}

impl ChangeAggregator {
    pub fn new(change_threshold: f64) -> Self {
        Self { change_threshold }
    }

    pub fn aggregate(&self, mut regions: Vec<RegionComparison>, mut skipped: Vec<SkippedRegion>) -> ChangeResult {
        if regions.is_empty() && skipped.is_empty() {
            return ChangeResult::no_detections();
        }

        regions.sort_by_key(|r| r.index);
        skipped.sort_by_key(|s| s.index);

        let change_magnitude = if regions.is_empty() {
            0.0
        } else {
            regions.iter().map(|r| r.combined_difference).sum::<f64>() / regions.len() as f64
        };

        let significant: Vec<&RegionComparison> = regions.iter().filter(|r| r.significant).collect();
        let significant_region_count = significant.len();
        let total = regions.len() + skipped.len();

        let (status, summary) = match significant.as_slice() {
            [] => (
                ChangeStatus::RegionsStable,
                format!("No significant changes in detected regions ({} regions analyzed)", regions.len()),
            ),
            [only] => (
                ChangeStatus::RegionsChanged,
                format!("Significant change detected in 1 region ({})", only.detection.class_name),
            ),
            many => {
                let classes: BTreeSet<&str> = many.iter().map(|r| r.detection.class_name.as_str()).collect();
                (
                    ChangeStatus::RegionsChanged,
                    format!(
                        "Significant changes detected in {} regions ({})",
                        many.len(),
                        classes.into_iter().collect::<Vec<_>>().join(", ")
                    ),
                )
            }
        };

        let summary = if skipped.is_empty() {
            summary
        } else {
            format!("{}; {} of {} regions skipped", summary, skipped.len(), total)
        };

        ChangeResult {
            regions,
            skipped,
            change_magnitude,
            significant_change: change_magnitude >= self.change_threshold,
            status,
            significant_region_count,
            summary,
        }
    }
}

impl Default for ChangeAggregator {
    fn default() -> Self {
        Self::new(0.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::regions::DetectionBox;

    fn region(index: usize, class: &str, combined: f64) -> RegionComparison {
        RegionComparison {
            index,
            detection: DetectionBox::new(0, class, 0.9, [0.0, 0.0, 10.0, 10.0]),
            pixel_difference: combined,
            histogram_difference: combined,
            combined_difference: combined,
            significant: combined > 0.3,
        }
    }

    fn skipped(index: usize) -> SkippedRegion {
        SkippedRegion {
            index,
            class_name: "part".to_string(),
            reason: "empty".to_string(),
        }
    }

    #[test]
    fn empty_input_is_no_detections() {
        let result = ChangeAggregator::default().aggregate(vec![], vec![]);
        assert_eq!(result.status, ChangeStatus::NoDetections);
        assert_eq!(result.change_magnitude, 0.0);
        assert!(!result.significant_change);
    }

    #[test]
    fn magnitude_is_mean_of_compared_regions() {
        let result = ChangeAggregator::default().aggregate(
            vec![region(0, "a", 0.1), region(1, "b", 0.5)],
            vec![skipped(2)],
        );
        assert!((result.change_magnitude - 0.3).abs() < 1e-12);
        assert!(result.significant_change);
        assert_eq!(result.detection_count(), 3);
        assert!(result.summary.contains("1 of 3 regions skipped"));
    }

    #[test]
    fn threshold_is_inclusive() {
        let result = ChangeAggregator::new(0.25).aggregate(vec![region(0, "a", 0.25)], vec![]);
        assert!(result.significant_change);
        assert_eq!(result.status, ChangeStatus::RegionsStable);
    }

    #[test]
    fn single_significant_region_is_named() {
        let result = ChangeAggregator::default().aggregate(vec![region(0, "hotspot", 0.8)], vec![]);
        assert_eq!(result.status, ChangeStatus::RegionsChanged);
        assert_eq!(result.significant_region_count, 1);
        assert_eq!(result.summary, "Significant change detected in 1 region (hotspot)");
    }

    #[test]
    fn several_significant_regions_list_classes_once() {
        let result = ChangeAggregator::default().aggregate(
            vec![region(0, "b", 0.9), region(1, "a", 0.7), region(2, "b", 0.6)],
            vec![],
        );
        assert_eq!(result.significant_region_count, 3);
        assert!(result.summary.ends_with("(a, b)"));
    }

    #[test]
    fn all_regions_skipped_is_stable_with_zero_magnitude() {
        let result = ChangeAggregator::default().aggregate(vec![], vec![skipped(0), skipped(1)]);
        assert_eq!(result.status, ChangeStatus::RegionsStable);
        assert_eq!(result.change_magnitude, 0.0);
        assert!(!result.significant_change);
    }

    #[test]
    fn regions_are_reported_in_box_order() {
        let result = ChangeAggregator::default().aggregate(
            vec![region(2, "c", 0.1), region(0, "a", 0.1), region(1, "b", 0.1)],
            vec![],
        );
        let order: Vec<usize> = result.regions.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn status_serializes_in_snake_case() {
        let json = serde_json::to_string(&ChangeStatus::RegionsChanged).unwrap();
        assert_eq!(json, "\"regions_changed\"");
    }
}
