//! Comparison of the detection sets found in two captures.
//!
//! Works on class counts only: no geometry is involved.

use crate::core::regions::DetectionBox;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const COUNT_WEIGHT: f64 = 0.7;
const CLASS_WEIGHT: f64 = 0.3;

/// Outcome category of a detection set comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSetKind {
    /// Neither capture has detections
    BothClean,
    /// Only the target has detections
    NewFindings,
    /// Only the reference had detections
    Resolved,
    /// Some class increased
    Worsened,
    /// No class increased and some class decreased
    Improved,
    /// Every class count is unchanged
    Stable,
}

/// Direction of one class count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassTrend {
    Unchanged,
    Increased,
    Decreased,
}

/// Count of one class in both captures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassChange {
    pub class_name: String,
    pub reference_count: usize,
    pub target_count: usize,
    pub trend: ClassTrend,
}

/// Result of [`compare_detection_sets`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSetChange {
    pub kind: DetectionSetKind,
    pub change_magnitude: f64,
    pub significant_change: bool,
    pub reference_count: usize,
    pub target_count: usize,
    /// Per-class counts, sorted by class name
    pub classes: Vec<ClassChange>,
    pub summary: String,
}

impl DetectionSetChange {
    /// Class names with the given trend
    pub fn classes_with(&self, trend: ClassTrend) -> Vec<&str> {
        self.classes
            .iter()
            .filter(|c| c.trend == trend)
            .map(|c| c.class_name.as_str())
            .collect()
    }
}

/// Compare the detections of a reference capture with those of a target capture
pub fn compare_detection_sets(
    reference: &[DetectionBox],
    target: &[DetectionBox],
    change_threshold: f64,
) -> DetectionSetChange {
    let reference_counts = class_counts(reference);
    let target_counts = class_counts(target);

    let names: BTreeSet<&str> = reference_counts.keys().chain(target_counts.keys()).copied().collect();
    let classes: Vec<ClassChange> = names
        .into_iter()
        .map(|name| {
            let reference_count = reference_counts.get(name).copied().unwrap_or(0);
            let target_count = target_counts.get(name).copied().unwrap_or(0);
            let trend = match target_count.cmp(&reference_count) {
                std::cmp::Ordering::Equal => ClassTrend::Unchanged,
                std::cmp::Ordering::Greater => ClassTrend::Increased,
                std::cmp::Ordering::Less => ClassTrend::Decreased,
            };
            ClassChange {
                class_name: name.to_string(),
                reference_count,
                target_count,
                trend,
            }
        })
        .collect();

    let (kind, change_magnitude) = match (reference.is_empty(), target.is_empty()) {
        (true, true) => (DetectionSetKind::BothClean, 0.0),
        (true, false) => (DetectionSetKind::NewFindings, 1.0),
        (false, true) => (DetectionSetKind::Resolved, 1.0),
        (false, false) => {
            let count_change = reference.len().abs_diff(target.len()) as f64
                / reference.len().max(target.len()).max(1) as f64;
            let changed = classes.iter().filter(|c| c.trend != ClassTrend::Unchanged).count();
            let class_ratio = changed as f64 / classes.len().max(1) as f64;
            let magnitude = COUNT_WEIGHT * count_change + CLASS_WEIGHT * class_ratio;

            let kind = if classes.iter().any(|c| c.trend == ClassTrend::Increased) {
                DetectionSetKind::Worsened
            } else if classes.iter().any(|c| c.trend == ClassTrend::Decreased) {
                DetectionSetKind::Improved
            } else {
                DetectionSetKind::Stable
            };
            (kind, magnitude)
        }
    };

    let mut result = DetectionSetChange {
        kind,
        change_magnitude,
        significant_change: change_magnitude >= change_threshold,
        reference_count: reference.len(),
        target_count: target.len(),
        classes,
        summary: String::new(),
    };
    result.summary = summarize(&result);
    result
}

fn summarize(change: &DetectionSetChange) -> String {
    match change.kind {
        DetectionSetKind::BothClean => "No detections in either image".to_string(),
        DetectionSetKind::NewFindings => format!(
            "Target has {} new detections ({})",
            change.target_count,
            change.classes_with(ClassTrend::Increased).join(", ")
        ),
        DetectionSetKind::Resolved => format!(
            "Reference had {} detections ({}), target is clean",
            change.reference_count,
            change.classes_with(ClassTrend::Decreased).join(", ")
        ),
        DetectionSetKind::Worsened => format!(
            "Condition worsened: {} increased",
            change.classes_with(ClassTrend::Increased).join(", ")
        ),
        DetectionSetKind::Improved => format!(
            "Condition improved: {} decreased",
            change.classes_with(ClassTrend::Decreased).join(", ")
        ),
        DetectionSetKind::Stable => format!(
            "Condition stable: {} classes unchanged",
            change.classes_with(ClassTrend::Unchanged).len()
        ),
    }
}

fn class_counts(detections: &[DetectionBox]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for detection in detections {
        *counts.entry(detection.class_name.as_str()).or_insert(0) += 1;
    }
    counts
}
