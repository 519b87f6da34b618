//! Plain-language summaries of an analysis.

use super::AnalysisReport;
use crate::core::changes::ChangeStatus;
use serde::{Deserialize, Serialize};

/// Human-readable account of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// One-line summary
    pub headline: String,
    /// Supporting lines, in display order
    pub details: Vec<String>,
}

impl Explanation {
    /// Headline followed by the details, one per line
    pub fn to_text(&self) -> String {
        let mut text = self.headline.clone();
        for line in &self.details {
            text.push('\n');
            text.push_str(line);
        }
        text
    }
}

/// Explain the verdicts of a report
pub fn explain(report: &AnalysisReport) -> Explanation {
    let similarity = &report.similarity;
    let verdict = if similarity.is_similar { "SIMILAR" } else { "DIFFERENT" };

    let headline = match &report.changes {
        Some(changes) if changes.significant_change => format!(
            "{} scene, significant change (magnitude {:.3})",
            verdict, changes.change_magnitude
        ),
        Some(changes) if changes.status != ChangeStatus::NoDetections => format!(
            "{} scene, regions stable (magnitude {:.3})",
            verdict, changes.change_magnitude
        ),
        _ => format!("{} scene ({:.1}% confidence)", verdict, similarity.confidence * 100.0),
    };

    let mut details = vec![
        format!(
            "Similarity: {} (confidence: {:.1}%)",
            verdict,
            similarity.confidence * 100.0
        ),
        format!(
            "Best method: {} ({:.3})",
            similarity.best_method.description(),
            similarity.best_score()
        ),
    ];

    for degraded in &similarity.degraded {
        details.push(format!(
            "Degraded: {} scored 0.0 ({})",
            degraded.method.description(),
            degraded.reason
        ));
    }

    let detections = &report.detection_summary;
    details.push(format!(
        "Detections: {} total ({} high confidence, {} low confidence)",
        detections.total, detections.high_confidence, detections.low_confidence
    ));

    if let Some(changes) = &report.changes {
        details.push(format!("Region analysis: {}", changes.summary));
        details.push(if changes.significant_change {
            "ALERT: significant changes detected in regions".to_string()
        } else {
            "STABLE: no significant changes in regions".to_string()
        });
    }

    details.push(format!("Processing time: {:.1} ms", report.timings.total_ms));

    Explanation { headline, details }
}
