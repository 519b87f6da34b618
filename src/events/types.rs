//! Event type definitions for progress reporting.

use crate::core::scoring::ScoringMethod;
use serde::{Deserialize, Serialize};

/// All events emitted by the inspection pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Pipeline-level events
    Pipeline(PipelineEvent),
    /// Per-method scoring events
    Scoring(ScoringEvent),
    /// Region comparison events
    Region(RegionEvent),
    /// Batch progress events
    Batch(BatchEvent),
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Analysis of a pair has started
    Started { reference: String, target: String },
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Analysis completed successfully
    Completed { summary: PipelineSummary },
    /// Analysis failed
    Error { message: String },
}

/// Phases of a single pair analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Preprocessing,
    Scoring,
    Fusing,
    ExtractingRegions,
    ComparingRegions,
    Aggregating,
    Done,
}

/// Events from the six similarity methods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScoringEvent {
    /// A method produced a score
    MethodScored { method: ScoringMethod, score: f64 },
    /// A method failed and was scored 0.0
    MethodDegraded { method: ScoringMethod, reason: String },
}

/// Events during region comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegionEvent {
    /// Region comparison has started
    Started { total_regions: usize },
    /// A region was compared
    Compared {
        index: usize,
        class_name: String,
        combined_difference: f64,
        significant: bool,
    },
    /// A region could not be extracted and was skipped
    Skipped { index: usize, reason: String },
    /// Region comparison completed
    Completed { compared: usize, skipped: usize },
}

/// Events while processing a batch of pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchEvent {
    /// Batch processing has started
    Started { total_pairs: usize },
    /// A pair finished, successfully or not
    PairFinished {
        index: usize,
        succeeded: bool,
        completed: usize,
        total: usize,
    },
    /// Batch processing completed
    Completed { succeeded: usize, failed: usize },
}

/// Summary of a finished analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Fused similarity confidence
    pub confidence: f64,
    /// Whether the captures show the same scene
    pub is_similar: bool,
    /// Mean region difference, when boxes were supplied
    pub change_magnitude: Option<f64>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Preprocessing => write!(f, "Preprocessing"),
            PipelinePhase::Scoring => write!(f, "Scoring"),
            PipelinePhase::Fusing => write!(f, "Fusing"),
            PipelinePhase::ExtractingRegions => write!(f, "Extracting regions"),
            PipelinePhase::ComparingRegions => write!(f, "Comparing regions"),
            PipelinePhase::Aggregating => write!(f, "Aggregating"),
            PipelinePhase::Done => write!(f, "Done"),
        }
    }
}
