//! # Core Module
//!
//! The comparison engine. No I/O besides decoding the captures it is given.
//!
//! ## Modules
//! - `loader` - Decodes captures and brings them to the canonical form
//! - `scoring` - The six similarity methods
//! - `fusion` - Weighted verdict over the method scores
//! - `regions` - Per-box extraction and difference scoring
//! - `changes` - Overall change verdict and detection set comparison
//! - `pipeline` - Orchestrates the full workflow
//! - `reporter` - Summaries and JSON export
//! - `config` - Validated tuning parameters

pub mod changes;
pub mod config;
pub mod fusion;
pub mod loader;
pub mod pipeline;
pub mod regions;
pub mod reporter;
pub mod scoring;

// Re-export commonly used types
pub use changes::{ChangeResult, ChangeStatus};
pub use config::InspectorConfig;
pub use fusion::SimilarityResult;
pub use loader::{ImageSource, PreprocessedImage};
pub use pipeline::{Inspector, PairRequest};
pub use regions::{DetectionBox, RegionComparison};
pub use reporter::AnalysisReport;
pub use scoring::{MethodScores, ScoringMethod};
