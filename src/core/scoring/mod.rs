//! # Scoring Module
//!
//! Six independent similarity measures over a preprocessed image pair.
//!
//! ## Methods
//! - **Histogram** - global intensity distribution, blind to layout
//! - **Template** - multi-scale normalized cross-correlation
//! - **Phase** - frequency-domain alignment peak, robust to translation
//! - **Features** - ORB keypoints with geometric verification
//! - **Structural** - MSE on a small thumbnail
//! - **Augmentation** - best correlation under small photometric and geometric variants
//!
//! Every method returns a score in [0, 1] or a [`MethodError`](crate::error::MethodError).
//! Errors are never fatal here; fusion turns them into a 0.0 score.
//!
//! ## Example
//! ```rust,ignore
//! use scene_inspector::core::scoring::ScoringEngine;
//!
//! let engine = ScoringEngine::new(&config);
//! let outcomes = engine.score_all(&reference, &target);
//! ```

mod augmentation;
mod correlation;
pub mod features;
mod histogram;
mod phase;
mod spectral;
mod structural;
mod template;
mod traits;

pub use augmentation::{AugmentationMethod, AugmentationVariant};
pub use correlation::{max_normalized_correlation, pearson};
pub use features::FeatureMethod;
pub use histogram::{
    chi_square, correlation as histogram_correlation, intensity_histogram, intersection, normalize_min_max,
    HistogramMethod,
};
pub use phase::PhaseCorrelationMethod;
pub use structural::{mean_squared_error, StructuralMethod};
pub use template::TemplateMethod;
pub use traits::{MethodMap, MethodOutcome, MethodScores, ScoringMethod, SimilarityMethod};

use crate::core::config::InspectorConfig;
use crate::core::loader::PreprocessedImage;
use crate::error::MethodError;
use rayon::prelude::*;
use tracing::debug;

/// Runs all six methods over a pair
pub struct ScoringEngine {
    methods: Vec<Box<dyn SimilarityMethod>>,
}

impl ScoringEngine {
    /// Build the method table in fusion order
    pub fn new(config: &InspectorConfig) -> Self {
        let methods: Vec<Box<dyn SimilarityMethod>> = vec![
            Box::new(HistogramMethod::new()),
            Box::new(TemplateMethod::new()),
            Box::new(PhaseCorrelationMethod::new()),
            Box::new(FeatureMethod::new(config.max_keypoints)),
            Box::new(StructuralMethod::new()),
            Box::new(AugmentationMethod::new()),
        ];
        Self { methods }
    }

    /// Score the pair with every method concurrently
    pub fn score_all(&self, a: &PreprocessedImage, b: &PreprocessedImage) -> MethodMap<MethodOutcome> {
        let outcomes: Vec<(ScoringMethod, MethodOutcome)> = self
            .methods
            .par_iter()
            .map(|method| {
                let outcome = method.score(a, b);
                debug!(method = %method.kind(), ?outcome, "method scored");
                (method.kind(), outcome)
            })
            .collect();

        let mut map = MethodMap::from_fn(|m| {
            Err(MethodError::InsufficientData(format!("{} did not run", m)))
        });
        for (method, outcome) in outcomes {
            map[method] = outcome;
        }
        map
    }

    /// Score the pair with a single method
    pub fn score_one(&self, method: ScoringMethod, a: &PreprocessedImage, b: &PreprocessedImage) -> MethodOutcome {
        match self.methods.iter().find(|m| m.kind() == method) {
            Some(m) => m.score(a, b),
            None => Err(MethodError::InsufficientData(format!(
                "{} is not registered",
                method
            ))),
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(&InspectorConfig::default())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{flat, textured_scene};
    use super::*;
    use crate::core::loader::{equalize, PreprocessedImage};

    fn prepared(image: image::GrayImage) -> PreprocessedImage {
        PreprocessedImage::from_gray(equalize(&image))
    }

    #[test]
    fn engine_runs_every_method() {
        let image = prepared(textured_scene(256, 256, 1));
        let outcomes = ScoringEngine::default().score_all(&image, &image);

        for (method, outcome) in outcomes.iter() {
            let score = outcome.as_ref().unwrap_or_else(|e| panic!("{} failed: {}", method, e));
            assert!(*score >= 0.95, "{} scored {}", method, score);
        }
    }

    #[test]
    fn black_and_white_score_low() {
        let black = prepared(flat(256, 256, 0));
        let white = prepared(flat(256, 256, 255));
        let outcomes = ScoringEngine::default().score_all(&black, &white);

        assert!(*outcomes.structural.as_ref().unwrap() < 0.05);
        assert!(*outcomes.histogram.as_ref().unwrap() < 0.1);
        assert_eq!(*outcomes.features.as_ref().unwrap(), 0.0);
    }

    #[test]
    fn score_one_matches_score_all() {
        let a = prepared(textured_scene(128, 128, 2));
        let b = prepared(textured_scene(128, 128, 3));
        let engine = ScoringEngine::default();
        let all = engine.score_all(&a, &b);

        for method in [ScoringMethod::Histogram, ScoringMethod::Structural, ScoringMethod::Phase] {
            assert_eq!(engine.score_one(method, &a, &b), all[method]);
        }
    }

    #[test]
    fn textures_differ_by_seed() {
        assert_ne!(textured_scene(64, 64, 1), textured_scene(64, 64, 2));
        assert_eq!(textured_scene(64, 64, 1), textured_scene(64, 64, 1));
    }
}
