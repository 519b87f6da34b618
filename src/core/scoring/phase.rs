//! Phase correlation.
//!
//! The normalized cross-power spectrum of two images transforms back into a
//! sharp peak when they show the same content at some translation. The peak
//! height is the score.

use super::spectral::ComplexGrid;
use super::traits::{unit_score, MethodOutcome, ScoringMethod, SimilarityMethod};
use crate::core::loader::PreprocessedImage;
use crate::error::MethodError;
use image::GrayImage;
use rustfft::FftPlanner;

/// Added to spectrum magnitudes before dividing
pub const SPECTRUM_EPSILON: f64 = 1e-10;

/// FFT phase correlation
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseCorrelationMethod;

impl PhaseCorrelationMethod {
    pub fn new() -> Self {
        Self
    }

    /// Peak of the inverse-transformed normalized cross-power spectrum
    pub fn compare(&self, a: &GrayImage, b: &GrayImage) -> MethodOutcome {
        if a.dimensions() != b.dimensions() {
            return Err(MethodError::DimensionMismatch {
                left: a.dimensions(),
                right: b.dimensions(),
            });
        }

        let (w, h) = (a.width() as usize, a.height() as usize);
        if w == 0 || h == 0 {
            return Err(MethodError::InsufficientData("empty image".to_string()));
        }

        let to_samples = |image: &GrayImage| -> Vec<f64> {
            image.as_raw().iter().map(|&v| v as f64).collect()
        };

        let mut planner = FftPlanner::new();
        let mut spectrum_a = ComplexGrid::from_real(&to_samples(a), w, h, w, h);
        let mut spectrum_b = ComplexGrid::from_real(&to_samples(b), w, h, w, h);
        spectrum_a.forward(&mut planner);
        spectrum_b.forward(&mut planner);

        for (value, other) in spectrum_a.data.iter_mut().zip(&spectrum_b.data) {
            let cross = *value * other.conj();
            *value = cross / (cross.norm() + SPECTRUM_EPSILON);
        }
        spectrum_a.inverse(&mut planner);

        let peak = spectrum_a
            .data
            .iter()
            .map(|c| c.re)
            .fold(f64::NEG_INFINITY, f64::max);

        unit_score(peak.min(1.0), "phase correlation")
    }
}

impl SimilarityMethod for PhaseCorrelationMethod {
    fn score(&self, a: &PreprocessedImage, b: &PreprocessedImage) -> MethodOutcome {
        self.compare(a.pixels(), b.pixels())
    }

    fn kind(&self) -> ScoringMethod {
        ScoringMethod::Phase
    }
}
