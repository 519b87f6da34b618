//! Fast structural comparison on thumbnails.

use super::traits::{unit_score, MethodOutcome, ScoringMethod, SimilarityMethod};
use crate::core::loader::{resize_gray, PreprocessedImage, ResizeFilter};
use crate::error::MethodError;
use image::GrayImage;

/// Thumbnail side used for the comparison
pub const THUMBNAIL_SIZE: u32 = 64;

/// Mean squared error between 64x64 thumbnails, mapped to `1 - mse / 255`
#[derive(Debug, Clone, Copy)]
pub struct StructuralMethod {
    size: u32,
}

impl StructuralMethod {
    pub fn new() -> Self {
        Self {
            size: THUMBNAIL_SIZE,
        }
    }

    pub fn compare(&self, a: &GrayImage, b: &GrayImage) -> MethodOutcome {
        let small_a = resize_gray(a, self.size, self.size, ResizeFilter::Area)
            .map_err(|e| MethodError::Numeric(e.to_string()))?;
        let small_b = resize_gray(b, self.size, self.size, ResizeFilter::Area)
            .map_err(|e| MethodError::Numeric(e.to_string()))?;

        let mse = mean_squared_error(&small_a, &small_b);
        unit_score(1.0 - mse / 255.0, "structural comparison")
    }
}

impl Default for StructuralMethod {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityMethod for StructuralMethod {
    fn score(&self, a: &PreprocessedImage, b: &PreprocessedImage) -> MethodOutcome {
        self.compare(a.pixels(), b.pixels())
    }

    fn kind(&self) -> ScoringMethod {
        ScoringMethod::Structural
    }
}

/// Mean of squared per-pixel differences of two equally sized images
pub fn mean_squared_error(a: &GrayImage, b: &GrayImage) -> f64 {
    let n = a.as_raw().len().min(b.as_raw().len());
    if n == 0 {
        return 0.0;
    }

    let total: f64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();

    total / n as f64
}
