//! Multi-scale template matching.
//!
//! Image B is rescaled by each factor and slid over image A; the score is
//! the best correlation coefficient found. Scales whose template would not
//! fit inside A are skipped.

use super::correlation::max_normalized_correlation;
use super::traits::{unit_score, MethodOutcome, ScoringMethod, SimilarityMethod};
use crate::core::loader::{resize_gray, PreprocessedImage, ResizeFilter};
use crate::error::MethodError;
use image::GrayImage;
use tracing::trace;

/// Template scales applied to image B
pub const TEMPLATE_SCALES: [f64; 3] = [0.8, 1.0, 1.2];

/// Normalized cross-correlation at several scales
#[derive(Debug, Clone)]
pub struct TemplateMethod {
    scales: Vec<f64>,
}

impl TemplateMethod {
    pub fn new() -> Self {
        Self::with_scales(&TEMPLATE_SCALES)
    }

    pub fn with_scales(scales: &[f64]) -> Self {
        Self {
            scales: scales.to_vec(),
        }
    }

    /// Best correlation of `template` (at each scale) within `image`
    pub fn compare(&self, image: &GrayImage, template: &GrayImage) -> MethodOutcome {
        let (width, height) = template.dimensions();
        let mut best: Option<f64> = None;

        for &scale in &self.scales {
            let new_width = (width as f64 * scale) as u32;
            let new_height = (height as f64 * scale) as u32;

            if new_width == 0 || new_height == 0 {
                continue;
            }
            if new_width > image.width() || new_height > image.height() {
                trace!(scale, "template larger than image, skipping scale");
                continue;
            }

            let resized = resize_gray(template, new_width, new_height, ResizeFilter::Bilinear)
                .map_err(|e| MethodError::Numeric(e.to_string()))?;

            if let Some(correlation) = max_normalized_correlation(image, &resized) {
                best = Some(best.map_or(correlation, |b| b.max(correlation)));
            }
        }

        unit_score(best.unwrap_or(0.0), "template matching")
    }
}

impl Default for TemplateMethod {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityMethod for TemplateMethod {
    fn score(&self, a: &PreprocessedImage, b: &PreprocessedImage) -> MethodOutcome {
        self.compare(a.pixels(), b.pixels())
    }

    fn kind(&self) -> ScoringMethod {
        ScoringMethod::Template
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scoring::fixtures::{flat, textured_scene};

    #[test]
    fn identical_images_score_one() {
        let image = textured_scene(96, 96, 3);
        let score = TemplateMethod::new().compare(&image, &image).unwrap();
        assert!(score >= 0.99, "score = {}", score);
    }

    #[test]
    fn flat_images_score_zero() {
        let score = TemplateMethod::new()
            .compare(&flat(64, 64, 0), &flat(64, 64, 255))
            .unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn every_scale_skipped_scores_zero() {
        let method = TemplateMethod::with_scales(&[1.5]);
        let image = textured_scene(32, 32, 1);
        assert_eq!(method.compare(&image, &image).unwrap(), 0.0);
    }

    #[test]
    fn unrelated_content_scores_lower() {
        let a = textured_scene(96, 96, 1);
        let b = textured_scene(96, 96, 99);
        let score = TemplateMethod::new().compare(&a, &b).unwrap();
        assert!(score < 0.9, "score = {}", score);
    }
}
