//! Augmentation-robust comparison.
//!
//! Measures how well image A correlates with image B under the capture
//! variations seen in practice: exposure changes, slight camera roll and
//! small zoom differences. The best variant wins.

use super::correlation::max_normalized_correlation;
use super::traits::{unit_score, MethodOutcome, ScoringMethod, SimilarityMethod};
use crate::core::loader::{resize_gray, PreprocessedImage, ResizeFilter};
use crate::error::MethodError;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

/// Brightness multipliers
pub const BRIGHTNESS_FACTORS: [f32; 3] = [0.8, 1.0, 1.2];
/// Rotations about the image center, in degrees
pub const ROTATION_DEGREES: [f32; 3] = [-5.0, 0.0, 5.0];
/// Zoom factors; the result is padded or cropped back to A's size
pub const SCALE_FACTORS: [f64; 3] = [0.95, 1.0, 1.05];

/// A single perturbation applied to image B
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AugmentationVariant {
    Brightness(f32),
    Rotation(f32),
    Scale(f64),
}

impl AugmentationVariant {
    /// The nine variants, in evaluation order
    pub fn all() -> Vec<AugmentationVariant> {
        BRIGHTNESS_FACTORS
            .iter()
            .map(|&f| AugmentationVariant::Brightness(f))
            .chain(ROTATION_DEGREES.iter().map(|&d| AugmentationVariant::Rotation(d)))
            .chain(SCALE_FACTORS.iter().map(|&s| AugmentationVariant::Scale(s)))
            .collect()
    }
}

/// Maximum correlation across brightness, rotation and scale variants
#[derive(Debug, Clone)]
pub struct AugmentationMethod {
    variants: Vec<AugmentationVariant>,
}

impl AugmentationMethod {
    pub fn new() -> Self {
        Self {
            variants: AugmentationVariant::all(),
        }
    }

    pub fn compare(&self, a: &GrayImage, b: &GrayImage) -> MethodOutcome {
        let mut best: Option<f64> = None;

        for variant in &self.variants {
            let perturbed = apply_variant(b, *variant, a.dimensions())?;
            if let Some(correlation) = max_normalized_correlation(a, &perturbed) {
                best = Some(best.map_or(correlation, |current| current.max(correlation)));
            }
        }

        unit_score(best.unwrap_or(0.0), "augmentation variants")
    }
}

impl Default for AugmentationMethod {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityMethod for AugmentationMethod {
    fn score(&self, a: &PreprocessedImage, b: &PreprocessedImage) -> MethodOutcome {
        self.compare(a.pixels(), b.pixels())
    }

    fn kind(&self) -> ScoringMethod {
        ScoringMethod::Augmentation
    }
}

/// Apply one variant to `image`; scale variants are fitted to `target` dimensions
pub fn apply_variant(
    image: &GrayImage,
    variant: AugmentationVariant,
    target: (u32, u32),
) -> Result<GrayImage, MethodError> {
    match variant {
        AugmentationVariant::Brightness(factor) => Ok(adjust_brightness(image, factor)),
        AugmentationVariant::Rotation(degrees) => Ok(rotate_about_center(
            image,
            degrees.to_radians(),
            Interpolation::Bilinear,
            Luma([0]),
        )),
        AugmentationVariant::Scale(factor) => {
            let width = (image.width() as f64 * factor) as u32;
            let height = (image.height() as f64 * factor) as u32;
            if width == 0 || height == 0 {
                return Err(MethodError::InsufficientData(format!(
                    "scale {} collapses the image",
                    factor
                )));
            }
            let scaled = resize_gray(image, width, height, ResizeFilter::Bilinear)
                .map_err(|e| MethodError::Numeric(e.to_string()))?;
            Ok(fit_to(&scaled, target))
        }
    }
}

/// Multiply every pixel, saturating at 255
pub fn adjust_brightness(image: &GrayImage, factor: f32) -> GrayImage {
    let mut adjusted = image.clone();
    for value in adjusted.iter_mut() {
        *value = (*value as f32 * factor).round().clamp(0.0, 255.0) as u8;
    }
    adjusted
}

/// Center `image` on a black canvas of `target` size, cropping any overflow
pub fn fit_to(image: &GrayImage, (width, height): (u32, u32)) -> GrayImage {
    let offset = |outer: u32, inner: u32| -> i64 { (outer as i64 - inner as i64) / 2 };
    let dx = offset(width, image.width());
    let dy = offset(height, image.height());

    ImageBuffer::from_fn(width, height, |x, y| {
        let sx = x as i64 - dx;
        let sy = y as i64 - dy;
        if sx >= 0 && sy >= 0 && (sx as u32) < image.width() && (sy as u32) < image.height() {
            *image.get_pixel(sx as u32, sy as u32)
        } else {
            Luma([0])
        }
    })
}
