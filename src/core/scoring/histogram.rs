//! Histogram comparison.
//!
//! Compares 256-bin and coarse 32-bin intensity histograms. The coarse
//! histogram dampens sensitivity to small brightness shifts.
//!
//! Score = 0.4·corr256 + 0.2·(1 / (1 + χ²)) + 0.2·intersection + 0.2·corr32

use super::traits::{unit_score, MethodOutcome, ScoringMethod, SimilarityMethod};
use crate::core::loader::PreprocessedImage;
use image::GrayImage;

const FINE_BINS: usize = 256;
const COARSE_BINS: usize = 32;

/// Intensity histogram comparison
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramMethod;

impl HistogramMethod {
    pub fn new() -> Self {
        Self
    }

    /// Compare two grayscale images of any size
    pub fn compare(&self, a: &GrayImage, b: &GrayImage) -> MethodOutcome {
        let fine_a = normalize_min_max(&intensity_histogram(a, FINE_BINS));
        let fine_b = normalize_min_max(&intensity_histogram(b, FINE_BINS));
        let coarse_a = normalize_min_max(&intensity_histogram(a, COARSE_BINS));
        let coarse_b = normalize_min_max(&intensity_histogram(b, COARSE_BINS));

        let fine_corr = correlation(&fine_a, &fine_b);
        let chi_term = 1.0 / (1.0 + chi_square(&fine_a, &fine_b));
        let overlap = intersection(&fine_a, &fine_b);
        let coarse_corr = correlation(&coarse_a, &coarse_b);

        let score = fine_corr * 0.4 + chi_term * 0.2 + overlap * 0.2 + coarse_corr * 0.2;

        unit_score(score, "histogram comparison")
    }
}

impl SimilarityMethod for HistogramMethod {
    fn score(&self, a: &PreprocessedImage, b: &PreprocessedImage) -> MethodOutcome {
        self.compare(a.pixels(), b.pixels())
    }

    fn kind(&self) -> ScoringMethod {
        ScoringMethod::Histogram
    }
}

/// Pixel counts per intensity bin
pub fn intensity_histogram(image: &GrayImage, bins: usize) -> Vec<f64> {
    let mut histogram = vec![0.0; bins];
    for &value in image.as_raw() {
        histogram[value as usize * bins / 256] += 1.0;
    }
    histogram
}

/// Rescale so the smallest bin is 0 and the largest is 1; flat histograms become all zeros
pub fn normalize_min_max(histogram: &[f64]) -> Vec<f64> {
    let min = histogram.iter().copied().fold(f64::INFINITY, f64::min);
    let max = histogram.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if !range.is_finite() || range <= f64::EPSILON {
        return vec![0.0; histogram.len()];
    }

    histogram.iter().map(|v| (v - min) / range).collect()
}

/// Pearson correlation between two histograms.
///
/// When either histogram has no variance the correlation is undefined; equal
/// histograms then count as fully correlated and unequal ones as uncorrelated.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }

    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        covariance += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denominator = (var_a * var_b).sqrt();
    if denominator > f64::EPSILON {
        covariance / denominator
    } else if a == b {
        1.0
    } else {
        0.0
    }
}

/// Symmetric chi-square distance: Σ (a - b)² / (a + b)
pub fn chi_square(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .filter(|(x, y)| *x + *y > f64::EPSILON)
        .map(|(x, y)| (x - y) * (x - y) / (x + y))
        .sum()
}

/// Intersection of the two histograms rescaled to unit mass, in [0, 1]
pub fn intersection(a: &[f64], b: &[f64]) -> f64 {
    let mass_a: f64 = a.iter().sum();
    let mass_b: f64 = b.iter().sum();

    if mass_a <= f64::EPSILON || mass_b <= f64::EPSILON {
        return if mass_a <= f64::EPSILON && mass_b <= f64::EPSILON {
            1.0
        } else {
            0.0
        };
    }

    a.iter()
        .zip(b)
        .map(|(x, y)| (x / mass_a).min(y / mass_b))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scoring::fixtures::{flat, textured_scene};

    #[test]
    fn identical_images_score_one() {
        let image = textured_scene(128, 128, 1);
        let score = HistogramMethod.compare(&image, &image).unwrap();
        assert!(score >= 0.99, "score = {}", score);
    }

    #[test]
    fn comparison_is_symmetric() {
        let a = textured_scene(96, 96, 1);
        let b = textured_scene(96, 96, 2);

        let ab = HistogramMethod.compare(&a, &b).unwrap();
        let ba = HistogramMethod.compare(&b, &a).unwrap();

        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn black_and_white_score_near_zero() {
        let black = flat(64, 64, 0);
        let white = flat(64, 64, 255);

        let score = HistogramMethod.compare(&black, &white).unwrap();
        assert!(score < 0.15, "score = {}", score);
    }

    #[test]
    fn coarse_bins_group_neighbouring_levels() {
        let histogram = intensity_histogram(&flat(4, 4, 7), COARSE_BINS);
        assert_eq!(histogram[0], 16.0);
    }

    #[test]
    fn min_max_normalization_spans_unit_range() {
        let normalized = normalize_min_max(&[2.0, 4.0, 6.0]);
        assert_eq!(normalized, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn intersection_of_disjoint_histograms_is_zero() {
        assert_eq!(intersection(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((intersection(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-12);
    }
}
