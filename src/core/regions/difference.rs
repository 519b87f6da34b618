//! Per-region difference scoring.

use super::DetectionBox;
use crate::core::scoring::histogram_correlation;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Bins per color channel
pub const HISTOGRAM_BINS: usize = 50;
/// Weight of the mean pixel difference in the combined difference
pub const PIXEL_WEIGHT: f64 = 0.6;
/// Weight of the color histogram difference in the combined difference
pub const HISTOGRAM_WEIGHT: f64 = 0.4;

/// Difference scores for one detection box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionComparison {
    /// Position of the box in the input list
    pub index: usize,
    pub detection: DetectionBox,
    /// Mean absolute channel difference, scaled to [0, 1]
    pub pixel_difference: f64,
    /// One minus the color histogram correlation, in [0, 2]
    pub histogram_difference: f64,
    pub combined_difference: f64,
    /// Whether `combined_difference` exceeded the region threshold
    pub significant: bool,
}

/// Scores aligned region pairs
#[derive(Debug, Clone, Copy)]
pub struct RegionDifferencer {
    threshold: f64,
}

impl RegionDifferencer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// `(pixel_difference, histogram_difference)` for two equally sized regions
    pub fn differences(&self, target: &RgbImage, reference: &RgbImage) -> (f64, f64) {
        let pixel = mean_absolute_difference(target, reference) / 255.0;
        let histogram = 1.0 - histogram_correlation(&color_histogram(target), &color_histogram(reference));
        (pixel, histogram)
    }

    /// Full comparison record for one box
    pub fn compare(
        &self,
        index: usize,
        detection: &DetectionBox,
        target: &RgbImage,
        reference: &RgbImage,
    ) -> RegionComparison {
        let (pixel_difference, histogram_difference) = self.differences(target, reference);
        let combined_difference = PIXEL_WEIGHT * pixel_difference + HISTOGRAM_WEIGHT * histogram_difference;

        RegionComparison {
            index,
            detection: detection.clone(),
            pixel_difference,
            histogram_difference,
            combined_difference,
            significant: combined_difference > self.threshold,
        }
    }
}

impl Default for RegionDifferencer {
    fn default() -> Self {
        Self::new(0.3)
    }
}

/// Mean absolute difference over every channel of every pixel
pub fn mean_absolute_difference(a: &RgbImage, b: &RgbImage) -> f64 {
    let n = a.as_raw().len().min(b.as_raw().len());
    if n == 0 {
        return 0.0;
    }

    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| x.abs_diff(y) as u64)
        .sum();

    total as f64 / n as f64
}

/// Joint RGB histogram with [`HISTOGRAM_BINS`] bins per channel
pub fn color_histogram(image: &RgbImage) -> Vec<f64> {
    let bin = |v: u8| v as usize * HISTOGRAM_BINS / 256;
    let mut histogram = vec![0.0; HISTOGRAM_BINS * HISTOGRAM_BINS * HISTOGRAM_BINS];
    for pixel in image.pixels() {
        let [r, g, b] = pixel.0;
        histogram[(bin(r) * HISTOGRAM_BINS + bin(g)) * HISTOGRAM_BINS + bin(b)] += 1.0;
    }
    histogram
}
