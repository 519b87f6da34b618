//! # Feature Matching
//!
//! ORB keypoints matched across the pair, verified geometrically.
//!
//! ## Scoring
//! - fewer than [`MIN_DESCRIPTORS`] descriptors on either side: 0.0
//! - 2-NN search with a Lowe ratio test; fewer than [`MIN_GOOD_MATCHES`] survivors: 0.0
//! - at least [`MIN_HOMOGRAPHY_MATCHES`] survivors and a RANSAC fit:
//!   `0.7 * inlier_ratio + 0.3 * min(1, matches / 100)`
//! - otherwise `match_ratio * (1 - mean_distance / 100)`
//!
//! The descriptor guard also covers every input the 2-NN search rejects
//! (an empty query set or fewer than two train descriptors), so once it
//! passes the search cannot fail.

mod homography;
mod matcher;
mod orb;

pub use homography::{find_homography, project, HomographyFit, RansacConfig, INLIER_THRESHOLD};
pub use matcher::{knn2, mean_distance, ratio_test, Match, RATIO};
pub use orb::{Descriptor, Keypoint, OrbConfig, OrbDetector, OrbFeatures};

use super::traits::{unit_score, MethodOutcome, ScoringMethod, SimilarityMethod};
use crate::core::loader::PreprocessedImage;
use tracing::{debug, trace};

/// Descriptors required on each side before matching is attempted
pub const MIN_DESCRIPTORS: usize = 10;
/// Ratio-test survivors required for a non-zero score
pub const MIN_GOOD_MATCHES: usize = 10;
/// Ratio-test survivors required to attempt a homography
pub const MIN_HOMOGRAPHY_MATCHES: usize = 15;
/// Match count at which the count term saturates
const MATCH_SATURATION: f64 = 100.0;
/// Hamming distance at which the distance term reaches zero
const DISTANCE_SCALE: f64 = 100.0;

/// ORB feature matching method
#[derive(Debug, Clone, Default)]
pub struct FeatureMethod {
    detector: OrbDetector,
    ransac: RansacConfig,
}

impl FeatureMethod {
    /// Use a keypoint budget other than the default
    pub fn new(max_keypoints: usize) -> Self {
        Self {
            detector: OrbDetector::new(OrbConfig {
                max_features: max_keypoints,
                ..OrbConfig::default()
            }),
            ransac: RansacConfig::default(),
        }
    }

    pub fn compare(&self, a: &PreprocessedImage, b: &PreprocessedImage) -> MethodOutcome {
        let left = self.detector.detect(a.pixels());
        let right = self.detector.detect(b.pixels());
        debug!(left = left.len(), right = right.len(), "orb features detected");

        if left.len() < MIN_DESCRIPTORS || right.len() < MIN_DESCRIPTORS {
            return Ok(0.0);
        }

        let pairs = knn2(&left.descriptors, &right.descriptors)?;
        let score = self.score_ratio_matches(&left, &right, &ratio_test(&pairs, RATIO));

        unit_score(score, "feature matching")
    }

    fn score_ratio_matches(&self, left: &OrbFeatures, right: &OrbFeatures, good: &[Match]) -> f64 {
        if good.len() < MIN_GOOD_MATCHES {
            return 0.0;
        }

        if good.len() >= MIN_HOMOGRAPHY_MATCHES {
            let src: Vec<(f64, f64)> = good
                .iter()
                .map(|m| point(&left.keypoints[m.query]))
                .collect();
            let dst: Vec<(f64, f64)> = good
                .iter()
                .map(|m| point(&right.keypoints[m.train]))
                .collect();

            if let Some(fit) = find_homography(&src, &dst, &self.ransac) {
                trace!(inliers = fit.inliers, total = fit.total, "homography fitted");
                let count_term = (good.len() as f64 / MATCH_SATURATION).min(1.0);
                return 0.7 * fit.inlier_ratio() + 0.3 * count_term;
            }
        }

        let match_ratio = good.len() as f64 / left.len().min(right.len()) as f64;
        match_ratio * distance_quality(mean_distance(good))
    }
}

impl SimilarityMethod for FeatureMethod {
    fn score(&self, a: &PreprocessedImage, b: &PreprocessedImage) -> MethodOutcome {
        self.compare(a, b)
    }

    fn kind(&self) -> ScoringMethod {
        ScoringMethod::Features
    }
}

fn distance_quality(mean: f64) -> f64 {
    (1.0 - mean / DISTANCE_SCALE).clamp(0.0, 1.0)
}

fn point(keypoint: &Keypoint) -> (f64, f64) {
    (keypoint.x as f64, keypoint.y as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scoring::fixtures::{flat, textured_scene};
    use image::imageops;

    fn prepared(image: image::GrayImage) -> PreprocessedImage {
        PreprocessedImage::from_gray(image)
    }

    #[test]
    fn identical_images_score_high() {
        let image = prepared(textured_scene(256, 256, 21));
        let score = FeatureMethod::default().compare(&image, &image).unwrap();
        assert!(score >= 0.95, "score {}", score);
    }

    #[test]
    fn featureless_images_score_zero() {
        let blank = prepared(flat(256, 256, 128));
        let scene = prepared(textured_scene(256, 256, 22));
        let method = FeatureMethod::default();

        assert_eq!(method.compare(&blank, &blank).unwrap(), 0.0);
        assert_eq!(method.compare(&blank, &scene).unwrap(), 0.0);
    }

    #[test]
    fn shifted_scene_still_matches() {
        let scene = textured_scene(300, 300, 23);
        let a = prepared(imageops::crop_imm(&scene, 0, 0, 256, 256).to_image());
        let b = prepared(imageops::crop_imm(&scene, 12, 8, 256, 256).to_image());

        let score = FeatureMethod::default().compare(&a, &b).unwrap();
        assert!(score > 0.5, "score {}", score);
    }

    #[test]
    fn unrelated_scenes_score_lower_than_identical() {
        let a = prepared(textured_scene(256, 256, 24));
        let b = prepared(textured_scene(256, 256, 99));
        let method = FeatureMethod::default();

        let same = method.compare(&a, &a).unwrap();
        let different = method.compare(&a, &b).unwrap();
        assert!(different < same);
    }

    #[test]
    fn descriptor_guard_admits_only_searchable_sets() {
        let smallest = vec![Descriptor([1, 2, 3, 4]); MIN_DESCRIPTORS];
        assert!(knn2(&smallest, &smallest).is_ok());

        let sparse = prepared(textured_scene(256, 256, 25));
        let tiny = FeatureMethod::new(MIN_DESCRIPTORS - 1);
        assert_eq!(tiny.compare(&sparse, &sparse).unwrap(), 0.0);
    }

    #[test]
    fn distance_quality_is_clamped() {
        assert_eq!(distance_quality(0.0), 1.0);
        assert_eq!(distance_quality(150.0), 0.0);
    }
}
