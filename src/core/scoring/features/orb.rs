//! ORB keypoints and descriptors.
//!
//! FAST-9 corners are detected on every level of a scale pyramid, thinned
//! with non-maximum suppression, oriented by their intensity centroid and
//! described by 256 rotated binary intensity tests (rBRIEF).

use crate::core::loader::{resize_gray, ResizeFilter};
use image::GrayImage;
use imageproc::corners::corners_fast9;
use imageproc::filter::gaussian_blur_f32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

/// Radius of the orientation patch
const HALF_PATCH: i32 = 15;
/// Sampling pairs are drawn from this square half-width
const PATTERN_EXTENT: i32 = 13;
/// Fixed seed so the sampling pattern is identical on every run
const PATTERN_SEED: u64 = 0x5EED_0B0B;
/// Number of binary tests per descriptor
const DESCRIPTOR_BITS: usize = 256;

/// Detector parameters
#[derive(Debug, Clone, Copy)]
pub struct OrbConfig {
    /// Keypoint budget across all pyramid levels
    pub max_features: usize,
    /// Downscale factor between consecutive levels
    pub scale_factor: f32,
    /// Number of pyramid levels
    pub levels: usize,
    /// FAST intensity threshold
    pub fast_threshold: u8,
    /// Pixels near the border with no keypoints
    pub edge: u32,
    /// Minimum spacing between kept corners on one level
    pub nms_radius: u32,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            max_features: 2000,
            scale_factor: 1.2,
            levels: 8,
            fast_threshold: 20,
            edge: 31,
            nms_radius: 3,
        }
    }
}

/// An oriented keypoint in level-0 pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Orientation in radians
    pub angle: f32,
    /// FAST corner score
    pub response: f32,
    pub level: usize,
}

/// 256-bit binary descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Descriptor(pub [u64; 4]);

impl Descriptor {
    /// Number of differing bits
    pub fn hamming(&self, other: &Descriptor) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    fn set_bit(&mut self, bit: usize) {
        self.0[bit / 64] |= 1u64 << (bit % 64);
    }
}

/// Keypoints with their descriptors, index-aligned
#[derive(Debug, Clone, Default)]
pub struct OrbFeatures {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl OrbFeatures {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// ORB detector with a fixed sampling pattern
#[derive(Debug, Clone)]
pub struct OrbDetector {
    config: OrbConfig,
    pattern: Vec<[i32; 4]>,
    circle_extent: Vec<i32>,
}

impl OrbDetector {
    pub fn new(config: OrbConfig) -> Self {
        Self {
            config,
            pattern: sampling_pattern(),
            circle_extent: circle_extent(HALF_PATCH),
        }
    }

    pub fn config(&self) -> &OrbConfig {
        &self.config
    }

    /// Detect and describe up to `max_features` keypoints
    pub fn detect(&self, image: &GrayImage) -> OrbFeatures {
        let mut features = OrbFeatures::default();
        let quotas = level_quotas(&self.config);
        let mut level_image = image.clone();
        let mut scale = 1.0f32;

        for (level, quota) in quotas.into_iter().enumerate() {
            if level > 0 {
                scale *= self.config.scale_factor;
                let width = (image.width() as f32 / scale).round() as u32;
                let height = (image.height() as f32 / scale).round() as u32;
                if width <= 2 * self.config.edge || height <= 2 * self.config.edge {
                    break;
                }
                level_image = match resize_gray(image, width, height, ResizeFilter::Area) {
                    Ok(resized) => resized,
                    Err(_) => break,
                };
            }

            let corners = self.level_corners(&level_image, quota);
            if corners.is_empty() {
                continue;
            }

            let blurred = gaussian_blur_f32(&level_image, 2.0);
            for (x, y, response) in corners {
                let angle = self.orientation(&level_image, x, y);
                features.descriptors.push(self.describe(&blurred, x, y, angle));
                features.keypoints.push(Keypoint {
                    x: x as f32 * scale,
                    y: y as f32 * scale,
                    angle,
                    response,
                    level,
                });
            }

            trace!(level, total = features.len(), "orb level processed");
        }

        features
    }

    /// Strongest well-separated corners away from the border
    fn level_corners(&self, image: &GrayImage, quota: usize) -> Vec<(u32, u32, f32)> {
        if quota == 0 {
            return Vec::new();
        }

        let (width, height) = image.dimensions();
        let edge = self.config.edge;
        let mut corners: Vec<(u32, u32, f32)> = corners_fast9(image, self.config.fast_threshold)
            .into_iter()
            .filter(|c| c.x >= edge && c.y >= edge && c.x < width.saturating_sub(edge) && c.y < height.saturating_sub(edge))
            .map(|c| (c.x, c.y, c.score))
            .collect();

        corners.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
                .then(a.0.cmp(&b.0))
        });

        let radius = self.config.nms_radius as i64;
        let mut occupied = vec![false; (width * height) as usize];
        let mut kept = Vec::with_capacity(quota.min(corners.len()));

        for (x, y, score) in corners {
            if occupied[(y * width + x) as usize] {
                continue;
            }
            kept.push((x, y, score));
            if kept.len() == quota {
                break;
            }
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx >= 0 && ny >= 0 && nx < width as i64 && ny < height as i64 {
                        occupied[(ny as u32 * width + nx as u32) as usize] = true;
                    }
                }
            }
        }

        kept
    }

    /// Intensity-centroid orientation over a circular patch
    fn orientation(&self, image: &GrayImage, x: u32, y: u32) -> f32 {
        let mut m01 = 0.0f64;
        let mut m10 = 0.0f64;

        for v in -HALF_PATCH..=HALF_PATCH {
            let extent = self.circle_extent[v.unsigned_abs() as usize];
            for u in -extent..=extent {
                let value = sample(image, x as i32 + u, y as i32 + v) as f64;
                m10 += u as f64 * value;
                m01 += v as f64 * value;
            }
        }

        m01.atan2(m10) as f32
    }

    fn describe(&self, blurred: &GrayImage, x: u32, y: u32, angle: f32) -> Descriptor {
        let (sin, cos) = angle.sin_cos();
        let rotate = |px: i32, py: i32| -> (i32, i32) {
            let rx = (cos * px as f32 - sin * py as f32).round() as i32;
            let ry = (sin * px as f32 + cos * py as f32).round() as i32;
            (x as i32 + rx, y as i32 + ry)
        };

        let mut descriptor = Descriptor::default();
        for (bit, pair) in self.pattern.iter().enumerate() {
            let (ax, ay) = rotate(pair[0], pair[1]);
            let (bx, by) = rotate(pair[2], pair[3]);
            if sample(blurred, ax, ay) < sample(blurred, bx, by) {
                descriptor.set_bit(bit);
            }
        }
        descriptor
    }
}

impl Default for OrbDetector {
    fn default() -> Self {
        Self::new(OrbConfig::default())
    }
}

/// Keypoints allotted to each level, shrinking geometrically with scale
fn level_quotas(config: &OrbConfig) -> Vec<usize> {
    let levels = config.levels.max(1);
    let factor = 1.0 / config.scale_factor as f64;
    let total = config.max_features;

    let mut per_level = if (factor - 1.0).abs() < f64::EPSILON {
        total as f64 / levels as f64
    } else {
        total as f64 * (1.0 - factor) / (1.0 - factor.powi(levels as i32))
    };

    let mut quotas = Vec::with_capacity(levels);
    let mut assigned = 0usize;
    for _ in 0..levels - 1 {
        let quota = (per_level.round() as usize).min(total - assigned);
        quotas.push(quota);
        assigned += quota;
        per_level *= factor;
    }
    quotas.push(total - assigned);
    quotas
}

/// Half-width of the circular patch for each row offset
fn circle_extent(radius: i32) -> Vec<i32> {
    (0..=radius)
        .map(|v| (((radius * radius - v * v) as f64).sqrt()).floor() as i32)
        .collect()
}

/// Point pairs for the binary tests
fn sampling_pattern() -> Vec<[i32; 4]> {
    let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
    let mut pattern = Vec::with_capacity(DESCRIPTOR_BITS);
    while pattern.len() < DESCRIPTOR_BITS {
        let pair = [
            rng.gen_range(-PATTERN_EXTENT..=PATTERN_EXTENT),
            rng.gen_range(-PATTERN_EXTENT..=PATTERN_EXTENT),
            rng.gen_range(-PATTERN_EXTENT..=PATTERN_EXTENT),
            rng.gen_range(-PATTERN_EXTENT..=PATTERN_EXTENT),
        ];
        if pair[0] != pair[2] || pair[1] != pair[3] {
            pattern.push(pair);
        }
    }
    pattern
}

fn sample(image: &GrayImage, x: i32, y: i32) -> u8 {
    let x = x.clamp(0, image.width() as i32 - 1) as u32;
    let y = y.clamp(0, image.height() as i32 - 1) as u32;
    image.get_pixel(x, y)[0]
}
