//! RANSAC homography estimation over matched keypoint pairs.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

/// Reprojection error, in pixels, below which a pair is an inlier
pub const INLIER_THRESHOLD: f64 = 5.0;

const SAMPLE_SIZE: usize = 4;
const RANSAC_SEED: u64 = 0x4A11_0C8E;
/// Twice the triangle area below which three points count as collinear
const COLLINEAR_EPSILON: f64 = 1e-3;

/// RANSAC parameters
#[derive(Debug, Clone, Copy)]
pub struct RansacConfig {
    pub threshold: f64,
    pub max_iterations: usize,
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            threshold: INLIER_THRESHOLD,
            max_iterations: 2000,
            confidence: 0.995,
            seed: RANSAC_SEED,
        }
    }
}

/// Best model found and its support
#[derive(Debug, Clone)]
pub struct HomographyFit {
    pub matrix: Matrix3<f64>,
    pub inliers: usize,
    pub total: usize,
}

impl HomographyFit {
    pub fn inlier_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.inliers as f64 / self.total as f64
        }
    }
}

type Point = (f64, f64);

/// Estimate the homography mapping `src` onto `dst`.
///
/// Returns `None` when fewer than four pairs are given or no
/// non-degenerate sample yields a model.
pub fn find_homography(src: &[Point], dst: &[Point], config: &RansacConfig) -> Option<HomographyFit> {
    let total = src.len().min(dst.len());
    if total < SAMPLE_SIZE {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<HomographyFit> = None;
    let mut budget = config.max_iterations;
    let mut iteration = 0;

    while iteration < budget {
        iteration += 1;
        let picked = sample(&mut rng, total, SAMPLE_SIZE).into_vec();
        let s: Vec<Point> = picked.iter().map(|&i| src[i]).collect();
        let d: Vec<Point> = picked.iter().map(|&i| dst[i]).collect();

        if degenerate(&s) || degenerate(&d) {
            continue;
        }
        let Some(matrix) = solve_four_point(&s, &d) else {
            continue;
        };

        let inliers = count_inliers(&matrix, &src[..total], &dst[..total], config.threshold);
        if best.as_ref().map_or(true, |b| inliers > b.inliers) {
            best = Some(HomographyFit { matrix, inliers, total });
            budget = budget.min(adaptive_iterations(inliers, total, config.confidence));
            if inliers == total {
                break;
            }
        }
    }

    best
}

/// Iterations needed to draw one all-inlier sample with the given confidence
fn adaptive_iterations(inliers: usize, total: usize, confidence: f64) -> usize {
    let w = inliers as f64 / total as f64;
    let all_inliers = w.powi(SAMPLE_SIZE as i32);
    if all_inliers <= f64::EPSILON {
        return usize::MAX;
    }
    if all_inliers >= 1.0 - f64::EPSILON {
        return 0;
    }
    let needed = (1.0 - confidence).ln() / (1.0 - all_inliers).ln();
    if needed.is_finite() {
        needed.ceil().max(1.0) as usize
    } else {
        usize::MAX
    }
}

fn degenerate(points: &[Point]) -> bool {
    for i in 0..points.len() {
        for j in i + 1..points.len() {
            for k in j + 1..points.len() {
                let (a, b, c) = (points[i], points[j], points[k]);
                let area = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
                if area.abs() < COLLINEAR_EPSILON {
                    return true;
                }
            }
        }
    }
    false
}

/// Direct linear transform with h33 fixed to 1
fn solve_four_point(src: &[Point], dst: &[Point]) -> Option<Matrix3<f64>> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for i in 0..SAMPLE_SIZE {
        let (x, y) = src[i];
        let (u, v) = dst[i];
        let r = 2 * i;
        a.set_row(r, &SMatrix::<f64, 1, 8>::from_row_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y]));
        a.set_row(r + 1, &SMatrix::<f64, 1, 8>::from_row_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y]));
        b[r] = u;
        b[r + 1] = v;
    }

    let h = a.lu().solve(&b)?;
    if h.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0))
}

/// Project a point through the homography
pub fn project(matrix: &Matrix3<f64>, point: Point) -> Option<Point> {
    let p = matrix * Vector3::new(point.0, point.1, 1.0);
    if p.z.abs() < f64::EPSILON {
        return None;
    }
    Some((p.x / p.z, p.y / p.z))
}

fn count_inliers(matrix: &Matrix3<f64>, src: &[Point], dst: &[Point], threshold: f64) -> usize {
    let threshold_sq = threshold * threshold;
    src.iter()
        .zip(dst)
        .filter(|(s, d)| match project(matrix, **s) {
            Some((x, y)) => (x - d.0).powi(2) + (y - d.1).powi(2) <= threshold_sq,
            None => false,
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<Point> {
        (0..6)
            .flat_map(|i| (0..6).map(move |j| (i as f64 * 37.0 + 3.0, j as f64 * 29.0 + 11.0)))
            .collect()
    }

    #[test]
    fn recovers_translation() {
        let src = grid();
        let dst: Vec<Point> = src.iter().map(|(x, y)| (x + 12.0, y - 7.0)).collect();
        let fit = find_homography(&src, &dst, &RansacConfig::default()).unwrap();

        assert_eq!(fit.inliers, src.len());
        let (x, y) = project(&fit.matrix, (100.0, 100.0)).unwrap();
        assert!((x - 112.0).abs() < 1e-6 && (y - 93.0).abs() < 1e-6);
    }

    #[test]
    fn tolerates_outliers() {
        let src = grid();
        let mut dst: Vec<Point> = src.iter().map(|(x, y)| (x * 1.1, y * 0.9 + 4.0)).collect();
        for (i, point) in dst.iter_mut().enumerate().take(8) {
            *point = (500.0 - i as f64 * 61.0, 13.0 * i as f64);
        }
        let fit = find_homography(&src, &dst, &RansacConfig::default()).unwrap();

        assert!(fit.inliers >= src.len() - 8);
        assert!(fit.inlier_ratio() > 0.7);
    }

    #[test]
    fn too_few_points() {
        let src = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        assert!(find_homography(&src, &src, &RansacConfig::default()).is_none());
    }

    #[test]
    fn collinear_points_give_no_model() {
        let src: Vec<Point> = (0..10).map(|i| (i as f64, 2.0 * i as f64)).collect();
        assert!(find_homography(&src, &src, &RansacConfig::default()).is_none());
    }

    #[test]
    fn seeded_search_is_reproducible() {
        let src = grid();
        let mut dst = src.clone();
        dst[0] = (400.0, 400.0);
        let a = find_homography(&src, &dst, &RansacConfig::default()).unwrap();
        let b = find_homography(&src, &dst, &RansacConfig::default()).unwrap();
        assert_eq!(a.inliers, b.inliers);
        assert_eq!(a.matrix, b.matrix);
    }
}
