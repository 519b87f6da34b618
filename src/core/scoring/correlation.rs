//! Normalized cross-correlation (correlation coefficient) between grayscale images.
//!
//! Equal-sized inputs reduce to a single Pearson coefficient. A smaller
//! template is slid over the image with an FFT cross-correlation for the
//! numerators and integral images for the per-window variances.

use super::spectral::ComplexGrid;
use image::GrayImage;
use rustfft::FftPlanner;

/// Denominators below this are treated as flat (zero-variance) content
const FLAT_EPSILON: f64 = 1e-9;

/// Pearson correlation of two equally sized images; 0.0 when either is flat
pub fn pearson(a: &GrayImage, b: &GrayImage) -> Option<f64> {
    if a.dimensions() != b.dimensions() || a.as_raw().is_empty() {
        return None;
    }

    let n = a.as_raw().len() as f64;
    let mean_a = a.as_raw().iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.as_raw().iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&pa, &pb) in a.as_raw().iter().zip(b.as_raw()) {
        let da = pa as f64 - mean_a;
        let db = pb as f64 - mean_b;
        covariance += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    Some(coefficient(covariance, var_a * var_b))
}

/// Best correlation coefficient of `template` over every placement inside `image`.
///
/// Returns `None` when the template does not fit.
pub fn max_normalized_correlation(image: &GrayImage, template: &GrayImage) -> Option<f64> {
    let (width, height) = image.dimensions();
    let (t_width, t_height) = template.dimensions();

    if t_width == 0 || t_height == 0 || t_width > width || t_height > height {
        return None;
    }

    if (t_width, t_height) == (width, height) {
        return pearson(image, template);
    }

    let (w, h) = (width as usize, height as usize);
    let (tw, th) = (t_width as usize, t_height as usize);
    let n = (tw * th) as f64;

    let t_mean = template.as_raw().iter().map(|&v| v as f64).sum::<f64>() / n;
    let zero_mean: Vec<f64> = template.as_raw().iter().map(|&v| v as f64 - t_mean).collect();
    let t_energy: f64 = zero_mean.iter().map(|v| v * v).sum();

    let samples: Vec<f64> = image.as_raw().iter().map(|&v| v as f64).collect();

    // Circular correlation at the image size never wraps for valid placements
    let mut planner = FftPlanner::new();
    let mut image_grid = ComplexGrid::from_real(&samples, w, h, w, h);
    let mut template_grid = ComplexGrid::from_real(&zero_mean, tw, th, w, h);
    image_grid.forward(&mut planner);
    template_grid.forward(&mut planner);
    for (value, t) in image_grid.data.iter_mut().zip(&template_grid.data) {
        *value *= t.conj();
    }
    image_grid.inverse(&mut planner);

    let integral = IntegralImage::new(image);
    let mut best = f64::NEG_INFINITY;
    for y in 0..=(h - th) {
        for x in 0..=(w - tw) {
            let numerator = image_grid.data[y * w + x].re;
            let (sum, sum_sq) = integral.window(x, y, tw, th);
            let window_energy = (sum_sq - sum * sum / n).max(0.0);
            best = best.max(coefficient(numerator, t_energy * window_energy));
        }
    }

    Some(best)
}

fn coefficient(numerator: f64, denominator_squared: f64) -> f64 {
    let denominator = denominator_squared.max(0.0).sqrt();
    if denominator <= FLAT_EPSILON {
        0.0
    } else {
        (numerator / denominator).clamp(-1.0, 1.0)
    }
}

/// Summed-area tables of pixel values and squared pixel values
struct IntegralImage {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl IntegralImage {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sum_sq = vec![0u64; stride * (h + 1)];

        for y in 0..h {
            let mut row = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w {
                let v = image.as_raw()[y * w + x] as u64;
                row += v;
                row_sq += v * v;
                sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row;
                sum_sq[(y + 1) * stride + x + 1] = sum_sq[y * stride + x + 1] + row_sq;
            }
        }

        Self { stride, sum, sum_sq }
    }

    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let at = |table: &[u64], xx: usize, yy: usize| table[yy * self.stride + xx];
        let area = |table: &[u64]| {
            at(table, x + w, y + h) + at(table, x, y) - at(table, x + w, y) - at(table, x, y + h)
        };
        (area(&self.sum) as f64, area(&self.sum_sq) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    fn pattern(width: u32, height: u32) -> GrayImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            Luma([((x * 37 + y * 91 + (x * y) % 17) % 256) as u8])
        })
    }

    #[test]
    fn pearson_of_identical_is_one() {
        let image = pattern(32, 32);
        assert!((pearson(&image, &image).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_of_inverted_is_minus_one() {
        let image = pattern(32, 32);
        let mut inverted = image.clone();
        for v in inverted.iter_mut() {
            *v = 255 - *v;
        }
        assert!((pearson(&image, &inverted).unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn flat_images_correlate_to_zero() {
        let flat: GrayImage = ImageBuffer::from_pixel(16, 16, Luma([200]));
        assert_eq!(pearson(&flat, &flat), Some(0.0));
    }

    #[test]
    fn finds_embedded_template() {
        let image = pattern(64, 48);
        let template = image::imageops::crop_imm(&image, 20, 10, 24, 16).to_image();

        let best = max_normalized_correlation(&image, &template).unwrap();
        assert!((best - 1.0).abs() < 1e-6, "best = {}", best);
    }

    #[test]
    fn oversized_template_is_rejected() {
        let image = pattern(16, 16);
        let template = pattern(20, 8);
        assert!(max_normalized_correlation(&image, &template).is_none());
    }

    #[test]
    fn window_sums_match_direct_sum() {
        let image = pattern(10, 7);
        let integral = IntegralImage::new(&image);
        let (sum, _) = integral.window(2, 3, 4, 3);

        let mut direct = 0u64;
        for y in 3..6 {
            for x in 2..6 {
                direct += image.get_pixel(x, y)[0] as u64;
            }
        }
        assert_eq!(sum as u64, direct);
    }
}
