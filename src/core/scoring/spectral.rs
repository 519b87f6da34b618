//! 2D FFT helpers built on rustfft.

use rustfft::num_complex::Complex;
use rustfft::{FftDirection, FftPlanner};

/// A row-major complex grid
#[derive(Debug, Clone)]
pub(crate) struct ComplexGrid {
    pub width: usize,
    pub height: usize,
    pub data: Vec<Complex<f64>>,
}

impl ComplexGrid {
    /// Zero-filled grid
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![Complex::new(0.0, 0.0); width * height],
        }
    }

    /// Copy real samples into the top-left corner of a `width`x`height` grid
    pub fn from_real(
        samples: &[f64],
        sample_width: usize,
        sample_height: usize,
        width: usize,
        height: usize,
    ) -> Self {
        let mut grid = Self::zeros(width, height);
        for y in 0..sample_height.min(height) {
            for x in 0..sample_width.min(width) {
                grid.data[y * width + x] = Complex::new(samples[y * sample_width + x], 0.0);
            }
        }
        grid
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// In-place forward transform
    pub fn forward(&mut self, planner: &mut FftPlanner<f64>) {
        self.transform(planner, FftDirection::Forward);
    }

    /// In-place inverse transform, normalized by the element count
    pub fn inverse(&mut self, planner: &mut FftPlanner<f64>) {
        self.transform(planner, FftDirection::Inverse);
        let scale = 1.0 / self.len() as f64;
        for value in &mut self.data {
            *value *= scale;
        }
    }

    fn transform(&mut self, planner: &mut FftPlanner<f64>, direction: FftDirection) {
        if self.data.is_empty() {
            return;
        }

        // Rows are contiguous: one call covers every row
        planner.plan_fft(self.width, direction).process(&mut self.data);

        let mut columns = transpose(&self.data, self.width, self.height);
        planner.plan_fft(self.height, direction).process(&mut columns);
        self.data = transpose(&columns, self.height, self.width);
    }
}

fn transpose(data: &[Complex<f64>], width: usize, height: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::new(0.0, 0.0); data.len()];
    for y in 0..height {
        for x in 0..width {
            out[x * height + y] = data[y * width + x];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_then_inverse_is_identity() {
        let samples: Vec<f64> = (0..48).map(|i| (i * 7 % 13) as f64).collect();
        let mut grid = ComplexGrid::from_real(&samples, 8, 6, 8, 6);
        let mut planner = FftPlanner::new();

        grid.forward(&mut planner);
        grid.inverse(&mut planner);

        for (value, expected) in grid.data.iter().zip(&samples) {
            assert!((value.re - expected).abs() < 1e-9);
            assert!(value.im.abs() < 1e-9);
        }
    }

    #[test]
    fn dc_term_is_sum() {
        let samples = vec![2.0; 20];
        let mut grid = ComplexGrid::from_real(&samples, 5, 4, 5, 4);
        grid.forward(&mut FftPlanner::new());
        assert!((grid.data[0].re - 40.0).abs() < 1e-9);
    }

    #[test]
    fn padding_places_samples_top_left() {
        let grid = ComplexGrid::from_real(&[1.0, 2.0, 3.0, 4.0], 2, 2, 4, 3);
        assert_eq!(grid.data[0].re, 1.0);
        assert_eq!(grid.data[1].re, 2.0);
        assert_eq!(grid.data[4].re, 3.0);
        assert_eq!(grid.data[5].re, 4.0);
        assert_eq!(grid.data[2].re, 0.0);
    }
}
