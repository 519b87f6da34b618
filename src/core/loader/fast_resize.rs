//! Fast SIMD-accelerated image resizing.
//!
//! Uses fast_image_resize crate which is 5-14x faster than image crate's resize.
//! Automatically uses AVX2/NEON SIMD when available.

use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{GrayImage, ImageBuffer, RgbImage};
use thiserror::Error;

/// Resize failure, converted by callers into their own error kind
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ScaleError(String);

/// Interpolation used when resizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeFilter {
    /// Box filter: averages the covered source area (used for downsampling)
    Area,
    /// Bilinear interpolation (used when aligning regions)
    Bilinear,
}

impl ResizeFilter {
    fn algorithm(self) -> ResizeAlg {
        match self {
            ResizeFilter::Area => ResizeAlg::Convolution(FilterType::Box),
            ResizeFilter::Bilinear => ResizeAlg::Convolution(FilterType::Bilinear),
        }
    }
}

/// Fast image resizer using SIMD acceleration
pub struct FastResizer {
    resizer: Resizer,
}

impl FastResizer {
    /// Create a new fast resizer
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Resize a single-channel image
    pub fn resize_gray(
        &mut self,
        image: &GrayImage,
        width: u32,
        height: u32,
        filter: ResizeFilter,
    ) -> Result<GrayImage, ScaleError> {
        let raw = self.resize_raw(
            image.as_raw().clone(),
            image.dimensions(),
            (width, height),
            PixelType::U8,
            filter,
        )?;
        ImageBuffer::from_raw(width, height, raw)
            .ok_or_else(|| ScaleError("Failed to create result buffer".to_string()))
    }

    /// Resize a three-channel image
    pub fn resize_rgb(
        &mut self,
        image: &RgbImage,
        width: u32,
        height: u32,
        filter: ResizeFilter,
    ) -> Result<RgbImage, ScaleError> {
        let raw = self.resize_raw(
            image.as_raw().clone(),
            image.dimensions(),
            (width, height),
            PixelType::U8x3,
            filter,
        )?;
        ImageBuffer::from_raw(width, height, raw)
            .ok_or_else(|| ScaleError("Failed to create result buffer".to_string()))
    }

    fn resize_raw(
        &mut self,
        pixels: Vec<u8>,
        (src_width, src_height): (u32, u32),
        (width, height): (u32, u32),
        pixel_type: PixelType,
        filter: ResizeFilter,
    ) -> Result<Vec<u8>, ScaleError> {
        if src_width == 0 || src_height == 0 {
            return Err(ScaleError("Invalid source dimensions".to_string()));
        }

        if width == 0 || height == 0 {
            return Err(ScaleError("Invalid destination dimensions".to_string()));
        }

        if (src_width, src_height) == (width, height) {
            return Ok(pixels);
        }

        let src_image = Image::from_vec_u8(src_width, src_height, pixels, pixel_type)
            .map_err(|e| ScaleError(format!("Failed to create source image: {}", e)))?;

        let mut dst_image = Image::new(width, height, pixel_type);

        let options = ResizeOptions::new().resize_alg(filter.algorithm());

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| ScaleError(format!("Resize failed: {}", e)))?;

        Ok(dst_image.into_vec())
    }
}

impl Default for FastResizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function for one-off grayscale resizing
pub fn resize_gray(
    image: &GrayImage,
    width: u32,
    height: u32,
    filter: ResizeFilter,
) -> Result<GrayImage, ScaleError> {
    FastResizer::new().resize_gray(image, width, height, filter)
}

/// Convenience function for one-off color resizing
pub fn resize_rgb(
    image: &RgbImage,
    width: u32,
    height: u32,
    filter: ResizeFilter,
) -> Result<RgbImage, ScaleError> {
    FastResizer::new().resize_rgb(image, width, height, filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn gradient(width: u32, height: u32) -> GrayImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            Luma([((x + y) * 255 / (width + height).max(1)) as u8])
        })
    }

    #[test]
    fn resize_produces_correct_dimensions() {
        let resized = resize_gray(&gradient(100, 100), 64, 64, ResizeFilter::Area).unwrap();
        assert_eq!(resized.dimensions(), (64, 64));
    }

    #[test]
    fn resize_non_square_image() {
        let resized = resize_gray(&gradient(200, 100), 90, 80, ResizeFilter::Bilinear).unwrap();
        assert_eq!(resized.dimensions(), (90, 80));
    }

    #[test]
    fn same_size_is_a_copy() {
        let image = gradient(32, 32);
        let resized = resize_gray(&image, 32, 32, ResizeFilter::Area).unwrap();
        assert_eq!(resized, image);
    }

    #[test]
    fn area_filter_preserves_flat_color() {
        let image: RgbImage = ImageBuffer::from_pixel(40, 30, Rgb([10, 200, 90]));
        let resized = resize_rgb(&image, 17, 11, ResizeFilter::Area).unwrap();
        assert!(resized.pixels().all(|p| *p == Rgb([10, 200, 90])));
    }

    #[test]
    fn zero_destination_is_rejected() {
        assert!(resize_gray(&gradient(8, 8), 0, 8, ResizeFilter::Area).is_err());
    }

    #[test]
    fn resizer_reuse() {
        let mut resizer = FastResizer::new();
        let image = gradient(100, 100);

        let first = resizer.resize_gray(&image, 8, 8, ResizeFilter::Area).unwrap();
        let second = resizer.resize_gray(&image, 8, 8, ResizeFilter::Area).unwrap();

        assert_eq!(first, second);
    }
}
