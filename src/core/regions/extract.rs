//! Cutting aligned region pairs out of the reference and target captures.

use super::DetectionBox;
use crate::core::loader::{resize_rgb, ResizeFilter};
use crate::error::RegionError;
use image::{imageops, RgbImage};
use tracing::trace;

/// Integer rectangle inside an image, `x2`/`y2` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Target region and the reference region resized to match it
#[derive(Debug, Clone)]
pub struct RegionPair {
    pub target: RgbImage,
    pub reference: RgbImage,
    /// Rectangle in the target image
    pub rect: PixelRect,
}

/// Clip `bbox` to a `width` x `height` image, truncating fractional coordinates
pub fn clip_box(bbox: [f32; 4], width: u32, height: u32) -> Result<PixelRect, RegionError> {
    if bbox.iter().any(|v| !v.is_finite()) {
        return Err(RegionError::InvalidCoordinates { bbox });
    }

    let clamp = |value: f32, limit: u32| -> u32 { (value.max(0.0) as u32).min(limit) };
    let x1 = clamp(bbox[0], width);
    let y1 = clamp(bbox[1], height);
    let x2 = clamp(bbox[2], width);
    let y2 = clamp(bbox[3], height);

    if x2 <= x1 || y2 <= y1 {
        return Err(RegionError::EmptyRegion { bbox, width, height });
    }

    Ok(PixelRect {
        x: x1,
        y: y1,
        width: x2 - x1,
        height: y2 - y1,
    })
}

/// Extracts size-aligned region pairs for detection boxes
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionExtractor;

impl RegionExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Cut `bbox` out of `image`, clipped to its bounds
    pub fn extract(&self, image: &RgbImage, bbox: [f32; 4]) -> Result<(RgbImage, PixelRect), RegionError> {
        let rect = clip_box(bbox, image.width(), image.height())?;
        let region = imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image();
        Ok((region, rect))
    }

    /// Extract the box from both captures and align the reference region to the target's size
    pub fn extract_pair(
        &self,
        target: &RgbImage,
        reference: &RgbImage,
        detection: &DetectionBox,
    ) -> Result<RegionPair, RegionError> {
        let (target_region, rect) = self.extract(target, detection.bbox)?;
        let (mut reference_region, _) = self.extract(reference, detection.bbox)?;

        if reference_region.dimensions() != target_region.dimensions() {
            trace!(
                from = ?reference_region.dimensions(),
                to = ?target_region.dimensions(),
                "aligning reference region"
            );
            reference_region = resize_rgb(
                &reference_region,
                target_region.width(),
                target_region.height(),
                ResizeFilter::Bilinear,
            )
            .map_err(|e| RegionError::ResizeFailed(e.to_string()))?;
        }

        Ok(RegionPair {
            target: target_region,
            reference: reference_region,
            rect,
        })
    }
}
