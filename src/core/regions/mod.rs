//! # Regions Module
//!
//! Region-level change detection driven by externally supplied boxes.
//!
//! ## How It Works
//! 1. Clip each box to the target image and cut the same rectangle from the reference
//! 2. Resize the reference region to the target region when their sizes differ
//! 3. Score the pair by mean absolute pixel difference and 3D color histogram correlation
//!
//! Boxes that cannot be extracted are skipped with a [`RegionError`](crate::error::RegionError);
//! the remaining boxes are still compared.

mod difference;
mod extract;

pub use difference::{
    color_histogram, mean_absolute_difference, RegionComparison, RegionDifferencer, HISTOGRAM_BINS,
    HISTOGRAM_WEIGHT, PIXEL_WEIGHT,
};
pub use extract::{clip_box, PixelRect, RegionExtractor, RegionPair};

use serde::{Deserialize, Serialize};

/// One object reported by the external detector, in target pixel coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub class_id: u32,
    pub class_name: String,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]`
    pub bbox: [f32; 4],
}

impl DetectionBox {
    pub fn new(class_id: u32, class_name: impl Into<String>, confidence: f32, bbox: [f32; 4]) -> Self {
        Self {
            class_id,
            class_name: class_name.into(),
            confidence,
            bbox,
        }
    }

    pub fn width(&self) -> f32 {
        (self.bbox[2] - self.bbox[0]).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.bbox[3] - self.bbox[1]).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// High when the detector confidence reaches `split`
    pub fn confidence_level(&self, split: f64) -> ConfidenceLevel {
        if self.confidence as f64 >= split {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Detector confidence bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Low,
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "HIGH"),
            ConfidenceLevel::Low => write!(f, "LOW"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_geometry() {
        let detection = DetectionBox::new(1, "hotspot", 0.8, [10.0, 20.0, 50.0, 40.0]);
        assert_eq!(detection.width(), 40.0);
        assert_eq!(detection.height(), 20.0);
        assert_eq!(detection.area(), 800.0);
    }

    #[test]
    fn inverted_box_has_no_area() {
        let detection = DetectionBox::new(0, "x", 0.5, [50.0, 40.0, 10.0, 20.0]);
        assert_eq!(detection.area(), 0.0);
    }

    #[test]
    fn confidence_split_is_inclusive() {
        let detection = DetectionBox::new(0, "x", 0.3, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(detection.confidence_level(0.3), ConfidenceLevel::High);
        assert_eq!(detection.confidence_level(0.5), ConfidenceLevel::Low);
    }

    #[test]
    fn parses_detector_json() {
        let json = r#"[{"class_id":2,"class_name":"loose_joint","confidence":0.91,"bbox":[4,8,120,96]}]"#;
        let boxes: Vec<DetectionBox> = serde_json::from_str(json).unwrap();
        assert_eq!(boxes[0].class_name, "loose_joint");
        assert_eq!(boxes[0].bbox, [4.0, 8.0, 120.0, 96.0]);
    }
}
