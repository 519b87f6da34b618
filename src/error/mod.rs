//! # Error Module
//!
//! Error types for the scene inspector.
//!
//! ## Propagation Policy
//! - **Image read failures** abort the comparison they belong to
//! - **Method failures** are recovered: the method scores 0.0 and the comparison continues
//! - **Region failures** skip that region only
//! - **Configuration failures** surface when the inspector is built, never mid-comparison

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum InspectorError {
    #[error("Image read error: {0}")]
    ImageRead(#[from] ImageReadError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while loading or preprocessing an image
#[derive(Error, Debug)]
pub enum ImageReadError {
    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Failed to open image file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to resize image: {0}")]
    ResizeFailed(String),
}

/// A single scoring method's failure. Never fatal to a comparison.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MethodError {
    #[error("Images have mismatched dimensions: {left:?} vs {right:?}")]
    DimensionMismatch {
        left: (u32, u32),
        right: (u32, u32),
    },

    #[error("Not enough data: {0}")]
    InsufficientData(String),

    #[error("Numeric failure: {0}")]
    Numeric(String),
}

/// Errors for a single detected region. The region is skipped, the batch continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegionError {
    #[error("Region {bbox:?} has zero area after clipping to {width}x{height}")]
    EmptyRegion {
        bbox: [f32; 4],
        width: u32,
        height: u32,
    },

    #[error("Region coordinates are not finite: {bbox:?}")]
    InvalidCoordinates { bbox: [f32; 4] },

    #[error("Failed to align reference region: {0}")]
    ResizeFailed(String),
}

/// Invalid configuration values, rejected at construction time
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {name}: {value} (must be within 0.0-1.0)")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("Invalid weight for {method}: {value} (must be within 0.0-1.0)")]
    WeightOutOfRange { method: String, value: f64 },

    #[error("Fusion weights must sum to 1.0, got {sum}")]
    WeightsDoNotSumToOne { sum: f64 },

    #[error("Invalid canonical size {width}x{height} (both sides must be at least {min})")]
    CanonicalSizeTooSmall { width: u32, height: u32, min: u32 },

    #[error("Invalid max_keypoints: {0} (must be at least 1)")]
    NoKeypoints(usize),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, InspectorError>;
