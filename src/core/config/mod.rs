//! # Config Module
//!
//! Read-only tuning parameters for the inspector.
//!
//! Built once through [`InspectorConfigBuilder`], validated at `build()`, and
//! then shared by reference across any number of concurrent comparisons.
//!
//! ## Example
//! ```rust,ignore
//! use scene_inspector::core::config::InspectorConfig;
//!
//! let config = InspectorConfig::builder()
//!     .similarity_threshold(0.6)
//!     .change_threshold(0.25)
//!     .build()?;
//! ```

use crate::core::scoring::{MethodMap, ScoringMethod};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default fusion weights. Feature matching is the most reliable signal.
pub const DEFAULT_WEIGHTS: MethodMap<f64> = MethodMap {
    histogram: 0.15,
    template: 0.15,
    phase: 0.10,
    features: 0.30,
    structural: 0.10,
    augmentation: 0.20,
};

/// Allowed deviation of the weight sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Smallest canonical side that still leaves room for keypoint patches
pub const MIN_CANONICAL_SIDE: u32 = 64;

/// Validated inspector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Fused confidence at or above which two captures show the same scene
    pub similarity_threshold: f64,
    /// Mean region difference at or above which the target has changed
    pub change_threshold: f64,
    /// Combined difference above which a single region is significant
    pub region_threshold: f64,
    /// Detection confidence separating high from low confidence boxes
    pub confidence_split: f64,
    /// Preprocessing width
    pub canonical_width: u32,
    /// Preprocessing height
    pub canonical_height: u32,
    /// Upper bound on ORB keypoints per image
    pub max_keypoints: usize,
    /// Fusion weight per method
    pub weights: MethodMap<f64>,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            change_threshold: 0.2,
            region_threshold: 0.3,
            confidence_split: 0.3,
            canonical_width: 512,
            canonical_height: 512,
            max_keypoints: 2000,
            weights: DEFAULT_WEIGHTS,
        }
    }
}

impl InspectorConfig {
    /// Start from the defaults
    pub fn builder() -> InspectorConfigBuilder {
        InspectorConfigBuilder::new()
    }

    /// Check every parameter; called by the builder
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("similarity_threshold", self.similarity_threshold)?;
        check_unit("change_threshold", self.change_threshold)?;
        check_unit("region_threshold", self.region_threshold)?;
        check_unit("confidence_split", self.confidence_split)?;

        if self.canonical_width < MIN_CANONICAL_SIDE || self.canonical_height < MIN_CANONICAL_SIDE {
            return Err(ConfigError::CanonicalSizeTooSmall {
                width: self.canonical_width,
                height: self.canonical_height,
                min: MIN_CANONICAL_SIDE,
            });
        }

        if self.max_keypoints == 0 {
            return Err(ConfigError::NoKeypoints(self.max_keypoints));
        }

        for (method, &weight) in self.weights.iter() {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::WeightOutOfRange {
                    method: method.id().to_string(),
                    value: weight,
                });
            }
        }

        let sum = weight_sum(&self.weights);
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightsDoNotSumToOne { sum });
        }

        Ok(())
    }
}

/// Sum of all fusion weights
pub fn weight_sum(weights: &MethodMap<f64>) -> f64 {
    weights.iter().map(|(_, w)| *w).sum()
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { name, value })
    }
}

/// Builder for [`InspectorConfig`]
#[derive(Debug, Clone, Default)]
pub struct InspectorConfigBuilder {
    config: InspectorConfig,
}

impl InspectorConfigBuilder {
    /// Create a builder holding the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the same-scene threshold
    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the overall change threshold
    pub fn change_threshold(mut self, threshold: f64) -> Self {
        self.config.change_threshold = threshold;
        self
    }

    /// Set the per-region significance threshold
    pub fn region_threshold(mut self, threshold: f64) -> Self {
        self.config.region_threshold = threshold;
        self
    }

    /// Set the high/low detection confidence split
    pub fn confidence_split(mut self, split: f64) -> Self {
        self.config.confidence_split = split;
        self
    }

    /// Set the preprocessing resolution
    pub fn canonical_size(mut self, width: u32, height: u32) -> Self {
        self.config.canonical_width = width;
        self.config.canonical_height = height;
        self
    }

    /// Set the keypoint budget per image
    pub fn max_keypoints(mut self, max: usize) -> Self {
        self.config.max_keypoints = max;
        self
    }

    /// Replace all fusion weights
    pub fn weights(mut self, weights: MethodMap<f64>) -> Self {
        self.config.weights = weights;
        self
    }

    /// Override a single fusion weight
    pub fn weight(mut self, method: ScoringMethod, weight: f64) -> Self {
        self.config.weights[method] = weight;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<InspectorConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
