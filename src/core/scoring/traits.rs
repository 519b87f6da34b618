//! Trait and table definitions shared by the scoring methods.

use crate::core::loader::PreprocessedImage;
use crate::error::MethodError;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// The six similarity methods, in fusion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    /// 256/32-bin intensity histogram comparison
    Histogram,
    /// Multi-scale normalized cross-correlation
    Template,
    /// Frequency-domain phase correlation
    Phase,
    /// ORB keypoints, ratio test and homography verification
    Features,
    /// Mean squared error on a 64x64 thumbnail
    Structural,
    /// Best correlation under brightness, rotation and scale variants
    Augmentation,
}

impl ScoringMethod {
    /// Number of methods
    pub const COUNT: usize = 6;

    /// All methods in fusion order
    pub const ALL: [ScoringMethod; Self::COUNT] = [
        ScoringMethod::Histogram,
        ScoringMethod::Template,
        ScoringMethod::Phase,
        ScoringMethod::Features,
        ScoringMethod::Structural,
        ScoringMethod::Augmentation,
    ];

    /// Position in [`ScoringMethod::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable identifier used in reports
    pub fn id(&self) -> &'static str {
        match self {
            ScoringMethod::Histogram => "histogram",
            ScoringMethod::Template => "template",
            ScoringMethod::Phase => "phase",
            ScoringMethod::Features => "features",
            ScoringMethod::Structural => "structural",
            ScoringMethod::Augmentation => "augmentation",
        }
    }

    /// Get a human-readable description of the method
    pub fn description(&self) -> &'static str {
        match self {
            ScoringMethod::Histogram => "Histogram Correlation",
            ScoringMethod::Template => "Template Matching",
            ScoringMethod::Phase => "Phase Correlation",
            ScoringMethod::Features => "ORB Feature Matching",
            ScoringMethod::Structural => "Structural Similarity",
            ScoringMethod::Augmentation => "Augmentation Robust",
        }
    }
}

impl std::fmt::Display for ScoringMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// One value per scoring method.
///
/// Every method always has a slot, so a missing score is a compile error
/// rather than a silently absent map key.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MethodMap<T> {
    pub histogram: T,
    pub template: T,
    pub phase: T,
    pub features: T,
    pub structural: T,
    pub augmentation: T,
}

impl<T> MethodMap<T> {
    /// Build a map by evaluating `f` for every method in fusion order
    pub fn from_fn(mut f: impl FnMut(ScoringMethod) -> T) -> Self {
        Self {
            histogram: f(ScoringMethod::Histogram),
            template: f(ScoringMethod::Template),
            phase: f(ScoringMethod::Phase),
            features: f(ScoringMethod::Features),
            structural: f(ScoringMethod::Structural),
            augmentation: f(ScoringMethod::Augmentation),
        }
    }

    /// Iterate `(method, value)` pairs in fusion order
    pub fn iter(&self) -> impl Iterator<Item = (ScoringMethod, &T)> + '_ {
        ScoringMethod::ALL.into_iter().map(move |m| (m, &self[m]))
    }

    /// Transform every value, keeping method identity
    pub fn map<U>(&self, mut f: impl FnMut(ScoringMethod, &T) -> U) -> MethodMap<U> {
        MethodMap::from_fn(|m| f(m, &self[m]))
    }
}

impl<T> Index<ScoringMethod> for MethodMap<T> {
    type Output = T;

    fn index(&self, method: ScoringMethod) -> &T {
        match method {
            ScoringMethod::Histogram => &self.histogram,
            ScoringMethod::Template => &self.template,
            ScoringMethod::Phase => &self.phase,
            ScoringMethod::Features => &self.features,
            ScoringMethod::Structural => &self.structural,
            ScoringMethod::Augmentation => &self.augmentation,
        }
    }
}

impl<T> IndexMut<ScoringMethod> for MethodMap<T> {
    fn index_mut(&mut self, method: ScoringMethod) -> &mut T {
        match method {
            ScoringMethod::Histogram => &mut self.histogram,
            ScoringMethod::Template => &mut self.template,
            ScoringMethod::Phase => &mut self.phase,
            ScoringMethod::Features => &mut self.features,
            ScoringMethod::Structural => &mut self.structural,
            ScoringMethod::Augmentation => &mut self.augmentation,
        }
    }
}

/// Raw per-method scores in [0, 1]
pub type MethodScores = MethodMap<f64>;

/// Outcome of a single method before the degrade-to-zero policy is applied
pub type MethodOutcome = Result<f64, MethodError>;

/// Trait for similarity method implementations
pub trait SimilarityMethod: Send + Sync {
    /// Score two preprocessed images; 1.0 means the same scene
    fn score(&self, a: &PreprocessedImage, b: &PreprocessedImage) -> MethodOutcome;

    /// Which method this is
    fn kind(&self) -> ScoringMethod;
}

/// Reject NaN and infinities, clamp everything else into [0, 1]
pub(crate) fn unit_score(value: f64, what: &str) -> MethodOutcome {
    if value.is_finite() {
        Ok(value.clamp(0.0, 1.0))
    } else {
        Err(MethodError::Numeric(format!("{} produced {}", what, value)))
    }
}
