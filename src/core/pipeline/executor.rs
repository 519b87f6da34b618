//! Pipeline execution implementation.

use crate::core::changes::{ChangeAggregator, ChangeResult, SkippedRegion};
use crate::core::config::{InspectorConfig, InspectorConfigBuilder};
use crate::core::fusion::{fuse, SimilarityResult};
use crate::core::loader::{ImageSource, PreprocessedImage, Preprocessor};
use crate::core::regions::{DetectionBox, RegionComparison, RegionDifferencer, RegionExtractor};
use crate::core::reporter::{AnalysisReport, DetectionSummary, StageTimings};
use crate::core::scoring::{MethodMap, ScoringEngine};
use crate::error::{InspectorError, Result};
use crate::events::{
    null_sender, Event, EventSender, PipelineEvent, PipelinePhase, PipelineSummary, RegionEvent,
    ScoringEvent,
};
use image::{DynamicImage, RgbImage};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Builder for [`Inspector`]
#[derive(Debug, Clone, Default)]
pub struct InspectorBuilder {
    config: InspectorConfigBuilder,
}

impl InspectorBuilder {
    /// Create a new builder holding the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the same-scene threshold
    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.config = self.config.similarity_threshold(threshold);
        self
    }

    /// Set the overall change threshold
    pub fn change_threshold(mut self, threshold: f64) -> Self {
        self.config = self.config.change_threshold(threshold);
        self
    }

    /// Set the per-region significance threshold
    pub fn region_threshold(mut self, threshold: f64) -> Self {
        self.config = self.config.region_threshold(threshold);
        self
    }

    /// Set the preprocessing resolution
    pub fn canonical_size(mut self, width: u32, height: u32) -> Self {
        self.config = self.config.canonical_size(width, height);
        self
    }

    /// Replace the fusion weights
    pub fn weights(mut self, weights: MethodMap<f64>) -> Self {
        self.config = self.config.weights(weights);
        self
    }

    /// Validate the configuration and build the inspector
    pub fn build(self) -> Result<Inspector> {
        Ok(Inspector::from_validated(self.config.build()?))
    }
}

/// The dual-stage comparison engine: similarity fusion, then region change detection.
///
/// Holds only read-only state, so one inspector can serve any number of
/// concurrent comparisons.
pub struct Inspector {
    config: InspectorConfig,
    preprocessor: Preprocessor,
    engine: ScoringEngine,
    extractor: RegionExtractor,
    differencer: RegionDifferencer,
    aggregator: ChangeAggregator,
}

impl Inspector {
    /// Create a new inspector builder
    pub fn builder() -> InspectorBuilder {
        InspectorBuilder::new()
    }

    /// Validate `config` and build the inspector.
    ///
    /// Out-of-range thresholds, weights that do not sum to 1.0, a canonical
    /// size below the minimum or a zero keypoint budget are rejected here.
    pub fn new(config: InspectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: InspectorConfig) -> Self {
        Self {
            preprocessor: Preprocessor::new(config.canonical_width, config.canonical_height),
            engine: ScoringEngine::new(&config),
            extractor: RegionExtractor::new(),
            differencer: RegionDifferencer::new(config.region_threshold),
            aggregator: ChangeAggregator::new(config.change_threshold),
            config,
        }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Analyze a pair without events.
    ///
    /// `detections` are the target's boxes; `None` skips region comparison.
    pub fn analyze(
        &self,
        reference: &ImageSource,
        target: &ImageSource,
        detections: Option<&[DetectionBox]>,
    ) -> Result<AnalysisReport> {
        self.analyze_with_events(reference, target, detections, &null_sender())
    }

    /// Analyze a pair with event reporting
    pub fn analyze_with_events(
        &self,
        reference: &ImageSource,
        target: &ImageSource,
        detections: Option<&[DetectionBox]>,
        events: &EventSender,
    ) -> Result<AnalysisReport> {
        let result = self.run(reference, target, detections, events);
        if let Err(e) = &result {
            events.send(Event::Pipeline(PipelineEvent::Error {
                message: e.to_string(),
            }));
        }
        result
    }

    fn run(
        &self,
        reference: &ImageSource,
        target: &ImageSource,
        detections: Option<&[DetectionBox]>,
        events: &EventSender,
    ) -> Result<AnalysisReport> {
        let start_time = Instant::now();
        info!(%reference, %target, "analyzing pair");

        events.send(Event::Pipeline(PipelineEvent::Started {
            reference: reference.to_string(),
            target: target.to_string(),
        }));

        // Phase 1: Preprocessing
        phase(events, PipelinePhase::Preprocessing);
        let stage = Instant::now();
        let (reference_image, target_image) = rayon::join(|| reference.load(), || target.load());
        let (reference_image, target_image) = (reference_image?, target_image?);
        let (reference_gray, target_gray) = rayon::join(
            || self.preprocessor.preprocess_image(&reference_image),
            || self.preprocessor.preprocess_image(&target_image),
        );
        let (reference_gray, target_gray) = (reference_gray?, target_gray?);
        let preprocess_ms = elapsed_ms(stage);

        // Phase 2: Scoring and fusion
        let stage = Instant::now();
        let similarity = self.similarity_with_events(&reference_gray, &target_gray, events);
        let scoring_ms = elapsed_ms(stage);
        info!(
            confidence = similarity.confidence,
            is_similar = similarity.is_similar,
            best_method = %similarity.best_method,
            "similarity fused"
        );

        // Phase 3: Regions, only when boxes were supplied
        let stage = Instant::now();
        let changes = detections.map(|boxes| {
            self.regions_with_events(&reference_image, &target_image, boxes, events)
        });
        let regions_ms = elapsed_ms(stage);

        phase(events, PipelinePhase::Done);
        let total_ms = elapsed_ms(start_time);

        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                confidence: similarity.confidence,
                is_similar: similarity.is_similar,
                change_magnitude: changes.as_ref().map(|c| c.change_magnitude),
                duration_ms: total_ms as u64,
            },
        }));

        Ok(AnalysisReport {
            reference: reference.to_string(),
            target: target.to_string(),
            similarity,
            changes,
            detection_summary: DetectionSummary::from_boxes(
                detections.unwrap_or_default(),
                self.config.confidence_split,
            ),
            timings: StageTimings {
                preprocess_ms,
                scoring_ms,
                regions_ms,
                total_ms,
            },
        })
    }

    /// Preprocess a source with this inspector's canonical size
    pub fn preprocess(&self, source: &ImageSource) -> Result<PreprocessedImage> {
        Ok(self.preprocessor.preprocess(source)?)
    }

    /// Score and fuse two preprocessed images
    pub fn compare_similarity(&self, reference: &PreprocessedImage, target: &PreprocessedImage) -> SimilarityResult {
        self.similarity_with_events(reference, target, &null_sender())
    }

    fn similarity_with_events(
        &self,
        reference: &PreprocessedImage,
        target: &PreprocessedImage,
        events: &EventSender,
    ) -> SimilarityResult {
        phase(events, PipelinePhase::Scoring);
        let outcomes = self.engine.score_all(reference, target);

        for (method, outcome) in outcomes.iter() {
            events.send(Event::Scoring(match outcome {
                Ok(score) => ScoringEvent::MethodScored { method, score: *score },
                Err(e) => ScoringEvent::MethodDegraded {
                    method,
                    reason: e.to_string(),
                },
            }));
        }

        phase(events, PipelinePhase::Fusing);
        fuse(&outcomes, &self.config.weights, self.config.similarity_threshold)
    }

    /// Compare the target's boxes against the same rectangles in the reference
    pub fn compare_regions(
        &self,
        reference: &DynamicImage,
        target: &DynamicImage,
        detections: &[DetectionBox],
    ) -> ChangeResult {
        self.regions_with_events(reference, target, detections, &null_sender())
    }

    fn regions_with_events(
        &self,
        reference: &DynamicImage,
        target: &DynamicImage,
        detections: &[DetectionBox],
        events: &EventSender,
    ) -> ChangeResult {
        if detections.is_empty() {
            debug!("no detections supplied, skipping region comparison");
            return ChangeResult::no_detections();
        }

        phase(events, PipelinePhase::ExtractingRegions);
        let reference_rgb = reference.to_rgb8();
        let target_rgb = target.to_rgb8();

        phase(events, PipelinePhase::ComparingRegions);
        events.send(Event::Region(RegionEvent::Started {
            total_regions: detections.len(),
        }));

        let outcomes: Vec<std::result::Result<RegionComparison, SkippedRegion>> = detections
            .par_iter()
            .enumerate()
            .map(|(index, detection)| self.compare_region(index, detection, &reference_rgb, &target_rgb, events))
            .collect();

        let (compared, skipped): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(|o| o.is_ok());
        let compared: Vec<RegionComparison> = compared.into_iter().filter_map(|o| o.ok()).collect();
        let skipped: Vec<SkippedRegion> = skipped.into_iter().filter_map(|o| o.err()).collect();

        events.send(Event::Region(RegionEvent::Completed {
            compared: compared.len(),
            skipped: skipped.len(),
        }));

        phase(events, PipelinePhase::Aggregating);
        let changes = self.aggregator.aggregate(compared, skipped);
        info!(
            magnitude = changes.change_magnitude,
            significant = changes.significant_change,
            status = %changes.status,
            "regions aggregated"
        );
        changes
    }

    fn compare_region(
        &self,
        index: usize,
        detection: &DetectionBox,
        reference: &RgbImage,
        target: &RgbImage,
        events: &EventSender,
    ) -> std::result::Result<RegionComparison, SkippedRegion> {
        match self.extractor.extract_pair(target, reference, detection) {
            Ok(pair) => {
                let comparison = self.differencer.compare(index, detection, &pair.target, &pair.reference);
                debug!(
                    index,
                    class = %detection.class_name,
                    combined = comparison.combined_difference,
                    "region compared"
                );
                events.send(Event::Region(RegionEvent::Compared {
                    index,
                    class_name: detection.class_name.clone(),
                    combined_difference: comparison.combined_difference,
                    significant: comparison.significant,
                }));
                Ok(comparison)
            }
            Err(e) => {
                warn!("Skipping region {} ({}): {}", index, detection.class_name, e);
                events.send(Event::Region(RegionEvent::Skipped {
                    index,
                    reason: e.to_string(),
                }));
                Err(SkippedRegion {
                    index,
                    class_name: detection.class_name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl Default for Inspector {
    fn default() -> Self {
        Self::from_validated(InspectorConfig::default())
    }
}

impl TryFrom<InspectorConfig> for Inspector {
    type Error = InspectorError;

    fn try_from(config: InspectorConfig) -> Result<Self> {
        Self::new(config)
    }
}

fn phase(events: &EventSender, phase: PipelinePhase) {
    events.send(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
