//! Many independent pairs, analyzed in parallel.

use super::Inspector;
use crate::core::loader::ImageSource;
use crate::core::regions::DetectionBox;
use crate::core::reporter::AnalysisReport;
use crate::error::InspectorError;
use crate::events::{null_sender, BatchEvent, Event, EventSender};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// One pair to analyze
#[derive(Debug, Clone)]
pub struct PairRequest {
    pub reference: ImageSource,
    pub target: ImageSource,
    /// The target's boxes; `None` skips region comparison
    pub detections: Option<Vec<DetectionBox>>,
}

impl PairRequest {
    pub fn new(reference: impl Into<ImageSource>, target: impl Into<ImageSource>) -> Self {
        Self {
            reference: reference.into(),
            target: target.into(),
            detections: None,
        }
    }

    pub fn with_detections(mut self, detections: Vec<DetectionBox>) -> Self {
        self.detections = Some(detections);
        self
    }
}

impl Inspector {
    /// Analyze every pair; results are in input order
    pub fn analyze_batch(&self, pairs: &[PairRequest]) -> Vec<Result<AnalysisReport, InspectorError>> {
        self.analyze_batch_with_events(pairs, &null_sender())
    }

    /// Analyze every pair with batch progress events.
    ///
    /// A failing pair is reported in its slot and does not stop the others.
    pub fn analyze_batch_with_events(
        &self,
        pairs: &[PairRequest],
        events: &EventSender,
    ) -> Vec<Result<AnalysisReport, InspectorError>> {
        let total = pairs.len();
        events.send(Event::Batch(BatchEvent::Started { total_pairs: total }));
        info!(pairs = total, "starting batch");

        let completed = AtomicUsize::new(0);
        let results: Vec<Result<AnalysisReport, InspectorError>> = pairs
            .par_iter()
            .enumerate()
            .map(|(index, pair)| {
                let result = self.analyze(&pair.reference, &pair.target, pair.detections.as_deref());
                if let Err(e) = &result {
                    warn!("Pair {} failed: {}", index, e);
                }

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                events.send(Event::Batch(BatchEvent::PairFinished {
                    index,
                    succeeded: result.is_ok(),
                    completed: done,
                    total,
                }));
                result
            })
            .collect();

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        events.send(Event::Batch(BatchEvent::Completed {
            succeeded,
            failed: total - succeeded,
        }));
        info!(succeeded, failed = total - succeeded, "batch finished");

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventChannel;
    use image::{DynamicImage, GrayImage, Luma};

    fn gradient(offset: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(96, 96, |x, y| {
            Luma([((x + y) as u8).wrapping_add(offset)])
        }))
    }

    fn inspector() -> Inspector {
        Inspector::builder().canonical_size(96, 96).build().unwrap()
    }

    #[test]
    fn failures_stay_in_their_slot() {
        let pairs = vec![
            PairRequest::new(gradient(0), gradient(0)),
            PairRequest::new(gradient(0), ImageSource::Bytes(vec![0, 1, 2])),
            PairRequest::new(gradient(0), gradient(10)).with_detections(vec![]),
        ];

        let results = inspector().analyze_batch(&pairs);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].as_ref().unwrap().changes.is_some());
    }

    #[test]
    fn batch_reports_progress() {
        let (sender, receiver) = EventChannel::new();
        let pairs = vec![
            PairRequest::new(gradient(0), gradient(0)),
            PairRequest::new(gradient(0), gradient(5)),
        ];

        inspector().analyze_batch_with_events(&pairs, &sender);
        drop(sender);

        let events: Vec<Event> = receiver.iter().collect();
        let finished = events
            .iter()
            .filter(|e| matches!(e, Event::Batch(BatchEvent::PairFinished { .. })))
            .count();
        assert_eq!(finished, 2);
        assert!(matches!(
            events.last(),
            Some(Event::Batch(BatchEvent::Completed { succeeded: 2, failed: 0 }))
        ));
    }

    #[test]
    fn empty_batch_is_empty() {
        assert!(inspector().analyze_batch(&[]).is_empty());
    }
}
