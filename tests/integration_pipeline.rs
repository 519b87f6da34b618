//! Integration tests for the inspection pipeline.
//!
//! These tests write real image files and verify end-to-end behavior:
//! - Same-scene and different-scene verdicts
//! - Region change detection from supplied boxes
//! - Error handling for unreadable captures

use image::{ImageFormat, Rgb, RgbImage};
use scene_inspector::core::changes::ChangeStatus;
use scene_inspector::core::loader::ImageSource;
use scene_inspector::core::pipeline::{Inspector, PairRequest};
use scene_inspector::core::regions::DetectionBox;
use scene_inspector::core::reporter::export_to_file;
use scene_inspector::core::scoring::ScoringMethod;
use scene_inspector::core::AnalysisReport;
use scene_inspector::InspectorError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Colored pattern of 8x8 blocks with pseudo-random values
fn scene(width: u32, height: u32, seed: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let mut v = (x / 8).wrapping_mul(0x9E37_79B1) ^ (y / 8).wrapping_mul(0x85EB_CA77) ^ seed;
        v ^= v >> 15;
        v = v.wrapping_mul(0x2C1B_3C6D);
        v ^= v >> 12;
        Rgb([(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8])
    })
}

fn write_png(dir: &TempDir, name: &str, image: &RgbImage) -> PathBuf {
    let path = dir.path().join(name);
    image.save_with_format(&path, ImageFormat::Png).unwrap();
    path
}

fn analyze(reference: &Path, target: &Path, boxes: Option<&[DetectionBox]>) -> AnalysisReport {
    Inspector::default()
        .analyze(&ImageSource::from(reference), &ImageSource::from(target), boxes)
        .unwrap()
}

#[test]
fn identical_captures_are_the_same_scene() {
    let dir = TempDir::new().unwrap();
    let path = write_png(&dir, "baseline.png", &scene(512, 512, 1));

    let report = analyze(&path, &path, None);

    assert!(report.similarity.confidence >= 0.95, "confidence {}", report.similarity.confidence);
    assert!(report.similarity.is_similar);
    assert!(report.similarity.degraded.is_empty());
    assert!(report.similarity.scores[ScoringMethod::Structural] > 0.99);
}

#[test]
fn black_and_white_captures_are_different() {
    let dir = TempDir::new().unwrap();
    let black = write_png(&dir, "black.png", &RgbImage::from_pixel(512, 512, Rgb([0, 0, 0])));
    let white = write_png(&dir, "white.png", &RgbImage::from_pixel(512, 512, Rgb([255, 255, 255])));

    let report = analyze(&black, &white, None);

    assert!(!report.similarity.is_similar);
    assert!(report.similarity.scores[ScoringMethod::Structural] < 0.05);
    assert!(report.similarity.scores[ScoringMethod::Histogram] < 0.1);
}

#[test]
fn unchanged_region_is_not_significant() {
    let dir = TempDir::new().unwrap();
    let path = write_png(&dir, "capture.png", &scene(400, 300, 2));
    let boxes = vec![DetectionBox::new(0, "insulator", 0.87, [40.0, 60.0, 200.0, 180.0])];

    let report = analyze(&path, &path, Some(&boxes));
    let changes = report.changes.unwrap();

    assert_eq!(changes.regions.len(), 1);
    assert!(changes.regions[0].combined_difference < 0.3);
    assert!(!changes.regions[0].significant);
    assert!(!changes.significant_change);
    assert_eq!(changes.status, ChangeStatus::RegionsStable);
}

#[test]
fn new_solid_patch_is_a_significant_change() {
    let dir = TempDir::new().unwrap();
    let baseline = scene(400, 300, 3);
    let mut inspection = baseline.clone();
    for y in 100..180 {
        for x in 150..260 {
            inspection.put_pixel(x, y, Rgb([250, 20, 20]));
        }
    }
    let reference = write_png(&dir, "baseline.png", &baseline);
    let target = write_png(&dir, "inspection.png", &inspection);
    let boxes = vec![DetectionBox::new(1, "hotspot", 0.92, [150.0, 100.0, 260.0, 180.0])];

    let report = analyze(&reference, &target, Some(&boxes));
    let changes = report.changes.unwrap();

    assert!(changes.regions[0].combined_difference > 0.3);
    assert!(changes.regions[0].significant);
    assert!(changes.significant_change);
    assert_eq!(changes.status, ChangeStatus::RegionsChanged);
    assert!(changes.summary.contains("hotspot"));
}

#[test]
fn empty_box_list_reports_no_detections() {
    let dir = TempDir::new().unwrap();
    let path = write_png(&dir, "capture.png", &scene(128, 128, 4));

    let report = analyze(&path, &path, Some(&[]));
    let changes = report.changes.unwrap();

    assert_eq!(changes.change_magnitude, 0.0);
    assert!(!changes.significant_change);
    assert_eq!(changes.status, ChangeStatus::NoDetections);
    assert_eq!(report.detection_summary.total, 0);
}

#[test]
fn reference_of_different_size_is_aligned() {
    let dir = TempDir::new().unwrap();
    let reference = write_png(&dir, "small.png", &scene(200, 150, 5));
    let target = write_png(&dir, "large.png", &scene(400, 300, 5));
    let boxes = vec![DetectionBox::new(0, "clamp", 0.5, [100.0, 100.0, 300.0, 250.0])];

    let report = analyze(&reference, &target, Some(&boxes));
    let changes = report.changes.unwrap();

    assert!(changes.skipped.is_empty(), "skipped: {:?}", changes.skipped);
    assert_eq!(changes.regions.len(), 1);

    let region = &changes.regions[0];
    assert!(region.pixel_difference.is_finite());
    assert!(region.histogram_difference.is_finite());
    assert!(region.combined_difference.is_finite());
    assert!(changes.change_magnitude.is_finite());
}

#[test]
fn repeated_analysis_is_identical() {
    let dir = TempDir::new().unwrap();
    let reference = write_png(&dir, "a.png", &scene(256, 256, 6));
    let target = write_png(&dir, "b.png", &scene(256, 256, 7));
    let boxes = vec![DetectionBox::new(0, "part", 0.4, [10.0, 10.0, 120.0, 90.0])];

    let first = analyze(&reference, &target, Some(&boxes));
    let second = analyze(&reference, &target, Some(&boxes));

    assert_eq!(first.similarity, second.similarity);
    assert_eq!(first.changes, second.changes);
}

#[test]
fn unreadable_capture_is_an_image_error() {
    let dir = TempDir::new().unwrap();
    let good = write_png(&dir, "good.png", &scene(64, 64, 8));

    let corrupt = dir.path().join("corrupt.jpg");
    let mut file = File::create(&corrupt).unwrap();
    file.write_all(b"this is not a valid image file").unwrap();
    drop(file);

    let result = Inspector::default().analyze(&ImageSource::from(good.as_path()), &ImageSource::from(corrupt.as_path()), None);
    assert!(matches!(result, Err(InspectorError::ImageRead(_))));

    let missing = dir.path().join("missing.png");
    let result = Inspector::default().analyze(&ImageSource::from(missing.as_path()), &ImageSource::from(good.as_path()), None);
    assert!(matches!(result, Err(InspectorError::ImageRead(_))));
}

#[test]
fn batch_keeps_order_and_isolates_failures() {
    let dir = TempDir::new().unwrap();
    let a = write_png(&dir, "a.png", &scene(128, 128, 9));
    let missing = dir.path().join("missing.png");

    let pairs = vec![
        PairRequest::new(a.clone(), a.clone()),
        PairRequest::new(a.clone(), missing),
        PairRequest::new(a.clone(), a).with_detections(vec![]),
    ];
    let results = Inspector::default().analyze_batch(&pairs);

    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert_eq!(
        results[2].as_ref().unwrap().changes.as_ref().map(|c| c.status),
        Some(ChangeStatus::NoDetections)
    );
}

#[test]
fn saved_report_reads_back() {
    let dir = TempDir::new().unwrap();
    let path = write_png(&dir, "capture.png", &scene(128, 128, 10));
    let boxes = vec![DetectionBox::new(0, "part", 0.9, [0.0, 0.0, 64.0, 64.0])];
    let report = analyze(&path, &path, Some(&boxes));

    let out = dir.path().join("report.json");
    export_to_file(&report, &out).unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert!(json["similarity"]["confidence"].is_number());
    assert!(json["similarity"]["scores"]["augmentation"].is_number());
    assert_eq!(json["changes"]["status"], "regions_stable");
    assert_eq!(json["detection_summary"]["high_confidence"], 1);
}
