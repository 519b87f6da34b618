//! # CLI Module
//!
//! Command-line interface for the scene inspector.
//!
//! ## Usage
//! ```bash
//! # Compare a reference and a target capture
//! scene-inspect compare baseline.jpg inspection.jpg
//!
//! # Include the target's detections (JSON array of boxes)
//! scene-inspect compare baseline.jpg inspection.jpg --detections boxes.json
//!
//! # Stricter thresholds, JSON output saved to a file
//! scene-inspect compare a.png b.png --similarity-threshold 0.6 --output json --save report.json
//!
//! # Many pairs from a manifest
//! scene-inspect batch pairs.json
//!
//! # Compare two detection sets by class counts
//! scene-inspect detections baseline_boxes.json inspection_boxes.json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use scene_inspector::core::changes::{compare_detection_sets, ChangeResult, ClassTrend, DetectionSetChange};
use scene_inspector::core::loader::ImageSource;
use scene_inspector::core::pipeline::{Inspector, PairRequest};
use scene_inspector::core::regions::DetectionBox;
use scene_inspector::core::reporter::{explain, export_json, export_to_file, AnalysisReport, ScoreTable};
use scene_inspector::error::{ConfigError, InspectorError, Result};
use scene_inspector::events::{BatchEvent, Event, EventChannel, PipelineEvent, RegionEvent};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Scene Inspector - same scene or not, and what changed
#[derive(Parser, Debug)]
#[command(name = "scene-inspect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare a reference capture with a target capture
    Compare {
        /// Reference (baseline) image
        reference: PathBuf,

        /// Target (inspection) image
        target: PathBuf,

        /// JSON file with the target's detection boxes
        #[arg(short, long)]
        detections: Option<PathBuf>,

        #[command(flatten)]
        options: CommonOptions,
    },
    /// Compare every pair listed in a JSON manifest
    Batch {
        /// Manifest: `[{"reference": "...", "target": "...", "detections": "..."}]`
        manifest: PathBuf,

        #[command(flatten)]
        options: CommonOptions,
    },
    /// Compare the detection sets of two captures by class counts
    Detections {
        /// Reference capture's detection boxes (JSON)
        reference: PathBuf,

        /// Target capture's detection boxes (JSON)
        target: PathBuf,

        /// Magnitude at or above which the sets differ significantly (0.0-1.0)
        #[arg(short, long, default_value = "0.2")]
        change_threshold: f64,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args, Debug)]
struct CommonOptions {
    /// Confidence at or above which captures show the same scene (0.0-1.0)
    #[arg(short, long, default_value = "0.5")]
    similarity_threshold: f64,

    /// Mean region difference at or above which the target has changed (0.0-1.0)
    #[arg(short, long, default_value = "0.2")]
    change_threshold: f64,

    /// Combined difference above which a single region is significant (0.0-1.0)
    #[arg(long, default_value = "0.3")]
    region_threshold: f64,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Also write the JSON report to this file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// One line per pair
    Minimal,
}

/// One manifest line
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    reference: PathBuf,
    target: PathBuf,
    #[serde(default)]
    detections: Option<PathBuf>,
}

/// One batch result as written to JSON
#[derive(Debug, Serialize)]
struct BatchRecord {
    reference: String,
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compare {
            reference,
            target,
            detections,
            options,
        } => {
            scene_inspector::init_tracing(options.verbose);
            run_compare(reference, target, detections, options)
        }
        Commands::Batch { manifest, options } => {
            scene_inspector::init_tracing(options.verbose);
            run_batch(manifest, options)
        }
        Commands::Detections {
            reference,
            target,
            change_threshold,
            output,
            verbose,
        } => {
            scene_inspector::init_tracing(verbose);
            run_detections(&reference, &target, change_threshold, output)
        }
    }
}

fn build_inspector(options: &CommonOptions) -> Result<Inspector> {
    Inspector::builder()
        .similarity_threshold(options.similarity_threshold)
        .change_threshold(options.change_threshold)
        .region_threshold(options.region_threshold)
        .build()
}

fn run_compare(
    reference: PathBuf,
    target: PathBuf,
    detections_path: Option<PathBuf>,
    options: CommonOptions,
) -> Result<()> {
    let term = Term::stderr();
    let inspector = build_inspector(&options)?;
    let detections = detections_path.as_deref().map(load_detections).transpose()?;

    if matches!(options.output, OutputFormat::Pretty) {
        print_header(&term);
    }

    let (sender, receiver) = EventChannel::new();

    // Spinner for pretty output
    let progress = if matches!(options.output, OutputFormat::Pretty) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = options.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Region(RegionEvent::Skipped { index, reason }) if verbose => {
                    pb.println(format!("  {} region {} skipped: {}", style("!").yellow(), index + 1, reason));
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Pipeline(PipelineEvent::Error { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = inspector.analyze_with_events(
        &ImageSource::from(reference),
        &ImageSource::from(target),
        detections.as_deref(),
        &sender,
    );

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let report = result?;

    match options.output {
        OutputFormat::Pretty => print_pretty_report(&term, &report, &inspector, options.verbose),
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Minimal => println!("{}", minimal_line(&report)),
    }

    if let Some(path) = &options.save {
        save(&report, path)?;
        if matches!(options.output, OutputFormat::Pretty) {
            term.write_line(&format!("{} {}", style("Results saved:").dim(), path.display()))
                .ok();
        }
    }

    Ok(())
}

fn run_batch(manifest: PathBuf, options: CommonOptions) -> Result<()> {
    let term = Term::stderr();
    let inspector = build_inspector(&options)?;
    let entries = load_manifest(&manifest)?;
    let base = manifest.parent().unwrap_or_else(|| Path::new("."));

    let mut pairs = Vec::with_capacity(entries.len());
    for entry in &entries {
        let mut pair = PairRequest::new(base.join(&entry.reference), base.join(&entry.target));
        if let Some(path) = &entry.detections {
            pair = pair.with_detections(load_detections(&base.join(path))?);
        }
        pairs.push(pair);
    }

    if matches!(options.output, OutputFormat::Pretty) {
        print_header(&term);
    }

    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if matches!(options.output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(pairs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| InspectorError::Input(e.to_string()))?
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Batch(BatchEvent::PairFinished { completed, .. }) => {
                    pb.set_position(completed as u64);
                }
                Event::Batch(BatchEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let results = inspector.analyze_batch_with_events(&pairs, &sender);

    drop(sender);
    event_thread.join().ok();

    let records: Vec<BatchRecord> = pairs
        .iter()
        .zip(results)
        .map(|(pair, result)| {
            let (report, error) = match result {
                Ok(report) => (Some(report), None),
                Err(e) => (None, Some(e.to_string())),
            };
            BatchRecord {
                reference: pair.reference.to_string(),
                target: pair.target.to_string(),
                report,
                error,
            }
        })
        .collect();

    match options.output {
        OutputFormat::Pretty => print_pretty_batch(&term, &records),
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Minimal => {
            for record in &records {
                match (&record.report, &record.error) {
                    (Some(report), _) => println!("{}", minimal_line(report)),
                    (None, Some(error)) => println!("ERROR {} {}: {}", record.reference, record.target, error),
                    (None, None) => {}
                }
            }
        }
    }

    if let Some(path) = &options.save {
        save(&records, path)?;
    }

    Ok(())
}

fn run_detections(reference: &Path, target: &Path, change_threshold: f64, output: OutputFormat) -> Result<()> {
    if !(0.0..=1.0).contains(&change_threshold) {
        return Err(ConfigError::ThresholdOutOfRange {
            name: "change_threshold",
            value: change_threshold,
        }
        .into());
    }

    let change = compare_detection_sets(&load_detections(reference)?, &load_detections(target)?, change_threshold);

    match output {
        OutputFormat::Pretty => print_detection_sets(&Term::stdout(), &change),
        OutputFormat::Json => print_json(&change)?,
        OutputFormat::Minimal => println!(
            "{} {:.3} {:?}",
            if change.significant_change { "CHANGED" } else { "STABLE" },
            change.change_magnitude,
            change.kind
        ),
    }

    Ok(())
}

fn load_detections(path: &Path) -> Result<Vec<DetectionBox>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| InspectorError::Input(format!("Cannot read detections {}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| InspectorError::Input(format!("Invalid detections {}: {}", path.display(), e)))
}

fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| InspectorError::Input(format!("Cannot read manifest {}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| InspectorError::Input(format!("Invalid manifest {}: {}", path.display(), e)))
}

fn save<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    export_to_file(value, path).map_err(|source| InspectorError::Output {
        path: path.to_path_buf(),
        source,
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    export_json(value, std::io::stdout().lock()).map_err(|source| InspectorError::Output {
        path: PathBuf::from("<stdout>"),
        source,
    })
}

fn print_header(term: &Term) {
    term.write_line(&format!(
        "{} {}",
        style("Scene Inspector").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

fn minimal_line(report: &AnalysisReport) -> String {
    let similarity = &report.similarity;
    let mut line = format!(
        "{} {:.3}",
        if similarity.is_similar { "SIMILAR" } else { "DIFFERENT" },
        similarity.confidence
    );
    if let Some(changes) = &report.changes {
        line.push_str(&format!(
            " {} {:.3}",
            if changes.significant_change { "CHANGED" } else { "STABLE" },
            changes.change_magnitude
        ));
    }
    line
}

fn print_pretty_report(term: &Term, report: &AnalysisReport, inspector: &Inspector, verbose: bool) {
    let similarity = &report.similarity;
    let verdict = if similarity.is_similar {
        style("SIMILAR").green().bold()
    } else {
        style("DIFFERENT").red().bold()
    };

    term.write_line(&format!("  {} {}", style("Reference:").dim(), report.reference)).ok();
    term.write_line(&format!("  {} {}", style("Target:").dim(), report.target)).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "{} {} (confidence: {:.1}%)",
        style("Similarity:").bold(),
        verdict,
        similarity.confidence * 100.0
    ))
    .ok();
    term.write_line(&format!(
        "  Best method: {}",
        style(similarity.best_method.description()).cyan()
    ))
    .ok();

    if verbose {
        term.write_line("").ok();
        for line in ScoreTable::new(&similarity.scores, &inspector.config().weights)
            .render()
            .lines()
        {
            term.write_line(line).ok();
        }
    }

    for degraded in &similarity.degraded {
        term.write_line(&format!(
            "  {} {} scored 0.0: {}",
            style("!").yellow(),
            degraded.method.description(),
            style(&degraded.reason).dim()
        ))
        .ok();
    }

    term.write_line("").ok();
    let detections = &report.detection_summary;
    term.write_line(&format!(
        "{} {} total",
        style("Detections:").bold(),
        style(detections.total).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "  High confidence (≥{:.2}): {}",
        inspector.config().confidence_split,
        detections.high_confidence
    ))
    .ok();
    term.write_line(&format!(
        "  Low confidence (<{:.2}): {}",
        inspector.config().confidence_split,
        detections.low_confidence
    ))
    .ok();

    if let Some(changes) = &report.changes {
        print_changes(term, changes, inspector.config().confidence_split);
    }

    term.write_line("").ok();
    term.write_line(&format!("{}", style(explain(report).headline).bold())).ok();
    term.write_line(&format!(
        "{}",
        style(format!(
            "Processing time: {:.1} ms (preprocess {:.1}, scoring {:.1}, regions {:.1})",
            report.timings.total_ms,
            report.timings.preprocess_ms,
            report.timings.scoring_ms,
            report.timings.regions_ms
        ))
        .dim()
    ))
    .ok();
}

fn print_changes(term: &Term, changes: &ChangeResult, confidence_split: f64) {
    term.write_line("").ok();
    term.write_line(&format!("{}", style("Region Analysis:").bold().underlined())).ok();

    for region in &changes.regions {
        let marker = if region.significant {
            style("WARN").red().bold()
        } else {
            style("OK").green()
        };
        term.write_line(&format!(
            "  {:>4} {} ({}): {:.3}  pixel {:.3}, color {:.3}",
            marker,
            region.detection.class_name,
            region.detection.confidence_level(confidence_split),
            region.combined_difference,
            region.pixel_difference,
            region.histogram_difference
        ))
        .ok();
    }

    for skipped in &changes.skipped {
        term.write_line(&format!(
            "  {:>4} {} skipped: {}",
            style("SKIP").yellow(),
            skipped.class_name,
            style(&skipped.reason).dim()
        ))
        .ok();
    }

    term.write_line(&format!("  {}", changes.summary)).ok();
    term.write_line(&format!(
        "  Change magnitude: {:.3} → {}",
        changes.change_magnitude,
        if changes.significant_change {
            style("ALERT: significant changes detected").red().bold()
        } else {
            style("STABLE").green()
        }
    ))
    .ok();
}

fn print_pretty_batch(term: &Term, records: &[BatchRecord]) {
    let failed = records.iter().filter(|r| r.error.is_some()).count();
    term.write_line(&format!(
        "{} Batch Complete: {} pairs, {} failed",
        style("✓").green().bold(),
        style(records.len()).cyan(),
        style(failed).cyan()
    ))
    .ok();
    term.write_line("").ok();

    for (i, record) in records.iter().enumerate() {
        match (&record.report, &record.error) {
            (Some(report), _) => {
                term.write_line(&format!(
                    "  {} {} → {}",
                    style(format!("{}.", i + 1)).bold(),
                    record.reference,
                    record.target
                ))
                .ok();
                term.write_line(&format!("     {}", explain(report).headline)).ok();
            }
            (None, error) => {
                term.write_line(&format!(
                    "  {} {} → {}: {}",
                    style(format!("{}.", i + 1)).bold(),
                    record.reference,
                    record.target,
                    style(error.as_deref().unwrap_or("unknown error")).red()
                ))
                .ok();
            }
        }
    }
}

fn print_detection_sets(term: &Term, change: &DetectionSetChange) {
    term.write_line(&format!(
        "{} {} reference, {} target",
        style("Detections:").bold(),
        style(change.reference_count).cyan(),
        style(change.target_count).cyan()
    ))
    .ok();

    for class in &change.classes {
        let trend = match class.trend {
            ClassTrend::Unchanged => style("=").dim(),
            ClassTrend::Increased => style("+").red().bold(),
            ClassTrend::Decreased => style("-").green().bold(),
        };
        term.write_line(&format!(
            "  {} {}: {} → {}",
            trend, class.class_name, class.reference_count, class.target_count
        ))
        .ok();
    }

    term.write_line("").ok();
    term.write_line(&format!("  {}", change.summary)).ok();
    term.write_line(&format!(
        "  Change magnitude: {:.3} → {}",
        change.change_magnitude,
        if change.significant_change {
            style("ALERT: significant changes detected").red().bold()
        } else {
            style("STABLE").green()
        }
    ))
    .ok();
}
