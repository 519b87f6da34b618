//! # scene-inspect CLI
//!
//! Command-line interface for the scene inspector.
//!
//! ## Usage
//! ```bash
//! scene-inspect compare baseline.jpg inspection.jpg --detections boxes.json
//! scene-inspect batch pairs.json --output json --save results.json
//! scene-inspect detections baseline_boxes.json inspection_boxes.json
//! ```

mod cli;

use scene_inspector::Result;

fn main() -> Result<()> {
    cli::run()
}
