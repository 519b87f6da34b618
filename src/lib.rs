//! # Scene Inspector
//!
//! Decides whether two captures show the same scene, and whether the regions
//! an external detector reported have changed since the reference capture.
//!
//! ## Two Stages
//! - **Similarity** - six independent methods fused into one confidence
//! - **Change** - per-box pixel and color differences reduced to one magnitude
//!
//! ## Architecture
//! - `core` - The comparison engine
//! - `events` - Progress reporting over channels
//! - `error` - Error types per concern
//!
//! ## Example
//! ```rust,ignore
//! use scene_inspector::core::{ImageSource, Inspector};
//!
//! let inspector = Inspector::builder().similarity_threshold(0.5).build()?;
//! let report = inspector.analyze(&reference, &target, Some(&boxes))?;
//! println!("{}", report.headline());
//! ```

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{InspectorError, Result};

/// Initialize tracing for the library
///
/// `RUST_LOG` wins when set; otherwise warnings only, or debug output for
/// this crate when `verbose` is true.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "warn,scene_inspector=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
