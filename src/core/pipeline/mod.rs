//! # Pipeline Module
//!
//! Orchestrates the full comparison of a reference and a target capture.
//!
//! ## Pipeline Stages
//! 1. **Preprocess** - decode both captures, grayscale, canonical size, equalize
//! 2. **Score** - run the six similarity methods concurrently
//! 3. **Fuse** - weighted confidence and same-scene verdict
//! 4. **Regions** - when boxes are supplied, compare each box concurrently
//! 5. **Aggregate** - overall change magnitude and verdict
//!
//! ## Parallelism
//! Uses rayon for the methods, the regions and batch pairs.

mod batch;
mod executor;

pub use batch::PairRequest;
pub use executor::{Inspector, InspectorBuilder};
