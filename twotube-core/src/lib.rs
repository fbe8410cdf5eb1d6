//! twotube-core: Core types and coincidence extraction for two-detector
//! event analysis.
//!
//! This crate provides the jagged per-event hit storage, the per-event
//! feature table, and the coincidence extractor that connects them.
//!

pub mod error;
pub mod extraction;
pub mod features;
pub mod hit;
mod segment;
pub mod soa;

pub use error::{Error, Result};
pub use extraction::{
    extract, CoincidenceExtraction, CoincidenceExtractor, ExtractionConfig,
    ScalarCoincidenceExtractor,
};
pub use features::{EventFeature, EventFeatureTable, TimingColumns};
pub use hit::{DetectorId, Hit, HitData};
pub use soa::{EventView, HitTable};
