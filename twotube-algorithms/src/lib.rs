//! twotube-algorithms: Processing helpers for coincidence analysis.
//!
//! This crate provides:
//! - **Subset aggregation** - ordered concatenation of per-subset features
//! - **Parallel runs** - independent extraction of many runs with rayon
//! - **Histograms** - fixed-bin histograms for energy and time-difference columns
//!
#![warn(missing_docs)]

pub mod histogram;
mod processing;

pub use histogram::{delta_time_histogram, energy_histogram, Histogram1D};
pub use processing::{
    extract_run, extract_runs, extract_subsets, ExtractionAlgorithm, RunFeatures,
};

// Re-export core extraction types
pub use twotube_core::extraction::{CoincidenceExtraction, ExtractionConfig};
