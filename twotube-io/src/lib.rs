//! twotube-io: Run-file I/O for twotube.
//!
//! This crate reads memory-mapped run files into hit tables, describes the
//! analysis grid, and writes feature tables, histograms and summaries.
//!

mod error;
pub mod layout;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use layout::{AnalysisLayout, RunKey};
pub use reader::{LabeledSubset, MappedFileReader, RunFileReader};
pub use writer::{write_run_file, write_summary_json, FeatureFileWriter, RunSummary};
