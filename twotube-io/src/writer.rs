//! File writers for feature tables, histograms and run files.

use crate::layout::RunKey;
use crate::reader::{JsonRunFile, JsonSubset, LabeledSubset};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use twotube_algorithms::Histogram1D;
use twotube_core::EventFeatureTable;

/// Writer for extracted feature tables and their histograms.
pub struct FeatureFileWriter {
    writer: BufWriter<File>,
}

impl FeatureFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes features as CSV, one row per coincident event.
    ///
    /// Timing columns are present only if the table carries them.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_features_csv(&mut self, features: &EventFeatureTable, header: bool) -> Result<()> {
        if header {
            if features.has_timing() {
                writeln!(
                    self.writer,
                    "sum_energy_a,sum_energy_b,mean_time_a,mean_time_b,delta_time"
                )?;
            } else {
                writeln!(self.writer, "sum_energy_a,sum_energy_b")?;
            }
        }

        for row in features.iter() {
            write!(self.writer, "{},{}", row.sum_energy_a, row.sum_energy_b)?;
            if let (Some(ta), Some(tb), Some(dt)) = (row.mean_time_a, row.mean_time_b, row.delta_time)
            {
                write!(self.writer, ",{ta},{tb},{dt}")?;
            }
            writeln!(self.writer)?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes features as binary data.
    ///
    /// Format: for each row, `f64` little-endian `sum_energy_a`,
    /// `sum_energy_b`, then `mean_time_a`, `mean_time_b`, `delta_time` when
    /// timing was computed. 16 or 40 bytes per row.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_features_binary(&mut self, features: &EventFeatureTable) -> Result<()> {
        for row in features.iter() {
            self.writer.write_all(&row.sum_energy_a.to_le_bytes())?;
            self.writer.write_all(&row.sum_energy_b.to_le_bytes())?;
            for value in [row.mean_time_a, row.mean_time_b, row.delta_time]
                .into_iter()
                .flatten()
            {
                self.writer.write_all(&value.to_le_bytes())?;
            }
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes a histogram as `lower,upper,count` CSV, followed by
    /// `underflow` / `overflow` comment lines.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_histogram_csv(&mut self, histogram: &Histogram1D) -> Result<()> {
        writeln!(self.writer, "lower,upper,count")?;
        for (lower, upper, count) in histogram.iter_bins() {
            writeln!(self.writer, "{lower},{upper},{count}")?;
        }
        writeln!(self.writer, "# underflow={}", histogram.underflow())?;
        writeln!(self.writer, "# overflow={}", histogram.overflow())?;

        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Per-configuration entry of the run summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Grid cell.
    #[serde(flatten)]
    pub key: RunKey,
    /// Subsets that were concatenated, in order.
    pub subsets: Vec<String>,
    /// Total events across those subsets.
    pub events: usize,
    /// Rows in the concatenated feature table.
    pub coincidences: usize,
}

/// Writes the run summary as pretty-printed JSON.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_summary_json<P: AsRef<Path>>(path: P, summaries: &[RunSummary]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, summaries)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes labeled subsets as a run file readable by
/// [`RunFileReader`](crate::RunFileReader).
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_run_file<P: AsRef<Path>>(path: P, subsets: &[LabeledSubset]) -> Result<()> {
    let document = JsonRunFile {
        subsets: subsets
            .iter()
            .map(|s| JsonSubset::from_table(&s.label, &s.table))
            .collect(),
    };
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &document)?;
    writer.flush()?;
    Ok(())
}
