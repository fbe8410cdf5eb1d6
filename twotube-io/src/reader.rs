//! Memory-mapped run-file readers.
//!
//! A run file holds one configuration's simulation output as one or more
//! labeled subsets, each with the jagged branches `Ev.UID`, `Ev.E` and
//! `Ev.T`:
//!
//! ```json
//! { "subsets": [ { "label": "SToGS;1",
//!                  "Ev.UID": [[0, 1], [1]],
//!                  "Ev.E":   [[0.1, 0.2], [0.3]],
//!                  "Ev.T":   [[1.0, 1.5], [2.0]] } ] }
//! ```

use crate::{Error, Result};
use log::debug;
use memmap2::Mmap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use twotube_core::{DetectorId, HitTable};

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without copying the whole file
/// into an owned buffer.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns the mapped file's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One labeled simulation pass loaded as a [`HitTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSubset {
    /// Subset label, e.g. `SToGS;1`.
    pub label: String,
    /// The subset's events.
    pub table: HitTable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct JsonRunFile {
    pub(crate) subsets: Vec<JsonSubset>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct JsonSubset {
    pub(crate) label: String,
    #[serde(rename = "Ev.UID", default, skip_serializing_if = "Option::is_none")]
    pub(crate) detector_id: Option<Vec<Vec<DetectorId>>>,
    #[serde(rename = "Ev.E", default, skip_serializing_if = "Option::is_none")]
    pub(crate) energy: Option<Vec<Vec<f64>>>,
    #[serde(rename = "Ev.T", default, skip_serializing_if = "Option::is_none")]
    pub(crate) time: Option<Vec<Vec<f64>>>,
}

impl JsonSubset {
    pub(crate) fn from_table(label: &str, table: &HitTable) -> Self {
        let jagged = |column: &[f64]| -> Vec<Vec<f64>> {
            table
                .offsets()
                .windows(2)
                .map(|w| column[w[0]..w[1]].to_vec())
                .collect()
        };
        Self {
            label: label.to_string(),
            detector_id: Some(
                table
                    .offsets()
                    .windows(2)
                    .map(|w| table.detector_ids()[w[0]..w[1]].to_vec())
                    .collect(),
            ),
            energy: Some(jagged(table.energies())),
            time: Some(jagged(table.times())),
        }
    }

    fn into_table(self) -> Result<HitTable> {
        let label = self.label;
        let missing = |branch: &str| {
            twotube_core::Error::MalformedInput(format!("subset '{label}' has no {branch} branch"))
        };
        let detector_id = self.detector_id.ok_or_else(|| missing("Ev.UID"))?;
        let energy = self.energy.ok_or_else(|| missing("Ev.E"))?;
        let time = self.time.ok_or_else(|| missing("Ev.T"))?;

        HitTable::from_jagged(detector_id, energy, time).map_err(|err| match err {
            twotube_core::Error::MalformedInput(msg) => {
                twotube_core::Error::MalformedInput(format!("subset '{label}': {msg}")).into()
            }
            other => other.into(),
        })
    }

    fn into_labeled(self) -> Result<LabeledSubset> {
        let label = self.label.clone();
        Ok(LabeledSubset {
            label,
            table: self.into_table()?,
        })
    }
}

/// Reader for one run file.
pub struct RunFileReader {
    path: PathBuf,
    file_size: usize,
    subsets: Vec<JsonSubset>,
}

impl RunFileReader {
    /// Opens and parses a run file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped or is not a valid run
    /// file document.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if std::fs::metadata(&path)?.len() == 0 {
            return Err(Error::InvalidFormat(format!(
                "empty run file: {}",
                path.as_ref().display()
            )));
        }
        let reader = MappedFileReader::open(path)?;

        let document: JsonRunFile = serde_json::from_slice(reader.as_bytes())?;
        debug!(
            "{}: {} subsets, {} bytes",
            reader.path().display(),
            document.subsets.len(),
            reader.len()
        );

        Ok(Self {
            path: reader.path().to_path_buf(),
            file_size: reader.len(),
            subsets: document.subsets,
        })
    }

    /// Returns the path the reader was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.file_size
    }

    /// Labels of all subsets, in file order.
    #[must_use]
    pub fn subset_labels(&self) -> Vec<&str> {
        self.subsets.iter().map(|s| s.label.as_str()).collect()
    }

    /// Loads the subset with the given label, consuming the reader.
    ///
    /// # Errors
    /// Returns [`Error::SubsetNotFound`] for an unknown label and a core
    /// `MalformedInput` error for missing or ragged branches.
    pub fn read_subset(self, label: &str) -> Result<HitTable> {
        let path = self.path;
        self.subsets
            .into_iter()
            .find(|s| s.label == label)
            .ok_or_else(|| Error::SubsetNotFound {
                label: label.to_string(),
                path,
            })?
            .into_table()
    }

    /// Loads the given subsets in the order requested, consuming the reader.
    ///
    /// Branches are moved into the tables rather than copied. A label listed
    /// more than once yields a copy of the already loaded table.
    ///
    /// # Errors
    /// Returns the first error encountered.
    pub fn read_subsets<S: AsRef<str>>(self, labels: &[S]) -> Result<Vec<LabeledSubset>> {
        let path = self.path;
        let mut pending: Vec<Option<JsonSubset>> = self.subsets.into_iter().map(Some).collect();
        let mut loaded: Vec<LabeledSubset> = Vec::with_capacity(labels.len());

        for label in labels {
            let label = label.as_ref();
            if let Some(repeat) = loaded.iter().find(|s| s.label == label).cloned() {
                loaded.push(repeat);
                continue;
            }

            let subset = pending
                .iter_mut()
                .find(|s| s.as_ref().is_some_and(|s| s.label == label))
                .and_then(Option::take)
                .ok_or_else(|| Error::SubsetNotFound {
                    label: label.to_string(),
                    path: path.clone(),
                })?;
            loaded.push(subset.into_labeled()?);
        }

        Ok(loaded)
    }

    /// Loads every subset in file order, consuming the reader.
    ///
    /// # Errors
    /// Returns the first error encountered.
    pub fn read_all(self) -> Result<Vec<LabeledSubset>> {
        self.subsets
            .into_par_iter()
            .map(JsonSubset::into_labeled)
            .collect()
    }
}
