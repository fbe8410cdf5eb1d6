//! Analysis layout: which (orientation, energy) runs exist and where their
//! files live.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use twotube_core::{DetectorId, ExtractionConfig};

/// One cell of the analysis grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunKey {
    /// Relative orientation of the two detectors in degrees.
    pub orientation_deg: u32,
    /// Source energy in keV.
    pub source_energy_kev: u32,
}

impl RunKey {
    #[must_use]
    pub fn new(orientation_deg: u32, source_energy_kev: u32) -> Self {
        Self {
            orientation_deg,
            source_energy_kev,
        }
    }

    /// Source energy in MeV.
    #[must_use]
    pub fn source_energy_mev(&self) -> f64 {
        f64::from(self.source_energy_kev) / 1000.0
    }

    /// Short `{orientation}_{energy}` tag used in output file names.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("{}_{}", self.orientation_deg, self.source_energy_kev)
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} MeV, orientation {}",
            self.source_energy_mev(),
            self.orientation_deg
        )
    }
}

/// Description of the configuration grid and its run files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisLayout {
    /// Directory holding the run files.
    pub data_dir: PathBuf,
    /// File name pattern; `{orientation}` and `{energy}` are substituted.
    pub file_pattern: String,
    /// Relative detector orientations in degrees.
    pub orientations_deg: Vec<u32>,
    /// Source energies in keV.
    pub source_energies_kev: Vec<u32>,
    /// Subsets to read from each file, concatenated in this order.
    /// Empty means every subset in file order.
    pub subset_labels: Vec<String>,
    /// The two detectors of interest.
    pub detectors: [DetectorId; 2],
    /// Compute timing features.
    pub with_timing: bool,
}

impl Default for AnalysisLayout {
    fn default() -> Self {
        Self::two_tubes_defaults()
    }
}

// On-disk schema wraps the layout in an "analysis" object.
#[derive(Deserialize)]
struct JsonConfig {
    #[serde(default)]
    analysis: AnalysisLayout,
}

impl AnalysisLayout {
    /// Default grid: orientations 0/90/180, sources 200 keV / 2 MeV / 10 MeV,
    /// two simulation passes per file, detectors 0 and 1.
    #[must_use]
    pub fn two_tubes_defaults() -> Self {
        Self {
            data_dir: PathBuf::from("two_tubes"),
            file_pattern: "two_{orientation}_{energy}.json".to_string(),
            orientations_deg: vec![0, 90, 180],
            source_energies_kev: vec![200, 2000, 10_000],
            subset_labels: vec!["SToGS;1".to_string(), "SToGS;2".to_string()],
            detectors: [0, 1],
            with_timing: true,
        }
    }

    /// Load a layout from a JSON file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// the layout fails [`Self::validate`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: JsonConfig = serde_json::from_reader(BufReader::new(file))?;
        config.analysis.validate()?;
        Ok(config.analysis)
    }

    /// Load a layout from a JSON string. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the string is not valid JSON or the layout fails
    /// [`Self::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let config: JsonConfig = serde_json::from_str(json)?;
        config.analysis.validate()?;
        Ok(config.analysis)
    }

    /// Checks that the grid is non-empty and the detectors differ.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLayout`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.orientations_deg.is_empty() {
            return Err(Error::InvalidLayout("no orientations configured".into()));
        }
        if self.source_energies_kev.is_empty() {
            return Err(Error::InvalidLayout("no source energies configured".into()));
        }
        if self.source_energies_kev.contains(&0) {
            return Err(Error::InvalidLayout("source energy must be positive".into()));
        }
        if !self.file_pattern.contains("{orientation}") || !self.file_pattern.contains("{energy}")
        {
            return Err(Error::InvalidLayout(format!(
                "file pattern '{}' must contain {{orientation}} and {{energy}}",
                self.file_pattern
            )));
        }
        self.extraction_config().validate()?;
        Ok(())
    }

    /// Extraction configuration for the layout's detector pair.
    #[must_use]
    pub fn extraction_config(&self) -> ExtractionConfig {
        ExtractionConfig::new(self.detectors[0], self.detectors[1]).with_timing(self.with_timing)
    }

    /// All grid cells, orientation-major.
    #[must_use]
    pub fn run_keys(&self) -> Vec<RunKey> {
        self.orientations_deg
            .iter()
            .flat_map(|&orientation| {
                self.source_energies_kev
                    .iter()
                    .map(move |&energy| RunKey::new(orientation, energy))
            })
            .collect()
    }

    /// Path of the run file for `key`.
    #[must_use]
    pub fn path_for(&self, key: RunKey) -> PathBuf {
        let name = self
            .file_pattern
            .replace("{orientation}", &key.orientation_deg.to_string())
            .replace("{energy}", &key.source_energy_kev.to_string());
        self.data_dir.join(name)
    }

    /// Path of the run file for `key`, or `None` if it does not exist.
    #[must_use]
    pub fn locate(&self, key: RunKey) -> Option<PathBuf> {
        let path = self.path_for(key);
        path.is_file().then_some(path)
    }
}
