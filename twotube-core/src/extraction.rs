//! Coincidence extraction traits and configuration.
//!
//! Turns a run of jagged hit lists into one [`EventFeatureTable`] row per
//! event that registered energy in both detectors of interest.
#![allow(clippy::float_cmp)]

use log::debug;

use crate::error::{Error, Result};
use crate::features::{EventFeatureTable, TimingColumns};
use crate::hit::DetectorId;
use crate::segment;
use crate::soa::HitTable;

/// Configuration for coincidence extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// First detector of interest.
    pub detector_a: DetectorId,
    /// Second detector of interest.
    pub detector_b: DetectorId,
    /// Compute energy-weighted mean times and the time difference.
    pub with_timing: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            detector_a: 0,
            detector_b: 1,
            with_timing: true,
        }
    }
}

impl ExtractionConfig {
    /// Creates a configuration for the pair `(a, b)` with timing enabled.
    #[must_use]
    pub fn new(detector_a: DetectorId, detector_b: DetectorId) -> Self {
        Self {
            detector_a,
            detector_b,
            with_timing: true,
        }
    }

    /// Set the detector pair.
    #[must_use]
    pub fn with_detectors(mut self, detector_a: DetectorId, detector_b: DetectorId) -> Self {
        self.detector_a = detector_a;
        self.detector_b = detector_b;
        self
    }

    /// Enable or disable timing features.
    #[must_use]
    pub fn with_timing(mut self, with_timing: bool) -> Self {
        self.with_timing = with_timing;
        self
    }

    /// Checks that the two detectors of interest are distinct.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if `detector_a == detector_b`.
    pub fn validate(&self) -> Result<()> {
        if self.detector_a == self.detector_b {
            return Err(Error::InvalidArgument(format!(
                "detectors of interest must differ (both are {})",
                self.detector_a
            )));
        }
        Ok(())
    }

    fn empty_table(&self) -> EventFeatureTable {
        EventFeatureTable::empty(self.detector_a, self.detector_b, self.with_timing)
    }
}

/// Trait for coincidence extraction algorithms.
pub trait CoincidenceExtraction: Send + Sync {
    /// Algorithm name.
    fn name(&self) -> &'static str;

    /// Configure the extraction.
    fn configure(&mut self, config: ExtractionConfig);

    /// Get current configuration.
    fn config(&self) -> &ExtractionConfig;

    /// Extract per-event features from one run.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the configured detectors are equal.
    fn extract(&self, run: &HitTable) -> Result<EventFeatureTable>;
}

/// Extracts features for the pair `(detector_a, detector_b)` from `run`.
///
/// # Errors
/// Returns [`Error::InvalidArgument`] if `detector_a == detector_b`.
pub fn extract(
    run: &HitTable,
    detector_a: DetectorId,
    detector_b: DetectorId,
    with_timing: bool,
) -> Result<EventFeatureTable> {
    CoincidenceExtractor::with_config(
        ExtractionConfig::new(detector_a, detector_b).with_timing(with_timing),
    )
    .extract(run)
}

/// Bulk coincidence extraction over the flat hit columns.
///
/// 1. Hit masks for each detector, reduced to per-event presence flags
/// 2. Coincidence mask drops events missing either detector
/// 3. Masked energy sums per detector
/// 4. Events with a zero energy sum on either side are dropped
/// 5. Weighted time sums are compressed by the same guard, then divided
#[derive(Clone, Debug, Default)]
pub struct CoincidenceExtractor {
    config: ExtractionConfig,
}

impl CoincidenceExtractor {
    /// Create with default configuration (detectors 0 and 1, timing on).
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ExtractionConfig::default(),
        }
    }

    /// Create with custom configuration.
    #[must_use]
    pub fn with_config(config: ExtractionConfig) -> Self {
        Self { config }
    }
}

impl CoincidenceExtraction for CoincidenceExtractor {
    fn name(&self) -> &'static str {
        "Coincidence"
    }

    fn configure(&mut self, config: ExtractionConfig) {
        self.config = config;
    }

    fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn extract(&self, run: &HitTable) -> Result<EventFeatureTable> {
        let config = &self.config;
        config.validate()?;

        let has_a = segment::segment_any(
            run.offsets(),
            &segment::hit_mask(run.detector_ids(), config.detector_a),
        );
        let has_b = segment::segment_any(
            run.offsets(),
            &segment::hit_mask(run.detector_ids(), config.detector_b),
        );
        let coincident = run.select_events(&segment::mask_and(&has_a, &has_b));

        if coincident.is_empty() {
            debug!("no coincident events among {}", run.num_events());
            return Ok(config.empty_table());
        }

        let offsets = coincident.offsets();
        let energy = coincident.energies();
        let mask_a = segment::hit_mask(coincident.detector_ids(), config.detector_a);
        let mask_b = segment::hit_mask(coincident.detector_ids(), config.detector_b);

        let sum_a = segment::segment_masked_sum(offsets, energy, &mask_a);
        let sum_b = segment::segment_masked_sum(offsets, energy, &mask_b);

        let keep: Vec<bool> = sum_a
            .iter()
            .zip(&sum_b)
            .map(|(&a, &b)| a != 0.0 && b != 0.0)
            .collect();

        let sum_energy_a = segment::compress(&sum_a, &keep);
        let sum_energy_b = segment::compress(&sum_b, &keep);

        let timing = if config.with_timing {
            let times = coincident.times();
            let weighted_a = segment::compress(
                &segment::segment_masked_dot(offsets, times, energy, &mask_a),
                &keep,
            );
            let weighted_b = segment::compress(
                &segment::segment_masked_dot(offsets, times, energy, &mask_b),
                &keep,
            );
            Some(TimingColumns::from_means(
                divide(&weighted_a, &sum_energy_a),
                divide(&weighted_b, &sum_energy_b),
            ))
        } else {
            None
        };

        debug!(
            "{} of {} events coincident, {} with energy on both detectors",
            coincident.num_events(),
            run.num_events(),
            sum_energy_a.len()
        );

        EventFeatureTable::from_columns(
            (config.detector_a, config.detector_b),
            sum_energy_a,
            sum_energy_b,
            timing,
        )
    }
}

/// Per-event reference implementation of [`CoincidenceExtractor`].
///
/// Walks each event's hits directly. Produces the same rows, bit for bit,
/// and exists to cross-check the bulk path.
#[derive(Clone, Debug, Default)]
pub struct ScalarCoincidenceExtractor {
    config: ExtractionConfig,
}

impl ScalarCoincidenceExtractor {
    /// Create with default configuration (detectors 0 and 1, timing on).
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ExtractionConfig::default(),
        }
    }

    /// Create with custom configuration.
    #[must_use]
    pub fn with_config(config: ExtractionConfig) -> Self {
        Self { config }
    }
}

impl CoincidenceExtraction for ScalarCoincidenceExtractor {
    fn name(&self) -> &'static str {
        "ScalarCoincidence"
    }

    fn configure(&mut self, config: ExtractionConfig) {
        self.config = config;
    }

    fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn extract(&self, run: &HitTable) -> Result<EventFeatureTable> {
        let config = &self.config;
        config.validate()?;

        let (a, b) = (config.detector_a, config.detector_b);
        let mut sum_energy_a = Vec::new();
        let mut sum_energy_b = Vec::new();
        let mut mean_time_a = Vec::new();
        let mut mean_time_b = Vec::new();

        for event in run.events() {
            if !(event.has_detector(a) && event.has_detector(b)) {
                continue;
            }

            let (mut energy_a, mut energy_b) = (0.0, 0.0);
            let (mut weighted_a, mut weighted_b) = (0.0, 0.0);
            for hit in event.hits() {
                if hit.detector_id == a {
                    energy_a += hit.energy;
                    weighted_a += hit.weighted_time();
                } else if hit.detector_id == b {
                    energy_b += hit.energy;
                    weighted_b += hit.weighted_time();
                }
            }

            if energy_a == 0.0 || energy_b == 0.0 {
                continue;
            }

            sum_energy_a.push(energy_a);
            sum_energy_b.push(energy_b);
            if config.with_timing {
                mean_time_a.push(weighted_a / energy_a);
                mean_time_b.push(weighted_b / energy_b);
            }
        }

        let timing = config
            .with_timing
            .then(|| TimingColumns::from_means(mean_time_a, mean_time_b));

        EventFeatureTable::from_columns((a, b), sum_energy_a, sum_energy_b, timing)
    }
}

fn divide(numerators: &[f64], denominators: &[f64]) -> Vec<f64> {
    numerators
        .iter()
        .zip(denominators)
        .map(|(n, d)| n / d)
        .collect()
}
