//! High-level processing helpers that combine extraction across subsets
//! and runs.

use log::{debug, info};
use rayon::prelude::*;
use twotube_core::error::Result;
use twotube_core::extraction::{
    CoincidenceExtraction, CoincidenceExtractor, ExtractionConfig, ScalarCoincidenceExtractor,
};
use twotube_core::features::EventFeatureTable;
use twotube_core::soa::HitTable;

/// Extraction implementation selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExtractionAlgorithm {
    /// Bulk masking and segmented reductions over the whole run.
    #[default]
    Bulk,
    /// Per-event reference walk.
    Scalar,
}

impl ExtractionAlgorithm {
    /// Builds the extractor for this algorithm.
    #[must_use]
    pub fn extractor(self, config: ExtractionConfig) -> Box<dyn CoincidenceExtraction> {
        match self {
            Self::Bulk => Box::new(CoincidenceExtractor::with_config(config)),
            Self::Scalar => Box::new(ScalarCoincidenceExtractor::with_config(config)),
        }
    }
}

/// Extract features from one run with the selected algorithm.
///
/// # Errors
/// Propagates extraction errors.
pub fn extract_run(
    run: &HitTable,
    algorithm: ExtractionAlgorithm,
    config: &ExtractionConfig,
) -> Result<EventFeatureTable> {
    algorithm.extractor(config.clone()).extract(run)
}

/// Extract every subset of one configuration and concatenate the results
/// in subset order.
///
/// Each subset is extracted on its own; the returned table holds the rows of
/// the first subset followed by those of the second, and so on. No subset is
/// dropped or overwritten. An empty subset list yields an empty table.
///
/// # Errors
/// Returns the first extraction error encountered.
pub fn extract_subsets<'a, E, I>(extractor: &E, subsets: I) -> Result<EventFeatureTable>
where
    E: CoincidenceExtraction + ?Sized,
    I: IntoIterator<Item = &'a HitTable>,
{
    let config = extractor.config();
    config.validate()?;

    let mut all =
        EventFeatureTable::empty(config.detector_a, config.detector_b, config.with_timing);
    for (index, subset) in subsets.into_iter().enumerate() {
        let features = extractor.extract(subset)?;
        debug!(
            "subset {index}: {} events, {} coincidences",
            subset.num_events(),
            features.len()
        );
        all.append(&features)?;
    }
    Ok(all)
}

/// Result of one run processed by [`extract_runs`].
#[derive(Debug)]
pub struct RunFeatures<K> {
    /// Caller-supplied identity of the run.
    pub key: K,
    /// Concatenated features of the run's subsets, or the run's own error.
    pub features: Result<EventFeatureTable>,
}

/// Extract many independent runs in parallel.
///
/// Each entry pairs a caller key with the run's subsets. Results come back in
/// input order; a failing run does not affect the others.
pub fn extract_runs<K, E>(extractor: &E, runs: Vec<(K, Vec<HitTable>)>) -> Vec<RunFeatures<K>>
where
    K: Send,
    E: CoincidenceExtraction + ?Sized,
{
    let total = runs.len();
    let results: Vec<RunFeatures<K>> = runs
        .into_par_iter()
        .map(|(key, subsets)| RunFeatures {
            key,
            features: extract_subsets(extractor, &subsets),
        })
        .collect();

    let failed = results.iter().filter(|r| r.features.is_err()).count();
    info!(
        "{} extracted {total} runs ({failed} failed)",
        extractor.name()
    );
    results
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use twotube_core::{Error, HitData};

    fn subset(energy_a: f64, energy_b: f64) -> HitTable {
        HitTable::from_events(&[vec![
            HitData::new(0, energy_a, 0.0),
            HitData::new(1, energy_b, 1.0),
        ]])
        .unwrap()
    }

    #[test]
    fn test_extract_subsets_concatenates_in_order() {
        let extractor = CoincidenceExtractor::new();
        let subsets = [subset(1.0, 2.0), subset(3.0, 4.0)];
        let features = extract_subsets(&extractor, &subsets).unwrap();

        assert_eq!(features.len(), 2);
        assert_eq!(features.sum_energy_a(), &[1.0, 3.0]);
        assert_eq!(features.sum_energy_b(), &[2.0, 4.0]);
    }

    #[test]
    fn test_extract_subsets_empty() {
        let extractor = CoincidenceExtractor::new();
        let features = extract_subsets(&extractor, []).unwrap();
        assert!(features.is_empty());
        assert!(features.has_timing());
    }

    #[test]
    fn test_extract_subsets_validates_config() {
        let extractor = CoincidenceExtractor::with_config(ExtractionConfig::new(3, 3));
        let err = extract_subsets(&extractor, []).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_extract_runs_keeps_order() {
        let extractor = ExtractionAlgorithm::Bulk.extractor(ExtractionConfig::default());
        let runs = vec![
            ("first", vec![subset(1.0, 1.0)]),
            ("empty", vec![]),
            ("second", vec![subset(2.0, 2.0), subset(0.0, 2.0)]),
        ];
        let results = extract_runs(extractor.as_ref(), runs);

        let keys: Vec<_> = results.iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["first", "empty", "second"]);
        let counts: Vec<_> = results
            .iter()
            .map(|r| r.features.as_ref().unwrap().len())
            .collect();
        assert_eq!(counts, vec![1, 0, 1]);
    }

    #[test]
    fn test_extract_run_algorithms_agree() {
        let run = subset(0.5, 0.25);
        let config = ExtractionConfig::default();
        let bulk = extract_run(&run, ExtractionAlgorithm::Bulk, &config).unwrap();
        let scalar = extract_run(&run, ExtractionAlgorithm::Scalar, &config).unwrap();
        assert_eq!(bulk, scalar);
    }
}
