#![allow(clippy::float_cmp)]
use approx::assert_relative_eq;
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use twotube_algorithms::{extract_subsets, ExtractionAlgorithm, ExtractionConfig};
use twotube_core::{
    extract, CoincidenceExtraction, CoincidenceExtractor, Error, EventView, HitData, HitTable,
};

/// Hits on detectors 0..3, with one in five carrying zero energy.
fn hit() -> impl Strategy<Value = HitData> {
    (
        0..3i32,
        prop_oneof![1 => Just(0.0), 4 => 0.0..2.0f64],
        -5.0..5.0f64,
    )
        .prop_map(|(detector, energy, time)| HitData::new(detector, energy, time))
}

/// Runs of up to 200 events with 0 to 6 hits each.
fn run() -> impl Strategy<Value = HitTable> {
    prop::collection::vec(prop::collection::vec(hit(), 0..7), 0..200)
        .prop_map(|events| HitTable::from_events(&events).unwrap())
}

/// Seeded run with the same hit distribution as [`run`], for large fixtures.
fn generate_run(seed: u64, events: usize) -> HitTable {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut table = HitTable::with_capacity(events, events * 3);
    for _ in 0..events {
        let hits = rng.random_range(0..7);
        let event: Vec<HitData> = (0..hits)
            .map(|_| {
                let detector = rng.random_range(0..3);
                let energy = if rng.random_bool(0.2) {
                    0.0
                } else {
                    rng.random_range(0.0..2.0)
                };
                HitData::new(detector, energy, rng.random_range(-5.0..5.0))
            })
            .collect();
        table.push_event(event).unwrap();
    }
    table
}

fn coincident_events(run: &HitTable, a: i32, b: i32) -> usize {
    run.events()
        .filter(|event| event.has_detector(a) && event.has_detector(b))
        .count()
}

fn detector_energy(event: &EventView<'_>, detector: i32) -> f64 {
    event
        .hits()
        .filter(|hit| hit.detector_id == detector)
        .map(|hit| hit.energy)
        .sum()
}

fn table(events: &[&[(i32, f64, f64)]]) -> HitTable {
    let events: Vec<Vec<HitData>> = events
        .iter()
        .map(|hits| hits.iter().copied().map(HitData::from).collect())
        .collect();
    HitTable::from_events(&events).unwrap()
}

proptest! {
    #[test]
    fn test_row_count_bounded_by_coincidences(run in run(), with_timing in any::<bool>()) {
        let features = extract(&run, 0, 1, with_timing).unwrap();
        prop_assert!(features.len() <= coincident_events(&run, 0, 1));
        prop_assert!(features.len() <= run.num_events());
    }

    #[test]
    fn test_energy_sums_positive(run in run()) {
        let features = extract(&run, 0, 1, true).unwrap();
        prop_assert!(features.sum_energy_a().iter().all(|&e| e > 0.0));
        prop_assert!(features.sum_energy_b().iter().all(|&e| e > 0.0));
    }

    #[test]
    fn test_timing_variant_matches_energy_only(run in run()) {
        let timed = extract(&run, 0, 1, true).unwrap();
        let energy_only = extract(&run, 0, 1, false).unwrap();
        prop_assert_eq!(timed.len(), energy_only.len());
        prop_assert_eq!(timed.sum_energy_a(), energy_only.sum_energy_a());
        prop_assert_eq!(timed.sum_energy_b(), energy_only.sum_energy_b());
    }

    #[test]
    fn test_weighted_mean_within_hit_time_range(run in run()) {
        let features = extract(&run, 0, 1, true).unwrap();
        let mean_a = features.mean_time_a().unwrap();
        let mean_b = features.mean_time_b().unwrap();

        let surviving: Vec<EventView<'_>> = run
            .events()
            .filter(|event| {
                event.has_detector(0)
                    && event.has_detector(1)
                    && detector_energy(event, 0) != 0.0
                    && detector_energy(event, 1) != 0.0
            })
            .collect();
        prop_assert_eq!(surviving.len(), features.len());

        for (row, event) in surviving.iter().enumerate() {
            for (detector, mean) in [(0, mean_a[row]), (1, mean_b[row])] {
                let times: Vec<f64> = event
                    .hits()
                    .filter(|hit| hit.detector_id == detector)
                    .map(|hit| hit.time)
                    .collect();
                let min = times.iter().copied().fold(f64::INFINITY, f64::min);
                let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(
                    mean >= min - 1e-9 && mean <= max + 1e-9,
                    "mean {} outside [{}, {}]",
                    mean,
                    min,
                    max
                );
            }
        }
    }

    #[test]
    fn test_equal_detectors_rejected_for_any_run(run in run(), detector in -3..5i32) {
        for with_timing in [true, false] {
            prop_assert!(matches!(
                extract(&run, detector, detector, with_timing),
                Err(Error::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_bulk_and_scalar_agree(run in run(), with_timing in any::<bool>()) {
        let config = ExtractionConfig::new(1, 0).with_timing(with_timing);
        let bulk = ExtractionAlgorithm::Bulk.extractor(config.clone());
        let scalar = ExtractionAlgorithm::Scalar.extractor(config);
        prop_assert_eq!(bulk.extract(&run).unwrap(), scalar.extract(&run).unwrap());
    }
}

#[test]
fn test_bulk_and_scalar_agree_on_large_runs() {
    for seed in 1..=4 {
        let run = generate_run(seed * 7919, 5000);
        let config = ExtractionConfig::new(0, 1);
        let bulk = ExtractionAlgorithm::Bulk.extractor(config.clone());
        let scalar = ExtractionAlgorithm::Scalar.extractor(config);

        let features = bulk.extract(&run).unwrap();
        assert!(!features.is_empty());
        assert_eq!(features, scalar.extract(&run).unwrap());
    }
}

#[test]
fn test_equal_detectors_rejected_for_empty_run() {
    assert!(matches!(
        extract(&HitTable::new(), 5, 5, true),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_scenario_single_coincidence() {
    let run = table(&[&[(0, 1.0, 0.0), (1, 2.0, 1.0)]]);
    let features = extract(&run, 0, 1, true).unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features.sum_energy_a(), &[1.0]);
    assert_eq!(features.sum_energy_b(), &[2.0]);
    assert_eq!(features.mean_time_a().unwrap(), &[0.0]);
    assert_eq!(features.mean_time_b().unwrap(), &[1.0]);
    assert_eq!(features.delta_time().unwrap(), &[1.0]);
}

#[test]
fn test_scenario_zero_energy_guard() {
    let run = table(&[&[(0, 0.0, 0.0), (1, 2.0, 1.0)]]);
    assert_eq!(coincident_events(&run, 0, 1), 1);
    assert!(extract(&run, 0, 1, true).unwrap().is_empty());
}

#[test]
fn test_scenario_no_second_detector() {
    let run = table(&[&[(0, 1.0, 0.0)]]);
    assert!(extract(&run, 0, 1, true).unwrap().is_empty());
}

#[test]
fn test_scenario_two_events() {
    let run = table(&[
        &[(0, 1.0, 0.0), (1, 2.0, 1.0)],
        &[(0, 3.0, 2.0), (0, 1.0, 4.0), (1, 2.0, 3.0)],
    ]);
    let features = extract(&run, 0, 1, true).unwrap();
    assert_eq!(features.len(), 2);

    let second = features.row(1).unwrap();
    assert_eq!(second.sum_energy_a, 4.0);
    assert_eq!(second.sum_energy_b, 2.0);
    assert_relative_eq!(second.mean_time_a.unwrap(), 2.5);
    assert_relative_eq!(second.mean_time_b.unwrap(), 3.0);
    assert_relative_eq!(second.delta_time.unwrap(), 0.5);
}

#[test]
fn test_subsets_concatenate_not_overwrite() {
    let first = generate_run(11, 500);
    let second = generate_run(12, 500);
    let extractor = CoincidenceExtractor::new();

    let combined = extract_subsets(&extractor, [&first, &second]).unwrap();
    let only_first = extractor.extract(&first).unwrap();
    let only_second = extractor.extract(&second).unwrap();

    assert_eq!(combined.len(), only_first.len() + only_second.len());
    assert_eq!(
        &combined.sum_energy_a()[..only_first.len()],
        only_first.sum_energy_a()
    );
    assert_eq!(
        &combined.delta_time().unwrap()[only_first.len()..],
        only_second.delta_time().unwrap()
    );

    // Extracting the appended table gives the same rows.
    let mut merged = first.clone();
    merged.append(&second);
    assert_eq!(extractor.extract(&merged).unwrap(), combined);
}
