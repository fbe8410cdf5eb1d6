//! Per-event feature rows produced by coincidence extraction.

use crate::error::{Error, Result};
use crate::hit::DetectorId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One output row: the features of a single coincident event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventFeature {
    /// Summed energy on detector a.
    pub sum_energy_a: f64,
    /// Summed energy on detector b.
    pub sum_energy_b: f64,
    /// Energy-weighted mean hit time on detector a (timing only).
    pub mean_time_a: Option<f64>,
    /// Energy-weighted mean hit time on detector b (timing only).
    pub mean_time_b: Option<f64>,
    /// `mean_time_b - mean_time_a` (timing only).
    pub delta_time: Option<f64>,
}

/// Timing columns of an [`EventFeatureTable`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingColumns {
    /// Energy-weighted mean hit time on detector a.
    pub mean_time_a: Vec<f64>,
    /// Energy-weighted mean hit time on detector b.
    pub mean_time_b: Vec<f64>,
    /// `mean_time_b - mean_time_a`.
    pub delta_time: Vec<f64>,
}

impl TimingColumns {
    /// Builds timing columns from the two mean-time columns.
    #[must_use]
    pub fn from_means(mean_time_a: Vec<f64>, mean_time_b: Vec<f64>) -> Self {
        let delta_time = mean_time_a
            .iter()
            .zip(&mean_time_b)
            .map(|(a, b)| b - a)
            .collect();
        Self {
            mean_time_a,
            mean_time_b,
            delta_time,
        }
    }

    fn append(&mut self, other: &TimingColumns) {
        self.mean_time_a.extend_from_slice(&other.mean_time_a);
        self.mean_time_b.extend_from_slice(&other.mean_time_b);
        self.delta_time.extend_from_slice(&other.delta_time);
    }
}

/// Column-wise table of [`EventFeature`] rows for one detector pair.
///
/// All columns share one length, which is the coincidence count.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawEventFeatureTable"))]
pub struct EventFeatureTable {
    detectors: (DetectorId, DetectorId),
    sum_energy_a: Vec<f64>,
    sum_energy_b: Vec<f64>,
    timing: Option<TimingColumns>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawEventFeatureTable {
    detectors: (DetectorId, DetectorId),
    sum_energy_a: Vec<f64>,
    sum_energy_b: Vec<f64>,
    timing: Option<TimingColumns>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawEventFeatureTable> for EventFeatureTable {
    type Error = Error;

    fn try_from(raw: RawEventFeatureTable) -> Result<Self> {
        Self::from_columns(raw.detectors, raw.sum_energy_a, raw.sum_energy_b, raw.timing)
    }
}

impl EventFeatureTable {
    /// Creates an empty table for the given detector pair.
    #[must_use]
    pub fn empty(detector_a: DetectorId, detector_b: DetectorId, with_timing: bool) -> Self {
        Self {
            detectors: (detector_a, detector_b),
            sum_energy_a: Vec::new(),
            sum_energy_b: Vec::new(),
            timing: with_timing.then(TimingColumns::default),
        }
    }

    /// Assembles a table from its columns.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the columns differ in length.
    pub fn from_columns(
        detectors: (DetectorId, DetectorId),
        sum_energy_a: Vec<f64>,
        sum_energy_b: Vec<f64>,
        timing: Option<TimingColumns>,
    ) -> Result<Self> {
        let len = sum_energy_a.len();
        let timing_ok = timing.as_ref().map_or(true, |t| {
            t.mean_time_a.len() == len && t.mean_time_b.len() == len && t.delta_time.len() == len
        });
        if sum_energy_b.len() != len || !timing_ok {
            return Err(Error::InvalidArgument(
                "feature columns must have equal length".to_string(),
            ));
        }
        Ok(Self {
            detectors,
            sum_energy_a,
            sum_energy_b,
            timing,
        })
    }

    /// Concatenates tables in order.
    ///
    /// An empty input yields an empty table for `detectors`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the tables disagree on detector
    /// pair or timing presence.
    pub fn concat<'a, I>(
        detectors: (DetectorId, DetectorId),
        with_timing: bool,
        tables: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = &'a EventFeatureTable>,
    {
        let mut out = Self::empty(detectors.0, detectors.1, with_timing);
        for table in tables {
            out.append(table)?;
        }
        Ok(out)
    }

    /// Number of rows (coincident events).
    #[must_use]
    pub fn len(&self) -> usize {
        self.sum_energy_a.len()
    }

    /// Returns true if no event survived extraction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sum_energy_a.is_empty()
    }

    /// The `(a, b)` detector pair the table was extracted for.
    #[must_use]
    pub fn detectors(&self) -> (DetectorId, DetectorId) {
        self.detectors
    }

    /// Returns true if the timing columns were computed.
    #[must_use]
    pub fn has_timing(&self) -> bool {
        self.timing.is_some()
    }

    /// Summed energy on detector a, one entry per row.
    #[must_use]
    pub fn sum_energy_a(&self) -> &[f64] {
        &self.sum_energy_a
    }

    /// Summed energy on detector b, one entry per row.
    #[must_use]
    pub fn sum_energy_b(&self) -> &[f64] {
        &self.sum_energy_b
    }

    /// Energy-weighted mean time on detector a, if timing was computed.
    #[must_use]
    pub fn mean_time_a(&self) -> Option<&[f64]> {
        self.timing.as_ref().map(|t| t.mean_time_a.as_slice())
    }

    /// Energy-weighted mean time on detector b, if timing was computed.
    #[must_use]
    pub fn mean_time_b(&self) -> Option<&[f64]> {
        self.timing.as_ref().map(|t| t.mean_time_b.as_slice())
    }

    /// `mean_time_b - mean_time_a`, if timing was computed.
    #[must_use]
    pub fn delta_time(&self) -> Option<&[f64]> {
        self.timing.as_ref().map(|t| t.delta_time.as_slice())
    }

    /// Timing columns, if computed.
    #[must_use]
    pub fn timing(&self) -> Option<&TimingColumns> {
        self.timing.as_ref()
    }

    /// Returns row `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<EventFeature> {
        let sum_energy_a = *self.sum_energy_a.get(index)?;
        let sum_energy_b = *self.sum_energy_b.get(index)?;
        let timing = self.timing.as_ref();
        Some(EventFeature {
            sum_energy_a,
            sum_energy_b,
            mean_time_a: timing.map(|t| t.mean_time_a[index]),
            mean_time_b: timing.map(|t| t.mean_time_b[index]),
            delta_time: timing.map(|t| t.delta_time[index]),
        })
    }

    /// Iterates over rows in extraction order.
    pub fn iter(&self) -> impl Iterator<Item = EventFeature> + '_ {
        (0..self.len()).filter_map(move |i| self.row(i))
    }

    /// Appends the rows of `other` after this table's rows.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the tables disagree on detector
    /// pair or timing presence.
    pub fn append(&mut self, other: &EventFeatureTable) -> Result<()> {
        if self.detectors != other.detectors {
            return Err(Error::InvalidArgument(format!(
                "cannot concatenate features for detectors {:?} and {:?}",
                self.detectors, other.detectors
            )));
        }

        match (&mut self.timing, &other.timing) {
            (Some(mine), Some(theirs)) => mine.append(theirs),
            (None, None) => {}
            _ => {
                return Err(Error::InvalidArgument(
                    "cannot concatenate timing and energy-only features".to_string(),
                ))
            }
        }

        self.sum_energy_a.extend_from_slice(&other.sum_energy_a);
        self.sum_energy_b.extend_from_slice(&other.sum_energy_b);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    fn timed(a: Vec<f64>, b: Vec<f64>, ta: Vec<f64>, tb: Vec<f64>) -> EventFeatureTable {
        EventFeatureTable::from_columns((0, 1), a, b, Some(TimingColumns::from_means(ta, tb)))
            .unwrap()
    }

    #[test]
    fn test_empty_table() {
        let table = EventFeatureTable::empty(0, 1, false);
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
        assert!(!table.has_timing());
        assert!(table.delta_time().is_none());
        assert!(table.row(0).is_none());
    }

    #[test]
    fn test_rows() {
        let table = timed(vec![1.0, 4.0], vec![2.0, 2.0], vec![0.0, 2.5], vec![1.0, 3.0]);
        assert_eq!(table.delta_time().unwrap(), &[1.0, 0.5]);
        let row = table.row(1).unwrap();
        assert_eq!(row.sum_energy_a, 4.0);
        assert_eq!(row.mean_time_a, Some(2.5));
        assert_eq!(row.delta_time, Some(0.5));
        assert_eq!(table.iter().count(), 2);
    }

    #[test]
    fn test_from_columns_length_mismatch() {
        let err = EventFeatureTable::from_columns((0, 1), vec![1.0], vec![], None).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_from_columns_rejects_short_timing() {
        let timing = TimingColumns::default();
        let err = EventFeatureTable::from_columns((0, 1), vec![1.0], vec![2.0], Some(timing))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_validates() {
        let table = timed(vec![1.0], vec![2.0], vec![0.0], vec![1.0]);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(
            serde_json::from_str::<EventFeatureTable>(&json).unwrap(),
            table
        );

        let bad = serde_json::from_str::<EventFeatureTable>(
            r#"{"detectors":[0,1],"sum_energy_a":[1.0],"sum_energy_b":[2.0],
                "timing":{"mean_time_a":[],"mean_time_b":[],"delta_time":[]}}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_concat_preserves_order() {
        let first = timed(vec![1.0], vec![2.0], vec![0.0], vec![1.0]);
        let second = timed(vec![3.0], vec![4.0], vec![5.0], vec![5.5]);
        let all = EventFeatureTable::concat((0, 1), true, [&first, &second]).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.sum_energy_a(), &[1.0, 3.0]);
        assert_eq!(all.delta_time().unwrap(), &[1.0, 0.5]);
    }

    #[test]
    fn test_concat_rejects_mixed_timing() {
        let timed_table = timed(vec![1.0], vec![2.0], vec![0.0], vec![1.0]);
        let energy_only = EventFeatureTable::empty(0, 1, false);
        assert!(EventFeatureTable::concat((0, 1), true, [&timed_table, &energy_only]).is_err());
    }

    #[test]
    fn test_append_rejects_other_detectors() {
        let mut table = EventFeatureTable::empty(0, 1, false);
        let other = EventFeatureTable::empty(1, 2, false);
        assert!(table.append(&other).is_err());
    }
}
