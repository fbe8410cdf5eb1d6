//! Fixed-bin 1D histograms for feature columns.
//!
//! Bin edges follow `numpy.linspace` / `numpy.histogram` conventions:
//! `points` edges make `points - 1` bins, every bin is half-open except the
//! last, which also includes the upper edge.

use twotube_core::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of edges used for the per-run plots.
pub const DEFAULT_POINTS: usize = 500;

/// Range of the time-difference histogram in nanoseconds.
pub const DELTA_TIME_RANGE_NS: (f64, f64) = (-2.0, 2.0);

/// A 1D histogram over uniformly spaced edges.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Histogram1D {
    edges: Vec<f64>,
    counts: Vec<u64>,
    underflow: u64,
    overflow: u64,
}

impl Histogram1D {
    /// Creates an empty histogram with `points` edges evenly spaced over
    /// `[lo, hi]`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if `points < 2`, if the bounds are
    /// not finite, or if `hi <= lo`.
    pub fn linspace(lo: f64, hi: f64, points: usize) -> Result<Self> {
        if points < 2 {
            return Err(Error::InvalidArgument(format!(
                "histogram needs at least 2 edges, got {points}"
            )));
        }
        if !lo.is_finite() || !hi.is_finite() || hi <= lo {
            return Err(Error::InvalidArgument(format!(
                "invalid histogram range [{lo}, {hi}]"
            )));
        }
        Ok(Self::uniform(lo, hi, points))
    }

    #[allow(clippy::cast_precision_loss)]
    fn uniform(lo: f64, hi: f64, points: usize) -> Self {
        let step = (hi - lo) / (points - 1) as f64;
        let mut edges: Vec<f64> = (0..points).map(|i| lo + i as f64 * step).collect();
        edges[points - 1] = hi;
        Self {
            edges,
            counts: vec![0; points - 1],
            underflow: 0,
            overflow: 0,
        }
    }

    /// Adds one value. NaN values are ignored.
    pub fn fill(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        let lo = self.edges[0];
        let hi = self.edges[self.edges.len() - 1];
        if value < lo {
            self.underflow += 1;
        } else if value > hi {
            self.overflow += 1;
        } else {
            let last = self.counts.len() - 1;
            let bin = self
                .edges
                .partition_point(|&edge| edge <= value)
                .saturating_sub(1)
                .min(last);
            self.counts[bin] += 1;
        }
    }

    /// Adds every value of a column.
    pub fn fill_all(&mut self, values: &[f64]) {
        for &value in values {
            self.fill(value);
        }
    }

    /// Bin edges (`bins() + 1` entries).
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Per-bin counts.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of bins.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Values below the lowest edge.
    #[must_use]
    pub fn underflow(&self) -> u64 {
        self.underflow
    }

    /// Values above the highest edge.
    #[must_use]
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Count of in-range values.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Iterates over `(lower, upper, count)` per bin.
    pub fn iter_bins(&self) -> impl Iterator<Item = (f64, f64, u64)> + '_ {
        self.edges
            .windows(2)
            .zip(&self.counts)
            .map(|(w, &count)| (w[0], w[1], count))
    }
}

/// Histogram for `delta_time` columns: 500 edges over [-2, 2] ns.
#[must_use]
pub fn delta_time_histogram() -> Histogram1D {
    Histogram1D::uniform(DELTA_TIME_RANGE_NS.0, DELTA_TIME_RANGE_NS.1, DEFAULT_POINTS)
}

/// Energy histogram (MeV) sized for a source energy given in keV.
///
/// Known source energies use fixed ranges (200 keV: 0–0.2, 2000 keV: 0–2,
/// 10000 keV: 0–11); others span 0 to 1.1 × the source energy.
///
/// # Errors
/// Returns [`Error::InvalidArgument`] for a zero source energy.
pub fn energy_histogram(source_energy_kev: u32) -> Result<Histogram1D> {
    let hi = match source_energy_kev {
        200 => 0.2,
        2000 => 2.0,
        10_000 => 11.0,
        kev => f64::from(kev) / 1000.0 * 1.1,
    };
    Histogram1D::linspace(0.0, hi, DEFAULT_POINTS)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_edges() {
        let hist = Histogram1D::linspace(0.0, 1.0, 5).unwrap();
        assert_eq!(hist.edges(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(hist.bins(), 4);
    }

    #[test]
    fn test_fill_edges_and_outliers() {
        let mut hist = Histogram1D::linspace(0.0, 1.0, 5).unwrap();
        hist.fill_all(&[0.0, 0.25, 0.3, 1.0, -0.1, 1.5, f64::NAN]);
        // 0.0 -> bin 0, 0.25 and 0.3 -> bin 1, 1.0 -> last bin
        assert_eq!(hist.counts(), &[1, 2, 0, 1]);
        assert_eq!(hist.underflow(), 1);
        assert_eq!(hist.overflow(), 1);
        assert_eq!(hist.total(), 4);
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(Histogram1D::linspace(0.0, 1.0, 1).is_err());
        assert!(Histogram1D::linspace(1.0, 1.0, 10).is_err());
        assert!(Histogram1D::linspace(0.0, f64::INFINITY, 10).is_err());
    }

    #[test]
    fn test_delta_time_histogram() {
        let hist = delta_time_histogram();
        assert_eq!(hist.bins(), DEFAULT_POINTS - 1);
        assert_eq!(hist.edges()[0], -2.0);
        assert_eq!(hist.edges()[DEFAULT_POINTS - 1], 2.0);
    }

    #[test]
    fn test_energy_histogram_ranges() {
        let last = |kev| *energy_histogram(kev).unwrap().edges().last().unwrap();
        assert_eq!(last(200), 0.2);
        assert_eq!(last(2000), 2.0);
        assert_eq!(last(10_000), 11.0);
        assert_relative_eq!(last(500), 0.55);
        assert!(energy_histogram(0).is_err());
    }

    #[test]
    fn test_iter_bins() {
        let mut hist = Histogram1D::linspace(0.0, 2.0, 3).unwrap();
        hist.fill(1.5);
        let bins: Vec<_> = hist.iter_bins().collect();
        assert_eq!(bins, vec![(0.0, 1.0, 0), (1.0, 2.0, 1)]);
    }
}
