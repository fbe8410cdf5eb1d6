//! Segmented kernels over offset-indexed (jagged) columns.
//!
//! A jagged column is a flat slice of per-hit values plus an `offsets` slice
//! of length `events + 1`; event `i` owns `values[offsets[i]..offsets[i + 1]]`.
//! Every kernel here works on whole columns at once and returns one value per
//! event (or per hit), so extraction never branches per event.
//!
//! All reductions fold left to right starting from `0.0`. Callers that need
//! bit-identical results across code paths rely on this order.
//!
//! Inputs are trusted: `offsets` must index into the value slices and
//! slices passed together must have equal lengths. Kernels panic on
//! out-of-range offsets; mismatched lengths are only caught by debug
//! assertions.

use crate::hit::DetectorId;

/// Hit-level mask: `true` where the hit belongs to `detector`.
#[must_use]
pub fn hit_mask(ids: &[DetectorId], detector: DetectorId) -> Vec<bool> {
    ids.iter().map(|&id| id == detector).collect()
}

/// Per-event "any": `true` for events with at least one masked hit.
#[must_use]
pub fn segment_any(offsets: &[usize], mask: &[bool]) -> Vec<bool> {
    offsets
        .windows(2)
        .map(|w| mask[w[0]..w[1]].iter().any(|&m| m))
        .collect()
}

/// Per-event sum of `values` over masked hits.
#[must_use]
pub fn segment_masked_sum(offsets: &[usize], values: &[f64], mask: &[bool]) -> Vec<f64> {
    debug_assert_eq!(values.len(), mask.len());
    offsets
        .windows(2)
        .map(|w| {
            values[w[0]..w[1]]
                .iter()
                .zip(&mask[w[0]..w[1]])
                .filter(|(_, &m)| m)
                .fold(0.0, |acc, (&v, _)| acc + v)
        })
        .collect()
}

/// Per-event sum of `lhs * rhs` over masked hits.
#[must_use]
pub fn segment_masked_dot(offsets: &[usize], lhs: &[f64], rhs: &[f64], mask: &[bool]) -> Vec<f64> {
    debug_assert_eq!(lhs.len(), rhs.len());
    debug_assert_eq!(lhs.len(), mask.len());
    offsets
        .windows(2)
        .map(|w| {
            let range = w[0]..w[1];
            lhs[range.clone()]
                .iter()
                .zip(&rhs[range.clone()])
                .zip(&mask[range])
                .filter(|(_, &m)| m)
                .fold(0.0, |acc, ((&l, &r), _)| acc + l * r)
        })
        .collect()
}

/// Element-wise logical and of two equal-length masks.
#[must_use]
pub fn mask_and(lhs: &[bool], rhs: &[bool]) -> Vec<bool> {
    debug_assert_eq!(lhs.len(), rhs.len());
    lhs.iter().zip(rhs).map(|(&l, &r)| l && r).collect()
}

/// Keeps the entries whose `keep` flag is set, preserving order.
#[must_use]
pub fn compress<T: Copy>(values: &[T], keep: &[bool]) -> Vec<T> {
    debug_assert_eq!(values.len(), keep.len());
    values
        .iter()
        .zip(keep)
        .filter(|(_, &k)| k)
        .map(|(&v, _)| v)
        .collect()
}

/// Number of set entries in a mask.
#[must_use]
pub fn count(mask: &[bool]) -> usize {
    mask.iter().filter(|&&m| m).count()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    // Three events: [0, 1], [], [1, 1, 2]
    const OFFSETS: [usize; 4] = [0, 2, 2, 5];
    const IDS: [DetectorId; 5] = [0, 1, 1, 1, 2];

    #[test]
    fn test_hit_mask_and_any() {
        let mask = hit_mask(&IDS, 1);
        assert_eq!(mask, vec![false, true, true, true, false]);
        assert_eq!(segment_any(&OFFSETS, &mask), vec![true, false, true]);

        let zero = hit_mask(&IDS, 0);
        assert_eq!(segment_any(&OFFSETS, &zero), vec![true, false, false]);
    }

    #[test]
    fn test_segment_masked_sum() {
        let energy = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mask = hit_mask(&IDS, 1);
        assert_eq!(
            segment_masked_sum(&OFFSETS, &energy, &mask),
            vec![2.0, 0.0, 7.0]
        );
    }

    #[test]
    fn test_segment_masked_dot() {
        let energy = [1.0, 2.0, 3.0, 4.0, 5.0];
        let time = [10.0, 20.0, 1.0, 2.0, 100.0];
        let mask = hit_mask(&IDS, 1);
        // event 0: 2*20, event 2: 3*1 + 4*2
        assert_eq!(
            segment_masked_dot(&OFFSETS, &time, &energy, &mask),
            vec![40.0, 0.0, 11.0]
        );
    }

    #[test]
    fn test_compress_and_count() {
        let keep = [true, false, true];
        assert_eq!(compress(&[1.5, 2.5, 3.5], &keep), vec![1.5, 3.5]);
        assert_eq!(count(&keep), 2);
        assert_eq!(mask_and(&keep, &[true, true, false]), vec![true, false, false]);
    }

    #[test]
    fn test_empty_offsets() {
        let offsets = [0usize];
        assert!(segment_any(&offsets, &[]).is_empty());
        assert!(segment_masked_sum(&offsets, &[], &[]).is_empty());
    }
}
