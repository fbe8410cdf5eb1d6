//! Hit traits and types for simulated detector data.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of the detector that registered a hit.
pub type DetectorId = i32;

/// One physical interaction recorded during a simulated event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitData {
    /// Detector that registered the hit.
    pub detector_id: DetectorId,
    /// Deposited energy (non-negative).
    pub energy: f64,
    /// Hit time within the event in nanoseconds.
    pub time: f64,
}

impl HitData {
    /// Creates a new hit.
    #[inline]
    #[must_use]
    pub fn new(detector_id: DetectorId, energy: f64, time: f64) -> Self {
        Self {
            detector_id,
            energy,
            time,
        }
    }

    /// Energy-weighted time contribution (`time * energy`).
    #[inline]
    #[must_use]
    pub fn weighted_time(&self) -> f64 {
        self.time * self.energy
    }
}

impl From<(DetectorId, f64, f64)> for HitData {
    fn from((detector_id, energy, time): (DetectorId, f64, f64)) -> Self {
        Self::new(detector_id, energy, time)
    }
}

/// Trait for hit data from a simulated detector pair.
///
/// Lets loaders hand their own hit representation to
/// [`HitTable::push_event`](crate::soa::HitTable::push_event) without
/// converting to [`HitData`] first.
pub trait Hit {
    /// Returns the detector identifier.
    fn detector_id(&self) -> DetectorId;

    /// Returns the deposited energy.
    fn energy(&self) -> f64;

    /// Returns the hit time in nanoseconds.
    fn time(&self) -> f64;

    /// Returns true if the hit was registered by `detector`.
    #[inline]
    fn is_on(&self, detector: DetectorId) -> bool {
        self.detector_id() == detector
    }
}

impl Hit for HitData {
    #[inline]
    fn detector_id(&self) -> DetectorId {
        self.detector_id
    }

    #[inline]
    fn energy(&self) -> f64 {
        self.energy
    }

    #[inline]
    fn time(&self) -> f64 {
        self.time
    }
}

impl<H: Hit> Hit for &H {
    #[inline]
    fn detector_id(&self) -> DetectorId {
        (*self).detector_id()
    }

    #[inline]
    fn energy(&self) -> f64 {
        (*self).energy()
    }

    #[inline]
    fn time(&self) -> f64 {
        (*self).time()
    }
}
