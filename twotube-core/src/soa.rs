//! Jagged Structure of Arrays (`SoA`) storage for one run of events.
//!
//! `HitTable` keeps every hit of a run in three flat parallel columns and an
//! `offsets` vector that marks where each event starts. Event `i` owns hits
//! `offsets[i]..offsets[i + 1]`, so events with zero hits are simply two
//! equal offsets.

use std::ops::Range;

use crate::error::{Error, Result};
use crate::hit::{DetectorId, Hit, HitData};
use crate::segment;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// All hits of one run, stored per event in jagged `SoA` layout.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawHitTable"))]
pub struct HitTable {
    offsets: Vec<usize>,
    detector_id: Vec<DetectorId>,
    energy: Vec<f64>,
    time: Vec<f64>,
}

impl Default for HitTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HitTable {
    /// Creates an empty table (zero events).
    #[must_use]
    pub fn new() -> Self {
        Self {
            offsets: vec![0],
            detector_id: Vec::new(),
            energy: Vec::new(),
            time: Vec::new(),
        }
    }

    /// Creates an empty table with room for `events` events and `hits` hits.
    #[must_use]
    pub fn with_capacity(events: usize, hits: usize) -> Self {
        let mut offsets = Vec::with_capacity(events + 1);
        offsets.push(0);
        Self {
            offsets,
            detector_id: Vec::with_capacity(hits),
            energy: Vec::with_capacity(hits),
            time: Vec::with_capacity(hits),
        }
    }

    /// Builds a table from one hit list per event.
    ///
    /// # Errors
    /// Returns [`Error::MalformedInput`] if any energy is negative or not finite.
    pub fn from_events<H: Hit>(events: &[Vec<H>]) -> Result<Self> {
        let hits = events.iter().map(Vec::len).sum();
        let mut table = Self::with_capacity(events.len(), hits);
        for event in events {
            table.push_event(event)?;
        }
        Ok(table)
    }

    /// Builds a table from per-field jagged columns, as stored by the
    /// simulation output (`Ev.UID`, `Ev.E`, `Ev.T`).
    ///
    /// # Errors
    /// Returns [`Error::MalformedInput`] if the columns disagree on the number
    /// of events, if any event's per-field sequences differ in length, or if
    /// any energy is negative or not finite.
    pub fn from_jagged(
        detector_id: Vec<Vec<DetectorId>>,
        energy: Vec<Vec<f64>>,
        time: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if detector_id.len() != energy.len() || detector_id.len() != time.len() {
            return Err(Error::MalformedInput(format!(
                "column event counts differ: detector_id={}, energy={}, time={}",
                detector_id.len(),
                energy.len(),
                time.len()
            )));
        }

        let hits = detector_id.iter().map(Vec::len).sum();
        let mut table = Self::with_capacity(detector_id.len(), hits);

        for (event, ((ids, energies), times)) in
            detector_id.into_iter().zip(energy).zip(time).enumerate()
        {
            if ids.len() != energies.len() || ids.len() != times.len() {
                return Err(Error::malformed_event(
                    event,
                    format_args!(
                        "field lengths differ: detector_id={}, energy={}, time={}",
                        ids.len(),
                        energies.len(),
                        times.len()
                    ),
                ));
            }
            check_energies(event, &energies)?;

            table.detector_id.extend(ids);
            table.energy.extend(energies);
            table.time.extend(times);
            table.offsets.push(table.detector_id.len());
        }

        Ok(table)
    }

    /// Builds a table from flat columns and event offsets.
    ///
    /// # Errors
    /// Returns [`Error::MalformedInput`] if `offsets` does not start at 0, is
    /// not non-decreasing or does not end at the hit count, if the columns
    /// differ in length, or if any energy is negative or not finite.
    pub fn from_parts(
        offsets: Vec<usize>,
        detector_id: Vec<DetectorId>,
        energy: Vec<f64>,
        time: Vec<f64>,
    ) -> Result<Self> {
        if detector_id.len() != energy.len() || detector_id.len() != time.len() {
            return Err(Error::MalformedInput(format!(
                "column lengths differ: detector_id={}, energy={}, time={}",
                detector_id.len(),
                energy.len(),
                time.len()
            )));
        }
        if offsets.first() != Some(&0)
            || offsets.last() != Some(&detector_id.len())
            || offsets.windows(2).any(|w| w[0] > w[1])
        {
            return Err(Error::MalformedInput(format!(
                "offsets must rise from 0 to the hit count {}",
                detector_id.len()
            )));
        }
        for (event, w) in offsets.windows(2).enumerate() {
            check_energies(event, &energy[w[0]..w[1]])?;
        }

        Ok(Self {
            offsets,
            detector_id,
            energy,
            time,
        })
    }

    /// Appends one event made of `hits`.
    ///
    /// # Errors
    /// Returns [`Error::MalformedInput`] if any energy is negative or not finite.
    /// The table is left unchanged on error.
    pub fn push_event<I>(&mut self, hits: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Hit,
    {
        let start = self.detector_id.len();
        for hit in hits {
            self.detector_id.push(hit.detector_id());
            self.energy.push(hit.energy());
            self.time.push(hit.time());
        }

        if let Err(err) = check_energies(self.num_events(), &self.energy[start..]) {
            self.truncate_hits(start);
            return Err(err);
        }

        self.offsets.push(self.detector_id.len());
        Ok(())
    }

    /// Returns the number of events.
    #[must_use]
    pub fn num_events(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Returns the total number of hits across all events.
    #[must_use]
    pub fn num_hits(&self) -> usize {
        self.detector_id.len()
    }

    /// Returns true if the table holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_events() == 0
    }

    /// Event boundaries; length is `num_events() + 1`.
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Flat detector identifier column.
    #[must_use]
    pub fn detector_ids(&self) -> &[DetectorId] {
        &self.detector_id
    }

    /// Flat energy column.
    #[must_use]
    pub fn energies(&self) -> &[f64] {
        &self.energy
    }

    /// Flat time column (ns).
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.time
    }

    /// Hit index range of event `index`.
    #[must_use]
    pub fn event_range(&self, index: usize) -> Option<Range<usize>> {
        let start = *self.offsets.get(index)?;
        let end = *self.offsets.get(index + 1)?;
        Some(start..end)
    }

    /// Borrowed view of event `index`.
    #[must_use]
    pub fn event(&self, index: usize) -> Option<EventView<'_>> {
        let range = self.event_range(index)?;
        Some(EventView {
            detector_id: &self.detector_id[range.clone()],
            energy: &self.energy[range.clone()],
            time: &self.time[range],
        })
    }

    /// Iterates over all events in load order.
    pub fn events(&self) -> impl ExactSizeIterator<Item = EventView<'_>> + '_ {
        self.offsets.windows(2).map(move |w| EventView {
            detector_id: &self.detector_id[w[0]..w[1]],
            energy: &self.energy[w[0]..w[1]],
            time: &self.time[w[0]..w[1]],
        })
    }

    /// Returns a new table holding only the events whose `mask` entry is set.
    ///
    /// # Panics
    /// Panics if `mask.len() != self.num_events()`.
    #[must_use]
    pub fn select_events(&self, mask: &[bool]) -> Self {
        assert_eq!(
            mask.len(),
            self.num_events(),
            "event mask length must match event count"
        );

        let kept_events = segment::count(mask);
        let kept_hits = self
            .offsets
            .windows(2)
            .zip(mask)
            .filter(|(_, &keep)| keep)
            .map(|(w, _)| w[1] - w[0])
            .sum();
        let mut out = Self::with_capacity(kept_events, kept_hits);

        for (w, _) in self.offsets.windows(2).zip(mask).filter(|(_, &keep)| keep) {
            let range = w[0]..w[1];
            out.detector_id
                .extend_from_slice(&self.detector_id[range.clone()]);
            out.energy.extend_from_slice(&self.energy[range.clone()]);
            out.time.extend_from_slice(&self.time[range]);
            out.offsets.push(out.detector_id.len());
        }

        out
    }

    /// Appends all events from another table after this table's events.
    pub fn append(&mut self, other: &HitTable) {
        let base = self.num_hits();
        self.detector_id.extend_from_slice(&other.detector_id);
        self.energy.extend_from_slice(&other.energy);
        self.time.extend_from_slice(&other.time);
        self.offsets
            .extend(other.offsets.iter().skip(1).map(|&offset| offset + base));
    }

    /// Clears all events.
    pub fn clear(&mut self) {
        self.offsets.truncate(1);
        self.detector_id.clear();
        self.energy.clear();
        self.time.clear();
    }

    fn truncate_hits(&mut self, len: usize) {
        self.detector_id.truncate(len);
        self.energy.truncate(len);
        self.time.truncate(len);
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawHitTable {
    offsets: Vec<usize>,
    detector_id: Vec<DetectorId>,
    energy: Vec<f64>,
    time: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawHitTable> for HitTable {
    type Error = Error;

    fn try_from(raw: RawHitTable) -> Result<Self> {
        Self::from_parts(raw.offsets, raw.detector_id, raw.energy, raw.time)
    }
}

fn check_energies(event: usize, energies: &[f64]) -> Result<()> {
    match energies.iter().position(|e| !e.is_finite() || *e < 0.0) {
        Some(pos) => Err(Error::malformed_event(
            event,
            format_args!("hit {pos} has invalid energy {}", energies[pos]),
        )),
        None => Ok(()),
    }
}

/// Borrowed view of the hits of one event.
#[derive(Debug, Clone, Copy)]
pub struct EventView<'a> {
    /// Detector identifiers of the event's hits.
    pub detector_id: &'a [DetectorId],
    /// Energies of the event's hits.
    pub energy: &'a [f64],
    /// Times of the event's hits.
    pub time: &'a [f64],
}

impl EventView<'_> {
    /// Number of hits in the event.
    #[must_use]
    pub fn len(&self) -> usize {
        self.detector_id.len()
    }

    /// Returns true if the event registered no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detector_id.is_empty()
    }

    /// Returns true if any hit belongs to `detector`.
    #[must_use]
    pub fn has_detector(&self, detector: DetectorId) -> bool {
        self.detector_id.contains(&detector)
    }

    /// Iterates over the hits of the event.
    pub fn hits(&self) -> impl Iterator<Item = HitData> + '_ {
        self.detector_id
            .iter()
            .zip(self.energy)
            .zip(self.time)
            .map(|((&id, &energy), &time)| HitData::new(id, energy, time))
    }
}
