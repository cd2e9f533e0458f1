//! Authoritative set of materialized blocks.

use std::collections::HashMap;

use nautilus_chain::{Block, BlockGeometry};
use nautilus_spiral::{SpiralIndex, SpiralPos};

/// Lookahead band for the nearest-height scan, in heights either side of
/// the last known closest.
const NEAREST_BAND: u64 = 5;

/// A block materialized in memory: summary plus cell geometry.
#[derive(Debug, Clone)]
pub struct Resident {
    pub block: Block,
    pub geometry: BlockGeometry,
}

/// Outcome of offering a loaded block to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Inserted into the resident set.
    Inserted,
    /// Already resident; the merge was a no-op.
    AlreadyResident,
    /// The result's generation predates the latest recenter.
    StaleGeneration,
    /// Height has left the window band since the request was issued.
    OutOfRange,
}

/// Bounded residency window around a reference height.
///
/// Entries are created by merge and destroyed by recenter; nothing else
/// touches the resident map.
pub struct ResidencyWindow {
    reference_height: u64,
    radius: u32,
    generation: u64,
    resident: HashMap<u64, Resident>,
    last_closest: u64,
    max_height: u64,
}

impl ResidencyWindow {
    /// Create a window centered at `reference_height`.
    pub fn new(reference_height: u64, radius: u32, max_height: u64) -> Self {
        Self {
            reference_height,
            radius,
            generation: 0,
            resident: HashMap::new(),
            last_closest: reference_height,
            max_height,
        }
    }

    /// Current reference height.
    pub fn reference_height(&self) -> u64 {
        self.reference_height
    }

    /// Window radius in heights.
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Generation of the current window placement. Bumped whenever the
    /// reference moves; results stamped with an older generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of resident blocks.
    pub fn len(&self) -> usize {
        self.resident.len()
    }

    /// Whether anything is resident.
    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    /// Whether `height` is resident.
    pub fn contains(&self, height: u64) -> bool {
        self.resident.contains_key(&height)
    }

    /// Resident entry at `height`.
    pub fn get(&self, height: u64) -> Option<&Resident> {
        self.resident.get(&height)
    }

    /// Iterate resident heights in arbitrary order.
    pub fn heights(&self) -> impl Iterator<Item = u64> + '_ {
        self.resident.keys().copied()
    }

    /// Whether `height` falls inside the current band.
    pub fn in_band(&self, height: u64) -> bool {
        height.abs_diff(self.reference_height) <= self.radius as u64
    }

    /// Move the window to a new reference height.
    ///
    /// Evicts every resident entry outside the new band and returns the
    /// in-band heights that are not yet resident, in ascending order; that
    /// list is the load set for the coordinator.
    ///
    /// The generation only advances when the reference actually moves, so
    /// recomputing an unmoved window never invalidates its own in-flight
    /// request.
    pub fn recenter(&mut self, new_reference: u64) -> Vec<u64> {
        if new_reference != self.reference_height {
            self.generation += 1;
        }
        self.reference_height = new_reference;

        let radius = self.radius as u64;
        let reference = self.reference_height;
        self.resident
            .retain(|height, _| height.abs_diff(reference) <= radius);

        let lo = reference.saturating_sub(radius);
        let hi = (reference + radius).min(self.max_height);
        (lo..=hi)
            .filter(|height| !self.resident.contains_key(height))
            .collect()
    }

    /// Offer a loaded block to the window.
    pub fn merge(&mut self, height: u64, resident: Resident, generation: u64) -> MergeOutcome {
        if generation != self.generation {
            return MergeOutcome::StaleGeneration;
        }
        if !self.in_band(height) {
            return MergeOutcome::OutOfRange;
        }
        if self.resident.contains_key(&height) {
            return MergeOutcome::AlreadyResident;
        }
        self.resident.insert(height, resident);
        MergeOutcome::Inserted
    }

    /// Closest indexed height to the viewer, scanning only a small band
    /// around the last answer.
    pub fn nearest_height_to(&mut self, pos: SpiralPos, spiral: &SpiralIndex) -> u64 {
        let nearest = spiral.nearest_in_band(pos, self.last_closest, NEAREST_BAND);
        self.last_closest = nearest;
        nearest
    }
}
