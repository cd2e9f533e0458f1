//! Dense height-to-position table.

use std::f64::consts::TAU;

/// Which end of the chain sits at the spiral's center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpiralDirection {
    /// The chain tip is innermost; genesis is the outermost placement.
    #[default]
    TipInward,
    /// Genesis is innermost; the tip spirals outward.
    GenesisInward,
}

/// Spiral construction parameters.
#[derive(Debug, Clone)]
pub struct SpiralConfig {
    /// Highest known block height; the table covers `0..=max_height`.
    pub max_height: u64,
    /// Edge length of one block footprint in world units.
    pub plane_size: f64,
    /// Number of full turns across the nominal spiral radius.
    pub coils: f64,
    /// Nominal total spiral radius in world units.
    pub radius: f64,
    /// Chord between neighbors as a multiple of `plane_size`; values above
    /// 1.0 leave a gap between footprints.
    pub margin_multiplier: f64,
    /// The first placement sits `plane_size * offset_multiplier` from center.
    pub offset_multiplier: f64,
    /// Which chain end is innermost.
    pub direction: SpiralDirection,
}

impl Default for SpiralConfig {
    fn default() -> Self {
        Self {
            max_height: 0,
            plane_size: 200.0,
            coils: 256.0,
            radius: 400_000.0,
            margin_multiplier: 1.1,
            offset_multiplier: 2.0,
            direction: SpiralDirection::TipInward,
        }
    }
}

impl SpiralConfig {
    /// Straight-line distance between consecutive placements.
    pub fn chord(&self) -> f64 {
        self.plane_size * self.margin_multiplier
    }
}

/// A placement on the spiral.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpiralPos {
    pub x: f64,
    pub z: f64,
}

impl SpiralPos {
    /// Create a position.
    pub const fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    /// Squared distance to another position.
    pub fn distance_sq(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    /// Distance to another position.
    pub fn distance(&self, other: &Self) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Distance from the spiral center.
    pub fn away(&self) -> f64 {
        (self.x * self.x + self.z * self.z).sqrt()
    }
}

/// Height-indexed position table, built once at startup.
pub struct SpiralIndex {
    positions: Vec<SpiralPos>,
    chord: f64,
}

impl SpiralIndex {
    /// Build the table for the full height range in `config`.
    ///
    /// O(max_height) construction, O(1) lookup.
    pub fn build(config: &SpiralConfig) -> Self {
        let theta_max = config.coils * TAU;
        let away_step = config.radius / theta_max;
        let chord = config.chord();

        // Seed theta so the first placement clears the center by the
        // configured offset.
        let mut theta = config.plane_size * config.offset_multiplier / away_step;

        let count = config.max_height as usize + 1;
        let mut positions = vec![SpiralPos::default(); count];

        for step in 0..count {
            let away = away_step * theta;
            let pos = SpiralPos::new(theta.cos() * away, theta.sin() * away);
            let height = match config.direction {
                SpiralDirection::TipInward => config.max_height - step as u64,
                SpiralDirection::GenesisInward => step as u64,
            };
            positions[height as usize] = pos;
            theta += chord / away;
        }

        Self { positions, chord }
    }

    /// Position of the block at `height`, if within the indexed range.
    pub fn position(&self, height: u64) -> Option<SpiralPos> {
        self.positions.get(height as usize).copied()
    }

    /// Highest indexed height.
    pub fn max_height(&self) -> u64 {
        self.positions.len() as u64 - 1
    }

    /// Number of indexed heights.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the table is empty. Never true after `build`.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Configured chord between consecutive placements.
    pub fn chord(&self) -> f64 {
        self.chord
    }

    /// Closest indexed height to `pos` within `band` heights of `center`.
    ///
    /// The restricted scan keeps continuous re-centering O(1) as the viewer
    /// moves, instead of a full-table search every frame.
    pub fn nearest_in_band(&self, pos: SpiralPos, center: u64, band: u64) -> u64 {
        let lo = center.saturating_sub(band);
        let hi = (center + band).min(self.max_height());

        let mut best = lo;
        let mut best_dist = f64::INFINITY;
        for height in lo..=hi {
            let dist = self.positions[height as usize].distance_sq(&pos);
            if dist < best_dist {
                best_dist = dist;
                best = height;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(max_height: u64) -> SpiralConfig {
        SpiralConfig {
            max_height,
            ..SpiralConfig::default()
        }
    }

    #[test]
    fn covers_full_height_range() {
        let index = SpiralIndex::build(&small_config(100));
        assert_eq!(index.len(), 101);
        assert!(index.position(0).is_some());
        assert!(index.position(100).is_some());
        assert!(index.position(101).is_none());
    }

    #[test]
    fn consecutive_heights_sit_one_chord_apart() {
        let config = small_config(500);
        let index = SpiralIndex::build(&config);
        let chord = config.chord();

        for h in 0..500 {
            let a = index.position(h).unwrap();
            let b = index.position(h + 1).unwrap();
            let dist = a.distance(&b);
            // Constant arc-length stepping approximates the chord; the error
            // shrinks as the spiral widens.
            assert!(
                (dist - chord).abs() / chord < 0.05,
                "spacing {} at height {} strays from chord {}",
                dist,
                h,
                chord
            );
        }
    }

    #[test]
    fn no_two_heights_coincide() {
        let index = SpiralIndex::build(&small_config(2000));
        let chord = index.chord();
        for h in 0..=2000u64 {
            for other in (h + 1)..=(h + 20).min(2000) {
                let a = index.position(h).unwrap();
                let b = index.position(other).unwrap();
                assert!(
                    a.distance(&b) > chord * 0.5,
                    "heights {} and {} collide",
                    h,
                    other
                );
            }
        }
    }

    #[test]
    fn tip_inward_puts_genesis_outermost() {
        let index = SpiralIndex::build(&small_config(300));
        let genesis = index.position(0).unwrap();
        let tip = index.position(300).unwrap();
        assert!(genesis.away() > tip.away());
    }

    #[test]
    fn genesis_inward_reverses_ordering() {
        let config = SpiralConfig {
            direction: SpiralDirection::GenesisInward,
            ..small_config(300)
        };
        let index = SpiralIndex::build(&config);
        let genesis = index.position(0).unwrap();
        let tip = index.position(300).unwrap();
        assert!(genesis.away() < tip.away());
    }

    #[test]
    fn first_placement_clears_center_offset() {
        let config = small_config(50);
        let index = SpiralIndex::build(&config);
        let innermost = index.position(50).unwrap();
        let expected = config.plane_size * config.offset_multiplier;
        assert!((innermost.away() - expected).abs() < 1.0);
    }

    #[test]
    fn nearest_in_band_finds_closest() {
        let index = SpiralIndex::build(&small_config(200));
        let target = index.position(120).unwrap();
        assert_eq!(index.nearest_in_band(target, 118, 5), 120);
    }

    #[test]
    fn nearest_in_band_clamps_at_edges() {
        let index = SpiralIndex::build(&small_config(200));
        let genesis = index.position(0).unwrap();
        assert_eq!(index.nearest_in_band(genesis, 2, 5), 0);
        let tip = index.position(200).unwrap();
        assert_eq!(index.nearest_in_band(tip, 198, 5), 200);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn positions_are_distinct(a in 0u64..1000, b in 0u64..1000) {
                prop_assume!(a != b);
                let index = SpiralIndex::build(&small_config(1000));
                let pa = index.position(a).unwrap();
                let pb = index.position(b).unwrap();
                prop_assert!(pa.distance(&pb) > 1.0);
            }

            #[test]
            fn away_shrinks_toward_tip(h in 0u64..999) {
                let index = SpiralIndex::build(&small_config(1000));
                let outer = index.position(h).unwrap();
                let inner = index.position(h + 1).unwrap();
                prop_assert!(outer.away() > inner.away());
            }
        }
    }
}
