//! Nautilus spiral placement
//!
//! Maps every block height to a unique 2D world position on an outward
//! Archimedean spiral. The spiral is stepped by constant arc length rather
//! than constant angle, so consecutive placements sit one chord apart
//! regardless of their distance from center and block footprints never
//! overlap.
//!
//! # Placement
//!
//! With `theta_max = coils * 2π` and `away_step = radius / theta_max`, the
//! point at angle `theta` lies `away_step * theta` from center. After each
//! placement the angle advances by `chord / away`, which keeps the straight-
//! line distance between neighbors at `chord = plane_size * margin`.
//!
//! The table is built once for the full known height range and gives O(1)
//! lookup afterwards.

mod index;

pub use index::{SpiralConfig, SpiralDirection, SpiralIndex, SpiralPos};
