//! Nautilus block layout
//!
//! Deterministic per-block transaction layout: a seeded site sampler feeds a
//! bounded Voronoi tessellation that Lloyd relaxation then smooths, with the
//! pass count driven by block health. The whole pipeline is a pure function
//! of the block's height and transaction list, so geometry can be cached by
//! hash, re-derived on a miss, and shared across sessions without storing
//! raw polygons.
//!
//! Each engine value owns its RNG state and is constructed per generation
//! call; nothing is shared between generations.

mod relax;
mod sampler;
mod voronoi;

pub use relax::RelaxOutcome;
pub use sampler::{SiteSampler, MIN_SITES};
pub use voronoi::{Diagram, VoronoiCell};

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use nautilus_chain::{Block, BlockGeometry};

/// Side length of the square plane every block lays out into.
pub const PLANE_SIZE: f32 = 200.0;

/// Result type for layout generation.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Errors raised while generating a block layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The site set admits no valid diagram.
    #[error("degenerate diagram: {0}")]
    Degenerate(&'static str),
}

/// Layout tuning parameters.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Side length of the block plane.
    pub plane_size: f32,
    /// Noise-field coordinate divisor; larger values stretch the clusters.
    pub noise_zoom: f32,
    /// Seed of the shared coherent-noise field. One field serves every
    /// block; per-block variation comes from the height-seeded RNG.
    pub noise_seed: u32,
    /// Relaxation passes for a perfectly healthy block.
    pub max_iterations: u32,
    /// Fee ratio at and above which no relaxation happens.
    pub congested_fee_ratio: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            plane_size: PLANE_SIZE,
            noise_zoom: 300.0,
            noise_seed: 0,
            max_iterations: 20,
            congested_fee_ratio: 0.0001,
        }
    }
}

/// A laid-out transaction cell: center and non-overlapping radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub site: Vec2,
    pub radius: f32,
}

/// Deterministic layout generator.
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    /// Create an engine with the given tuning.
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Relaxation pass count for a block: healthier blocks relax more.
    pub fn iterations_for(&self, block: &Block) -> u32 {
        let congestion =
            (block.fee_ratio() / self.config.congested_fee_ratio).clamp(0.0, 1.0);
        ((1.0 - congestion) * self.config.max_iterations as f64).round() as u32
    }

    /// Generate the cell layout for a block.
    ///
    /// Mitosis during relaxation can leave more cells than transactions;
    /// callers index cells by position and treat the surplus as decoration.
    pub fn generate(&self, block: &Block) -> Result<Vec<Cell>> {
        let half = self.config.plane_size / 2.0;
        let mut rng = ChaCha8Rng::seed_from_u64(block.height);

        let sites = SiteSampler::new(&mut rng, &self.config).sample(block.tx_count);
        let diagram = voronoi::compute(&sites, half)?;

        let outcome = if block.tx_count > 1 {
            relax::relax(sites, diagram, self.iterations_for(block), half, &mut rng)
        } else {
            RelaxOutcome {
                sites,
                diagram,
                completed: 0,
            }
        };

        Ok(assign_radii(&outcome.diagram, half))
    }

    /// Generate and pack the layout into the persistable geometry shape.
    pub fn geometry(&self, block: &Block) -> Result<BlockGeometry> {
        let cells = self.generate(block)?;
        let mut offsets = Vec::with_capacity(cells.len() * 2);
        let mut scales = Vec::with_capacity(cells.len());
        for cell in &cells {
            offsets.push(cell.site.x);
            offsets.push(cell.site.y);
            scales.push(cell.radius);
        }
        Ok(BlockGeometry {
            height: block.height,
            offsets,
            scales,
        })
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

/// Half the distance to the nearest adjacent site, clipped so no cell
/// leaves the plane. Cells can then never overlap each other or the edge.
fn assign_radii(diagram: &Diagram, half: f32) -> Vec<Cell> {
    diagram
        .cells
        .iter()
        .map(|cell| {
            let mut min_dist_sq = f32::INFINITY;
            for &j in &cell.neighbors {
                let d = cell.site.distance_squared(diagram.cells[j].site);
                if d > 0.0 && d < min_dist_sq {
                    min_dist_sq = d;
                }
            }
            let mut radius = if min_dist_sq.is_finite() {
                min_dist_sq.sqrt() * 0.5
            } else {
                // No neighbors: a lone cell reaches to the nearest edge.
                half
            };
            radius = radius
                .min(half - cell.site.x.abs())
                .min(half - cell.site.y.abs())
                .max(0.0);
            Cell {
                site: cell.site,
                radius,
            }
        })
        .collect()
}
