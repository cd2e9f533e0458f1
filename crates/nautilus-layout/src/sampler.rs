//! Seeded site sampling.
//!
//! Sites are drawn uniformly over the block plane and filtered through a
//! coherent-noise field so they cluster away from low-noise regions, which
//! is what gives block layouts their organic, uneven look. The stream is a
//! pure function of the RNG state handed in: same block height, same sites.

use glam::Vec2;
use noise::{NoiseFn, Perlin};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::LayoutConfig;

/// Minimum number of sites per block, regardless of transaction count.
pub const MIN_SITES: usize = 4;

/// Noise-gate threshold: candidates with `gate * noise` at or below this
/// are redrawn.
const ACCEPT_THRESHOLD: f64 = -0.3;

/// Draws rejected per site before the fallback kicks in; keeps sampling
/// from spinning forever on a hostile noise region.
const MAX_REJECTS: u32 = 64;

/// Step used by the fallback sweep; small enough to stay visually invisible,
/// large enough that the plane holds far more slots than any block has
/// transactions, so the sweep always finds a free one.
const SWEEP_STEP: f32 = 1e-3;

/// Draws noise-biased sites inside the block plane.
pub struct SiteSampler<'a> {
    rng: &'a mut ChaCha8Rng,
    noise: Perlin,
    half: f32,
    zoom: f32,
}

impl<'a> SiteSampler<'a> {
    /// Create a sampler over the plane described by `config`, drawing from
    /// `rng`.
    pub fn new(rng: &'a mut ChaCha8Rng, config: &LayoutConfig) -> Self {
        Self {
            rng,
            noise: Perlin::new(config.noise_seed),
            half: config.plane_size / 2.0,
            zoom: config.noise_zoom,
        }
    }

    /// Sample `max(tx_count, MIN_SITES)` distinct sites, in order.
    pub fn sample(&mut self, tx_count: u32) -> Vec<Vec2> {
        let n = (tx_count as usize).max(MIN_SITES);
        let mut sites = Vec::with_capacity(n);
        for _ in 0..n {
            let site = self.sample_one(&sites);
            sites.push(site);
        }
        sites
    }

    fn sample_one(&mut self, accepted: &[Vec2]) -> Vec2 {
        let mut candidate = self.draw();
        for _ in 0..MAX_REJECTS {
            let gate = self.rng.gen::<f64>() * 5.0;
            let field = self.noise.get([
                (candidate.x / self.zoom) as f64,
                (candidate.y / self.zoom) as f64,
            ]);
            if gate * field > ACCEPT_THRESHOLD && !accepted.contains(&candidate) {
                return candidate;
            }
            candidate = self.draw();
        }
        self.sweep_to_unique(candidate, accepted)
    }

    fn draw(&mut self) -> Vec2 {
        Vec2::new(
            self.rng.gen_range(-self.half..=self.half),
            self.rng.gen_range(-self.half..=self.half),
        )
    }

    /// Accept `candidate` regardless of the noise gate, nudging it along a
    /// deterministic grid sweep until it collides with no accepted site.
    /// Terminates: the sweep grid has ~(plane/step)^2 slots, orders of
    /// magnitude more than sites per block.
    fn sweep_to_unique(&self, mut candidate: Vec2, accepted: &[Vec2]) -> Vec2 {
        while accepted.contains(&candidate) {
            candidate.x += SWEEP_STEP;
            if candidate.x > self.half {
                candidate.x = -self.half;
                candidate.y += SWEEP_STEP;
                if candidate.y > self.half {
                    candidate.y = -self.half;
                }
            }
        }
        candidate
    }
}
