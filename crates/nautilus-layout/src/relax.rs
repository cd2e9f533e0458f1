//! Lloyd relaxation with damped moves and probabilistic mitosis.
//!
//! Each pass moves every site toward its cell centroid, recomputes the
//! diagram, and occasionally splits a cell by injecting a child site next to
//! its parent. Relaxation intensity is driven by block health upstream; this
//! module just runs the requested number of passes.

use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::voronoi::{self, Diagram};

/// Centroid moves longer than this are damped 50/50 toward the site to
/// avoid overshoot.
const DAMPING_DISTANCE: f32 = 2.0;

/// Mitosis probability per cell and pass is `MITOSIS_RATE / cell_count`.
const MITOSIS_RATE: f64 = 0.1;

/// Result of a relaxation run.
#[derive(Debug)]
pub struct RelaxOutcome {
    /// Final site set; may be larger than the input after mitosis.
    pub sites: Vec<Vec2>,
    /// Diagram over the final sites.
    pub diagram: Diagram,
    /// Passes actually completed; short of the request when a pass hit a
    /// geometric degeneracy.
    pub completed: u32,
}

/// Run up to `iterations` Lloyd passes over `diagram`.
///
/// A degenerate pass is logged and relaxation stops early, keeping the last
/// good diagram; generation as a whole never fails here.
pub fn relax(
    sites: Vec<Vec2>,
    diagram: Diagram,
    iterations: u32,
    half: f32,
    rng: &mut ChaCha8Rng,
) -> RelaxOutcome {
    let mut sites = sites;
    let mut diagram = diagram;

    for pass in 0..iterations {
        let mut next: Vec<Vec2> = Vec::with_capacity(sites.len() + 1);
        let mut children: Vec<Vec2> = Vec::new();
        let mitosis_p = MITOSIS_RATE / diagram.cells.len() as f64;
        let mut collapsed = false;

        for cell in &diagram.cells {
            let Some(centroid) = cell.centroid() else {
                collapsed = true;
                break;
            };
            let dist = centroid.distance(cell.site);
            let moved = if dist > DAMPING_DISTANCE {
                (centroid + cell.site) * 0.5
            } else {
                centroid
            };
            next.push(moved);

            if rng.gen::<f64>() < mitosis_p && dist > f32::EPSILON {
                children.push(cell.site + (centroid - cell.site) * (1.0 / (2.0 * dist)));
            }
        }

        if collapsed {
            tracing::warn!(pass, "cell collapsed, keeping previous diagram");
            return RelaxOutcome {
                sites,
                diagram,
                completed: pass,
            };
        }

        next.extend(children);
        match voronoi::compute(&next, half) {
            Ok(recomputed) => {
                sites = next;
                diagram = recomputed;
            }
            Err(err) => {
                tracing::warn!(pass, %err, "degenerate relaxation pass, stopping early");
                return RelaxOutcome {
                    sites,
                    diagram,
                    completed: pass,
                };
            }
        }
    }

    RelaxOutcome {
        sites,
        diagram,
        completed: iterations,
    }
}
