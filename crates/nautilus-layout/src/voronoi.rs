//! Bounded Voronoi tessellation.
//!
//! Each cell is cut from the block plane square by clipping against the
//! perpendicular bisector of its site and every other site. Candidate
//! bisectors are visited nearest-first so the clip loop can stop as soon as
//! no remaining site can reach the cell, which keeps the common case well
//! below the quadratic worst case.
//!
//! Every surviving clip edge remembers which site produced it, so cells know
//! their adjacent sites without a separate Delaunay pass.

use glam::Vec2;

use crate::{LayoutError, Result};

/// Label of the edge entering a polygon vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeLabel {
    /// Edge lies on the plane boundary square.
    Boundary,
    /// Edge lies on the bisector against the site with this index.
    Neighbor(usize),
}

/// One Voronoi cell: generating site, clipped polygon, adjacent sites.
#[derive(Debug, Clone)]
pub struct VoronoiCell {
    /// The generating site.
    pub site: Vec2,
    /// Polygon vertices in counter-clockwise order.
    pub vertices: Vec<Vec2>,
    /// Indices of sites whose bisectors bound this cell.
    pub neighbors: Vec<usize>,
}

impl VoronoiCell {
    /// Polygon centroid via the signed-area formula, or `None` when the
    /// area has collapsed.
    pub fn centroid(&self) -> Option<Vec2> {
        let n = self.vertices.len();
        if n < 3 {
            return None;
        }
        let mut area = 0.0f32;
        let mut cx = 0.0f32;
        let mut cy = 0.0f32;
        for i in 0..n {
            let p = self.vertices[i];
            let q = self.vertices[(i + 1) % n];
            let cross = p.x * q.y - q.x * p.y;
            area += cross;
            cx += (p.x + q.x) * cross;
            cy += (p.y + q.y) * cross;
        }
        area *= 0.5;
        if area.abs() <= f32::EPSILON {
            return None;
        }
        Some(Vec2::new(cx / (6.0 * area), cy / (6.0 * area)))
    }
}

/// A full bounded diagram; cells are in site order.
#[derive(Debug, Clone)]
pub struct Diagram {
    pub cells: Vec<VoronoiCell>,
}

/// Compute the bounded Voronoi diagram of `sites` over the square
/// `[-half, half]²`.
pub fn compute(sites: &[Vec2], half: f32) -> Result<Diagram> {
    if sites.is_empty() {
        return Err(LayoutError::Degenerate("no sites"));
    }
    for (i, a) in sites.iter().enumerate() {
        if sites[i + 1..].contains(a) {
            return Err(LayoutError::Degenerate("duplicate sites"));
        }
    }

    let mut cells = Vec::with_capacity(sites.len());
    for (i, &site) in sites.iter().enumerate() {
        cells.push(clip_cell(i, site, sites, half)?);
    }
    Ok(Diagram { cells })
}

fn clip_cell(index: usize, site: Vec2, sites: &[Vec2], half: f32) -> Result<VoronoiCell> {
    // Start from the plane square, counter-clockwise.
    let mut verts = vec![
        Vec2::new(-half, -half),
        Vec2::new(half, -half),
        Vec2::new(half, half),
        Vec2::new(-half, half),
    ];
    let mut labels = vec![EdgeLabel::Boundary; 4];

    // Nearest sites first: once a candidate is farther than twice the
    // polygon's reach from the site, its bisector cannot cut the polygon
    // and neither can anything behind it.
    let mut order: Vec<usize> = (0..sites.len()).filter(|&j| j != index).collect();
    order.sort_by(|&a, &b| {
        let da = site.distance_squared(sites[a]);
        let db = site.distance_squared(sites[b]);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut reach_sq = max_reach_sq(site, &verts);
    for j in order {
        if site.distance_squared(sites[j]) > 4.0 * reach_sq {
            break;
        }
        let changed = clip_half_plane(&mut verts, &mut labels, site, sites[j], j);
        if verts.len() < 3 {
            return Err(LayoutError::Degenerate("cell collapsed"));
        }
        if changed {
            reach_sq = max_reach_sq(site, &verts);
        }
    }

    let mut neighbors: Vec<usize> = labels
        .iter()
        .filter_map(|l| match l {
            EdgeLabel::Neighbor(j) => Some(*j),
            EdgeLabel::Boundary => None,
        })
        .collect();
    neighbors.sort_unstable();
    neighbors.dedup();

    Ok(VoronoiCell {
        site,
        vertices: verts,
        neighbors,
    })
}

fn max_reach_sq(site: Vec2, verts: &[Vec2]) -> f32 {
    verts
        .iter()
        .map(|v| site.distance_squared(*v))
        .fold(0.0, f32::max)
}

/// Clip the labeled polygon against the half-plane of points closer to
/// `site` than to `other`. Returns whether the polygon changed.
///
/// `labels[i]` labels the edge entering `verts[i]`; a cut introduces edges
/// labeled with the clipping site `j`.
fn clip_half_plane(
    verts: &mut Vec<Vec2>,
    labels: &mut Vec<EdgeLabel>,
    site: Vec2,
    other: Vec2,
    j: usize,
) -> bool {
    let mid = (site + other) * 0.5;
    let dir = other - site;
    // Inside: (p - mid) · dir <= 0, the side containing `site`.
    let side = |p: Vec2| (p - mid).dot(dir);

    let n = verts.len();
    let mut out_verts: Vec<Vec2> = Vec::with_capacity(n + 2);
    let mut out_labels: Vec<EdgeLabel> = Vec::with_capacity(n + 2);
    let mut changed = false;

    for i in 0..n {
        let a = verts[i];
        let b = verts[(i + 1) % n];
        let edge_label = labels[(i + 1) % n];
        let fa = side(a);
        let fb = side(b);
        let a_in = fa <= 0.0;
        let b_in = fb <= 0.0;

        if a_in && b_in {
            out_verts.push(b);
            out_labels.push(edge_label);
        } else if a_in && !b_in {
            let t = fa / (fa - fb);
            out_verts.push(a + (b - a) * t);
            out_labels.push(edge_label);
            changed = true;
        } else if !a_in && b_in {
            let t = fa / (fa - fb);
            out_verts.push(a + (b - a) * t);
            out_labels.push(EdgeLabel::Neighbor(j));
            out_verts.push(b);
            out_labels.push(edge_label);
            changed = true;
        } else {
            changed = true;
        }
    }

    if changed {
        *verts = out_verts;
        *labels = out_labels;
    }
    changed
}
