//! Typed store records with boundary validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use nautilus_chain::{Block, BlockGeometry};

/// Violations of the expected payload shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// `offsets` must hold exactly one (x, y) pair per scale.
    #[error("offsets length {offsets} does not pair with scales length {scales}")]
    LengthMismatch { offsets: usize, scales: usize },

    /// NaN or infinity in a numeric payload.
    #[error("non-finite value in geometry payload")]
    NonFinite,
}

/// `blocks` collection record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDoc {
    #[serde(flatten)]
    pub block: Block,
    /// Unix seconds at which this block was cached.
    pub cached_at: u64,
}

/// `block_geometry` collection record.
///
/// Stored as plain JSON arrays; [`into_geometry`](GeometryDoc::into_geometry)
/// is the only way back into the core, so no unvalidated payload shape can
/// cross the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryDoc {
    pub height: u64,
    pub offsets: Vec<f32>,
    pub scales: Vec<f32>,
}

impl GeometryDoc {
    /// Package geometry for persistence.
    pub fn from_geometry(geometry: &BlockGeometry) -> Self {
        Self {
            height: geometry.height,
            offsets: geometry.offsets.clone(),
            scales: geometry.scales.clone(),
        }
    }

    /// Validate the payload and convert into the core shape.
    pub fn into_geometry(self) -> Result<BlockGeometry, SchemaError> {
        if self.offsets.len() != self.scales.len() * 2 {
            return Err(SchemaError::LengthMismatch {
                offsets: self.offsets.len(),
                scales: self.scales.len(),
            });
        }
        if self.offsets.iter().chain(self.scales.iter()).any(|v| !v.is_finite()) {
            return Err(SchemaError::NonFinite);
        }
        Ok(BlockGeometry {
            height: self.height,
            offsets: self.offsets,
            scales: self.scales,
        })
    }
}
