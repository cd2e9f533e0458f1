//! Normalized block and transaction records.

use serde::{Deserialize, Serialize};

/// Scale factor turning the raw fee/output ratio into the health scale.
const HEALTH_SCALE: f64 = 2000.0;

/// A block, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Chain height, the placement identity.
    pub height: u64,
    /// Content identity: 64 lowercase hex characters.
    pub hash: String,
    /// Number of transactions in the block.
    pub tx_count: u32,
    /// Total fees paid, satoshi.
    pub fee_total: u64,
    /// Total output value, satoshi.
    pub output_total: u64,
    /// Transactions in block order.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Fee paid per unit of output value. Zero when the block moved no value.
    pub fn fee_ratio(&self) -> f64 {
        if self.output_total == 0 {
            return 0.0;
        }
        self.fee_total as f64 / self.output_total as f64
    }

    /// Fee pressure on a scale starting at 0; lower is healthier.
    pub fn health_ratio(&self) -> f64 {
        (self.fee_ratio() * HEALTH_SCALE).max(0.0)
    }
}

/// One transaction inside a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction hash.
    pub hash: String,
    /// Sum of output values, satoshi.
    pub value: u64,
    /// Fraction of outputs already spent, 0.0..=1.0.
    pub spent_ratio: f32,
    /// Position within the block.
    pub sequence_index: u32,
}

/// Per-block cell layout, derived entirely from the block.
///
/// `offsets` holds interleaved `(x, y)` pairs and `scales` one radius per
/// cell, both in block-plane units. Bit-reproducible given the same height
/// and transaction ordering, which is what makes it safe to cache by hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockGeometry {
    /// Height of the block this layout belongs to.
    pub height: u64,
    /// Interleaved cell center coordinates.
    pub offsets: Vec<f32>,
    /// Cell radii, one per center.
    pub scales: Vec<f32>,
}

impl BlockGeometry {
    /// Number of cells in the layout.
    pub fn cell_count(&self) -> usize {
        self.scales.len()
    }

    /// Center and radius of the `index`-th cell.
    pub fn cell(&self, index: usize) -> Option<(f32, f32, f32)> {
        let radius = *self.scales.get(index)?;
        let x = *self.offsets.get(index * 2)?;
        let y = *self.offsets.get(index * 2 + 1)?;
        Some((x, y, radius))
    }
}
