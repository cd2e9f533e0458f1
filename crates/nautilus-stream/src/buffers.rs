//! Reusable numeric payload buffers for load batches.
//!
//! The flat offsets/scales/values arrays moving between the fetch task and
//! the control thread are allocated once at the configured capacity and
//! reused for every batch. Ownership transfers into the in-flight task and
//! back with the response, so there is never a concurrent writer and never
//! a per-request allocation of the bulk payload.

use nautilus_chain::{Block, BlockGeometry};

/// Capacity of the batch payload arrays.
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Block slots per batch.
    pub max_blocks: usize,
    /// Cells budgeted per block slot.
    pub max_cells_per_block: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_blocks: 64,
            max_cells_per_block: 4096,
        }
    }
}

impl BufferConfig {
    fn cell_capacity(&self) -> usize {
        self.max_blocks * self.max_cells_per_block
    }
}

/// Index of one block's slice within the flat batch arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRange {
    pub height: u64,
    pub start: usize,
    pub cells: usize,
}

/// The preallocated batch payload.
pub struct BatchBuffers {
    offsets: Vec<f32>,
    scales: Vec<f32>,
    values: Vec<f32>,
    slots: Vec<SlotRange>,
    max_blocks: usize,
    cell_capacity: usize,
}

impl BatchBuffers {
    /// Allocate buffers at full capacity, once.
    pub fn new(config: &BufferConfig) -> Self {
        let cells = config.cell_capacity();
        Self {
            offsets: Vec::with_capacity(cells * 2),
            scales: Vec::with_capacity(cells),
            values: Vec::with_capacity(cells),
            slots: Vec::with_capacity(config.max_blocks),
            max_blocks: config.max_blocks,
            cell_capacity: cells,
        }
    }

    /// Clear contents, keeping the allocations.
    pub fn reset(&mut self) {
        self.offsets.clear();
        self.scales.clear();
        self.values.clear();
        self.slots.clear();
    }

    /// Filled block slots.
    pub fn slots(&self) -> &[SlotRange] {
        &self.slots
    }

    /// Remaining cell capacity.
    pub fn remaining_cells(&self) -> usize {
        self.cell_capacity - self.scales.len()
    }

    /// Append one block's payload.
    ///
    /// Cell values beyond the block's transaction count (mitosis surplus)
    /// carry a value of zero. Returns the slot, or `None` when the batch is
    /// out of capacity; the caller defers that height to a later request.
    pub fn push_block(&mut self, block: &Block, geometry: &BlockGeometry) -> Option<SlotRange> {
        let cells = geometry.cell_count();
        if self.slots.len() == self.max_blocks || cells > self.remaining_cells() {
            return None;
        }

        let slot = SlotRange {
            height: geometry.height,
            start: self.scales.len(),
            cells,
        };
        self.offsets.extend_from_slice(&geometry.offsets);
        self.scales.extend_from_slice(&geometry.scales);
        for index in 0..cells {
            let value = block
                .transactions
                .get(index)
                .map(|tx| tx.value as f32)
                .unwrap_or(0.0);
            self.values.push(value);
        }
        self.slots.push(slot);
        Some(slot)
    }

    /// Copy a slot's payload back out as owned geometry.
    pub fn geometry(&self, slot: SlotRange) -> BlockGeometry {
        BlockGeometry {
            height: slot.height,
            offsets: self.offsets[slot.start * 2..(slot.start + slot.cells) * 2].to_vec(),
            scales: self.scales[slot.start..slot.start + slot.cells].to_vec(),
        }
    }

    /// A slot's per-cell transaction values.
    pub fn values(&self, slot: SlotRange) -> &[f32] {
        &self.values[slot.start..slot.start + slot.cells]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nautilus_chain::Transaction;

    fn block_with_geometry(height: u64, cells: usize) -> (Block, BlockGeometry) {
        let block = Block {
            height,
            hash: format!("{:064x}", height),
            tx_count: cells as u32,
            fee_total: 0,
            output_total: 100,
            transactions: (0..cells)
                .map(|i| Transaction {
                    hash: format!("{:064x}", i),
                    value: (i as u64 + 1) * 10,
                    spent_ratio: 0.0,
                    sequence_index: i as u32,
                })
                .collect(),
        };
        let geometry = BlockGeometry {
            height,
            offsets: (0..cells * 2).map(|i| i as f32).collect(),
            scales: (0..cells).map(|i| i as f32 + 0.5).collect(),
        };
        (block, geometry)
    }

    #[test]
    fn slots_index_the_flat_arrays() {
        let mut buffers = BatchBuffers::new(&BufferConfig::default());
        let (b1, g1) = block_with_geometry(10, 3);
        let (b2, g2) = block_with_geometry(11, 2);

        let s1 = buffers.push_block(&b1, &g1).unwrap();
        let s2 = buffers.push_block(&b2, &g2).unwrap();

        assert_eq!(s1.start, 0);
        assert_eq!(s2.start, 3);
        assert_eq!(buffers.geometry(s1), g1);
        assert_eq!(buffers.geometry(s2), g2);
        assert_eq!(buffers.values(s2), &[10.0, 20.0][..]);
    }

    #[test]
    fn capacity_is_enforced_per_batch() {
        let mut buffers = BatchBuffers::new(&BufferConfig {
            max_blocks: 8,
            max_cells_per_block: 4,
        });
        let (big_block, big_geometry) = block_with_geometry(1, 40);
        assert!(buffers.push_block(&big_block, &big_geometry).is_none());

        let (b, g) = block_with_geometry(2, 4);
        assert!(buffers.push_block(&b, &g).is_some());
    }

    #[test]
    fn block_slot_count_is_enforced() {
        let mut buffers = BatchBuffers::new(&BufferConfig {
            max_blocks: 2,
            max_cells_per_block: 8,
        });
        for height in 0..2 {
            let (b, g) = block_with_geometry(height, 1);
            assert!(buffers.push_block(&b, &g).is_some());
        }
        let (b, g) = block_with_geometry(9, 1);
        assert!(buffers.push_block(&b, &g).is_none());
    }

    #[test]
    fn reset_reuses_the_allocation() {
        let mut buffers = BatchBuffers::new(&BufferConfig::default());
        let (b, g) = block_with_geometry(5, 16);
        buffers.push_block(&b, &g).unwrap();

        let capacity_before = buffers.offsets.capacity();
        buffers.reset();
        assert!(buffers.slots().is_empty());
        assert_eq!(buffers.offsets.capacity(), capacity_before);

        let slot = buffers.push_block(&b, &g).unwrap();
        assert_eq!(slot.start, 0);
    }

    #[test]
    fn surplus_cells_carry_zero_value() {
        let (mut block, geometry) = block_with_geometry(3, 4);
        // Simulate mitosis: geometry grew beyond the transaction list.
        block.transactions.truncate(2);

        let mut buffers = BatchBuffers::new(&BufferConfig::default());
        let slot = buffers.push_block(&block, &geometry).unwrap();
        assert_eq!(buffers.values(slot), &[10.0, 20.0, 0.0, 0.0][..]);
    }
}
