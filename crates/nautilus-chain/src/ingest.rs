//! Ingestion of raw upstream chain data.
//!
//! The upstream API returns blocks with full per-transaction output lists.
//! Normalization aggregates those into the compact [`Block`] shape the rest
//! of Nautilus consumes: summed output values, spent ratios, fee and output
//! totals. Malformed upstream data is an error, never a panic.

use serde::Deserialize;
use thiserror::Error;

use crate::{Block, Transaction};

/// Result type for ingestion.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors raised while normalizing upstream data.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Block hash is not 32 bytes of lowercase hex.
    #[error("invalid block hash {0:?}")]
    InvalidHash(String),

    /// Summing output values overflowed u64.
    #[error("output total overflow at height {0}")]
    Overflow(u64),

    /// Upstream returned an empty transaction list.
    #[error("block {0} has no transactions")]
    EmptyBlock(u64),
}

/// Raw block as returned by the upstream chain API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub height: u64,
    pub hash: String,
    pub tx: Vec<RawTransaction>,
}

/// Raw transaction with its output list.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    pub hash: String,
    /// Fee paid by this transaction, satoshi.
    pub fee: u64,
    pub out: Vec<RawOutput>,
}

/// One transaction output.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOutput {
    /// Output value, satoshi.
    pub value: u64,
    /// Whether this output has been spent.
    pub spent: bool,
}

/// Normalize a raw upstream block into the internal [`Block`] shape.
pub fn normalize(raw: RawBlock) -> Result<Block> {
    validate_hash(&raw.hash)?;
    if raw.tx.is_empty() {
        return Err(IngestError::EmptyBlock(raw.height));
    }

    let mut fee_total: u64 = 0;
    let mut output_total: u64 = 0;
    let mut transactions = Vec::with_capacity(raw.tx.len());

    for (index, tx) in raw.tx.iter().enumerate() {
        let mut value: u64 = 0;
        let mut spent = 0usize;
        for out in &tx.out {
            value = value
                .checked_add(out.value)
                .ok_or(IngestError::Overflow(raw.height))?;
            if out.spent {
                spent += 1;
            }
        }
        let spent_ratio = if tx.out.is_empty() {
            0.0
        } else {
            spent as f32 / tx.out.len() as f32
        };

        fee_total = fee_total
            .checked_add(tx.fee)
            .ok_or(IngestError::Overflow(raw.height))?;
        output_total = output_total
            .checked_add(value)
            .ok_or(IngestError::Overflow(raw.height))?;

        transactions.push(Transaction {
            hash: tx.hash.clone(),
            value,
            spent_ratio,
            sequence_index: index as u32,
        });
    }

    Ok(Block {
        height: raw.height,
        hash: raw.hash,
        tx_count: transactions.len() as u32,
        fee_total,
        output_total,
        transactions,
    })
}

fn validate_hash(hash: &str) -> Result<()> {
    let decoded = hex::decode(hash).map_err(|_| IngestError::InvalidHash(hash.to_string()))?;
    if decoded.len() != 32 || hash.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(IngestError::InvalidHash(hash.to_string()));
    }
    Ok(())
}
