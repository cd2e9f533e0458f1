//! Nautilus streaming residency
//!
//! Keeps a bounded neighborhood of blocks materialized around the viewer
//! while the full chain stays on disk. As the viewer moves along the spiral,
//! heights entering the window are fetched or synthesized in the background
//! and heights leaving it are evicted. The dataset can hold hundreds of
//! thousands of blocks; only the window is ever resident.
//!
//! # Concurrency
//!
//! A single control path drives everything: [`StreamEngine::update`] is
//! called once per tick, never blocks, and is the only place the resident
//! map mutates. Bulk work runs on one background task at a time; results
//! come back over a channel as owned data. Staleness is handled by a
//! monotonic generation counter stamped onto each request and checked at
//! merge time.

mod buffers;
mod coordinator;
mod engine;
mod residency;
mod scheduler;

pub use buffers::{BatchBuffers, BufferConfig, SlotRange};
pub use coordinator::{LoadBatch, LoadCoordinator, RequestOutcome};
pub use engine::{EngineStats, StreamConfig, StreamEngine};
pub use residency::{MergeOutcome, Resident, ResidencyWindow};
pub use scheduler::TickDriver;

use thiserror::Error;

/// Result type for streaming operations.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Errors surfaced while loading blocks into the window.
///
/// None of these are fatal to the viewer: a failed height stays unresident
/// and is retried on a later window recompute.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Document store failure
    #[error(transparent)]
    Store(#[from] nautilus_store::StoreError),

    /// Layout generation failure
    #[error(transparent)]
    Layout(#[from] nautilus_layout::LayoutError),

    /// Upstream chain API failure
    #[error(transparent)]
    Source(#[from] nautilus_chain::SourceError),

    /// Upstream data failed normalization
    #[error(transparent)]
    Ingest(#[from] nautilus_chain::IngestError),

    /// The tick driver task failed to shut down cleanly
    #[error("driver: {0}")]
    Driver(String),
}
