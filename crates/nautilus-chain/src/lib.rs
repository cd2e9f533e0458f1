//! Nautilus chain data model
//!
//! Normalized block and transaction shapes shared by every Nautilus crate,
//! the ingestion step that produces them from raw upstream chain data, and
//! the boundary trait for the upstream chain-data API.
//!
//! Blocks are identified by height (placement identity) and by hash (content
//! identity). Everything derived from a block downstream, in particular its
//! cell geometry, must be reproducible from these records alone.

mod block;
mod ingest;
mod source;

pub use block::{Block, BlockGeometry, Transaction};
pub use ingest::{normalize, IngestError, RawBlock, RawOutput, RawTransaction};
pub use source::{BoxFut, ChainSource, DynChainSource, SourceError};
