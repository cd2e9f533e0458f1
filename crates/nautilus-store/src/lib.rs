//! Nautilus document-store boundary
//!
//! Two logical collections back the visualization: `blocks` keyed by hash
//! (block shape plus cache timestamp) and `block_geometry` keyed by hash
//! (flat offsets/scales payload). The core reads and writes both and never
//! deletes. Payloads cross this boundary as explicit typed records that are
//! validated on the way in, never as trusted parsed JSON.
//!
//! A height index sits next to the hash keys because streaming requests
//! arrive by height, not hash.

mod memory;
mod rocks;
mod schema;

pub use memory::MemoryStore;
pub use rocks::RocksStore;
pub use schema::{BlockDoc, GeometryDoc, SchemaError};

use std::sync::Arc;

use thiserror::Error;

use nautilus_chain::{Block, BlockGeometry, BoxFut};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur at the store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage backend error
    #[error("storage backend: {0}")]
    Backend(String),

    /// Serialization error
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Payload failed boundary validation
    #[error("schema: {0}")]
    Schema(#[from] SchemaError),

    /// IO error
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Remote document store the core reads and writes; never deletes.
///
/// Write failures are non-fatal to callers: geometry already in memory keeps
/// serving the session and is simply regenerated next time.
pub trait DocumentStore: Send + Sync {
    /// Cached block by content hash.
    fn block_by_hash<'a>(&'a self, hash: &'a str) -> BoxFut<'a, Result<Option<Block>>>;

    /// Cached block by height, via the height index.
    fn block_by_height(&self, height: u64) -> BoxFut<'_, Result<Option<Block>>>;

    /// Cache a block, stamped with the caller's clock.
    fn put_block<'a>(&'a self, block: &'a Block, cached_at: u64) -> BoxFut<'a, Result<()>>;

    /// Cached geometry by block hash.
    fn geometry_by_hash<'a>(
        &'a self,
        hash: &'a str,
    ) -> BoxFut<'a, Result<Option<BlockGeometry>>>;

    /// Persist geometry for a block hash.
    fn put_geometry<'a>(
        &'a self,
        hash: &'a str,
        geometry: &'a BlockGeometry,
    ) -> BoxFut<'a, Result<()>>;
}

/// Shared handle to a document store.
pub type DynDocumentStore = Arc<dyn DocumentStore>;
