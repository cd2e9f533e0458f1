//! Upstream chain-data boundary.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::ingest::RawBlock;

/// Boxed future alias used at async trait boundaries.
pub type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors raised by the upstream chain-data API.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No block exists at the requested height.
    #[error("height {0} not found upstream")]
    NotFound(u64),

    /// Network or API failure; the height stays unresident and is retried.
    #[error("upstream transport: {0}")]
    Transport(String),
}

/// Upstream chain-data API.
///
/// Implementations fetch raw blocks by height; callers normalize the result
/// via [`normalize`](crate::normalize) before using it.
pub trait ChainSource: Send + Sync {
    /// Fetch the raw block at `height`.
    fn block_at(&self, height: u64) -> BoxFut<'_, Result<RawBlock, SourceError>>;

    /// Current chain tip height.
    fn tip(&self) -> BoxFut<'_, Result<u64, SourceError>>;
}

/// Shared handle to a chain source.
pub type DynChainSource = Arc<dyn ChainSource>;
