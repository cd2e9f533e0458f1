//! In-memory document store for tests and offline sessions.

use std::collections::HashMap;
use std::sync::Mutex;

use nautilus_chain::{Block, BlockGeometry, BoxFut};

use crate::schema::{BlockDoc, GeometryDoc};
use crate::{DocumentStore, Result};

#[derive(Default)]
struct Collections {
    blocks: HashMap<String, BlockDoc>,
    geometry: HashMap<String, GeometryDoc>,
    height_index: HashMap<u64, String>,
}

/// HashMap-backed store with the same boundary semantics as the remote one.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached blocks.
    pub fn block_count(&self) -> usize {
        self.lock().blocks.len()
    }

    /// Number of cached geometry payloads.
    pub fn geometry_count(&self) -> usize {
        self.lock().geometry.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Collections> {
        // Lock poisoning only happens if a writer panicked; the data itself
        // is still coherent for these read-modify-write patterns.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn block_by_hash<'a>(&'a self, hash: &'a str) -> BoxFut<'a, Result<Option<Block>>> {
        let found = self.lock().blocks.get(hash).map(|doc| doc.block.clone());
        Box::pin(async move { Ok(found) })
    }

    fn block_by_height(&self, height: u64) -> BoxFut<'_, Result<Option<Block>>> {
        let found = {
            let inner = self.lock();
            inner
                .height_index
                .get(&height)
                .and_then(|hash| inner.blocks.get(hash))
                .map(|doc| doc.block.clone())
        };
        Box::pin(async move { Ok(found) })
    }

    fn put_block<'a>(&'a self, block: &'a Block, cached_at: u64) -> BoxFut<'a, Result<()>> {
        let mut inner = self.lock();
        inner.height_index.insert(block.height, block.hash.clone());
        inner.blocks.insert(
            block.hash.clone(),
            BlockDoc {
                block: block.clone(),
                cached_at,
            },
        );
        Box::pin(async move { Ok(()) })
    }

    fn geometry_by_hash<'a>(
        &'a self,
        hash: &'a str,
    ) -> BoxFut<'a, Result<Option<BlockGeometry>>> {
        let doc = self.lock().geometry.get(hash).cloned();
        Box::pin(async move {
            match doc {
                Some(doc) => Ok(Some(doc.into_geometry()?)),
                None => Ok(None),
            }
        })
    }

    fn put_geometry<'a>(
        &'a self,
        hash: &'a str,
        geometry: &'a BlockGeometry,
    ) -> BoxFut<'a, Result<()>> {
        self.lock()
            .geometry
            .insert(hash.to_string(), GeometryDoc::from_geometry(geometry));
        Box::pin(async move { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: u64) -> Block {
        Block {
            height,
            hash: format!("{:064x}", height),
            tx_count: 2,
            fee_total: 10,
            output_total: 1000,
            transactions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn block_round_trip_by_hash_and_height() {
        let store = MemoryStore::new();
        let b = block(7);
        store.put_block(&b, 1_700_000_000).await.unwrap();

        assert_eq!(store.block_by_hash(&b.hash).await.unwrap(), Some(b.clone()));
        assert_eq!(store.block_by_height(7).await.unwrap(), Some(b));
        assert_eq!(store.block_by_height(8).await.unwrap(), None);
    }

    #[tokio::test]
    async fn geometry_round_trip() {
        let store = MemoryStore::new();
        let g = BlockGeometry {
            height: 7,
            offsets: vec![0.0, 1.0],
            scales: vec![2.0],
        };
        store.put_geometry("abc", &g).await.unwrap();
        assert_eq!(store.geometry_by_hash("abc").await.unwrap(), Some(g));
        assert_eq!(store.geometry_by_hash("def").await.unwrap(), None);
    }

    #[tokio::test]
    async fn rewrite_is_idempotent() {
        let store = MemoryStore::new();
        let b = block(3);
        store.put_block(&b, 100).await.unwrap();
        store.put_block(&b, 200).await.unwrap();
        assert_eq!(store.block_count(), 1);
    }
}
