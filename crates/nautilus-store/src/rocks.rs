//! Persistent document store backed by RocksDB.

use std::path::Path;

use rocksdb::{Options, DB};

use nautilus_chain::{Block, BlockGeometry, BoxFut};

use crate::schema::{BlockDoc, GeometryDoc};
use crate::{DocumentStore, Result};

/// RocksDB-backed store.
///
/// Keys: `block:{hash}`, `geometry:{hash}`, and a `height:{height}` index
/// mapping to the block hash. Heights are zero-padded so the index iterates
/// in chain order.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    fn block_key(hash: &str) -> String {
        format!("block:{}", hash)
    }

    fn geometry_key(hash: &str) -> String {
        format!("geometry:{}", hash)
    }

    fn height_key(height: u64) -> String {
        format!("height:{:012}", height)
    }

    fn get_block_doc(&self, hash: &str) -> Result<Option<BlockDoc>> {
        match self.db.get(Self::block_key(hash).as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }
}

impl DocumentStore for RocksStore {
    fn block_by_hash<'a>(&'a self, hash: &'a str) -> BoxFut<'a, Result<Option<Block>>> {
        let result = self.get_block_doc(hash).map(|doc| doc.map(|d| d.block));
        Box::pin(async move { result })
    }

    fn block_by_height(&self, height: u64) -> BoxFut<'_, Result<Option<Block>>> {
        let result = (|| -> Result<Option<Block>> {
            let hash = match self.db.get(Self::height_key(height).as_bytes())? {
                Some(raw) => String::from_utf8_lossy(&raw).into_owned(),
                None => return Ok(None),
            };
            Ok(self.get_block_doc(&hash)?.map(|d| d.block))
        })();
        Box::pin(async move { result })
    }

    fn put_block<'a>(&'a self, block: &'a Block, cached_at: u64) -> BoxFut<'a, Result<()>> {
        let result = (|| -> Result<()> {
            let doc = BlockDoc {
                block: block.clone(),
                cached_at,
            };
            let value = serde_json::to_vec(&doc)?;
            self.db.put(Self::block_key(&block.hash).as_bytes(), value)?;
            self.db.put(
                Self::height_key(block.height).as_bytes(),
                block.hash.as_bytes(),
            )?;
            Ok(())
        })();
        Box::pin(async move { result })
    }

    fn geometry_by_hash<'a>(
        &'a self,
        hash: &'a str,
    ) -> BoxFut<'a, Result<Option<BlockGeometry>>> {
        let result = (|| -> Result<Option<BlockGeometry>> {
            match self.db.get(Self::geometry_key(hash).as_bytes())? {
                Some(data) => {
                    let doc: GeometryDoc = serde_json::from_slice(&data)?;
                    Ok(Some(doc.into_geometry()?))
                }
                None => Ok(None),
            }
        })();
        Box::pin(async move { result })
    }

    fn put_geometry<'a>(
        &'a self,
        hash: &'a str,
        geometry: &'a BlockGeometry,
    ) -> BoxFut<'a, Result<()>> {
        let result = (|| -> Result<()> {
            let value = serde_json::to_vec(&GeometryDoc::from_geometry(geometry))?;
            self.db.put(Self::geometry_key(hash).as_bytes(), value)?;
            Ok(())
        })();
        Box::pin(async move { result })
    }
}
