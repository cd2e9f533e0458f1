//! Asynchronous batch loader.
//!
//! One batch is in flight at a time. A request arriving while a batch is
//! outstanding is dropped, not queued; the window recompute that issued it
//! will simply try again, so staleness stays bounded without a queue that
//! could grow without bound.
//!
//! The background task only returns owned data over a channel; the resident
//! map is never touched from here.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::oneshot;

use nautilus_chain::{normalize, Block, BlockGeometry, DynChainSource};
use nautilus_layout::LayoutEngine;
use nautilus_store::DynDocumentStore;

use crate::buffers::{BatchBuffers, BufferConfig, SlotRange};
use crate::Result;

/// Outcome of a load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Batch dispatched to the background task.
    Dispatched,
    /// A batch is already in flight; retry on the next recompute.
    Dropped,
    /// Nothing to load.
    Empty,
}

/// A completed batch, ready to merge.
pub struct LoadBatch {
    /// Window generation stamped at request time.
    pub generation: u64,
    /// Loaded blocks and their slots in the batch buffers.
    pub loaded: Vec<(SlotRange, Block)>,
    buffers: BatchBuffers,
}

impl LoadBatch {
    /// Split into mergeable entries and the reusable buffers.
    pub fn into_parts(self) -> (u64, Vec<(SlotRange, Block)>, BatchBuffers) {
        (self.generation, self.loaded, self.buffers)
    }
}

/// Sequential background loader with buffer reuse.
pub struct LoadCoordinator {
    store: DynDocumentStore,
    source: DynChainSource,
    layout: std::sync::Arc<LayoutEngine>,
    buffer_config: BufferConfig,
    buffers: Option<BatchBuffers>,
    in_flight: Option<oneshot::Receiver<LoadBatch>>,
}

impl LoadCoordinator {
    /// Create a coordinator over the given collaborators.
    pub fn new(
        store: DynDocumentStore,
        source: DynChainSource,
        layout: LayoutEngine,
        buffer_config: BufferConfig,
    ) -> Self {
        let buffers = BatchBuffers::new(&buffer_config);
        Self {
            store,
            source,
            layout: std::sync::Arc::new(layout),
            buffer_config,
            buffers: Some(buffers),
            in_flight: None,
        }
    }

    /// Whether a batch is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Dispatch a load for `heights`, stamped with the window `generation`.
    ///
    /// Must run inside a tokio runtime; the fetch itself happens on a
    /// spawned task and completion is observed via [`poll`](Self::poll).
    pub fn request(&mut self, heights: Vec<u64>, generation: u64) -> RequestOutcome {
        if heights.is_empty() {
            return RequestOutcome::Empty;
        }
        if self.in_flight.is_some() {
            return RequestOutcome::Dropped;
        }
        // Buffers absent means the previous batch has not been reclaimed
        // yet; treat it like an outstanding request.
        let Some(mut buffers) = self.buffers.take() else {
            return RequestOutcome::Dropped;
        };
        buffers.reset();

        let (tx, rx) = oneshot::channel();
        let store = self.store.clone();
        let source = self.source.clone();
        let layout = self.layout.clone();

        tokio::spawn(async move {
            let mut loaded = Vec::with_capacity(heights.len());
            for height in heights {
                match load_one(&store, &source, &layout, height).await {
                    Ok((block, geometry)) => {
                        match buffers.push_block(&block, &geometry) {
                            Some(slot) => loaded.push((slot, block)),
                            None => {
                                tracing::warn!(height, "batch buffers full, deferring block");
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(height, %err, "load failed, leaving height unresident");
                    }
                }
            }
            let _ = tx.send(LoadBatch {
                generation,
                loaded,
                buffers,
            });
        });

        self.in_flight = Some(rx);
        RequestOutcome::Dispatched
    }

    /// Non-blocking completion check; the control thread calls this once
    /// per tick.
    pub fn poll(&mut self) -> Option<LoadBatch> {
        let rx = self.in_flight.as_mut()?;
        match rx.try_recv() {
            Ok(batch) => {
                self.in_flight = None;
                Some(batch)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                // The task died without responding; its buffers are gone.
                tracing::warn!("load task dropped without a response");
                self.in_flight = None;
                self.buffers = Some(BatchBuffers::new(&self.buffer_config));
                None
            }
        }
    }

    /// Hand a merged batch's buffers back for the next request.
    pub fn reclaim(&mut self, buffers: BatchBuffers) {
        self.buffers = Some(buffers);
    }
}

/// Load one height: cached block and geometry if present, otherwise fetch,
/// normalize, synthesize, and persist before returning.
async fn load_one(
    store: &DynDocumentStore,
    source: &DynChainSource,
    layout: &LayoutEngine,
    height: u64,
) -> Result<(Block, BlockGeometry)> {
    let block = match store.block_by_height(height).await? {
        Some(block) => block,
        None => {
            let raw = source.block_at(height).await?;
            let block = normalize(raw)?;
            if let Err(err) = store.put_block(&block, unix_now()).await {
                tracing::warn!(height, %err, "block cache write failed");
            }
            block
        }
    };

    let geometry = match store.geometry_by_hash(&block.hash).await? {
        Some(geometry) => geometry,
        None => {
            let geometry = layout.geometry(&block)?;
            if let Err(err) = store.put_geometry(&block.hash, &geometry).await {
                // Still usable this session; regenerated next time.
                tracing::warn!(height, %err, "geometry persist failed");
            }
            geometry
        }
    };

    Ok((block, geometry))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
