//! Control-loop facade.

use nautilus_chain::DynChainSource;
use nautilus_layout::LayoutEngine;
use nautilus_spiral::{SpiralIndex, SpiralPos};
use nautilus_store::DynDocumentStore;

use crate::buffers::BufferConfig;
use crate::coordinator::{LoadCoordinator, RequestOutcome};
use crate::residency::{MergeOutcome, Resident, ResidencyWindow};

/// Streaming behavior parameters.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Residency window radius in heights.
    pub window_radius: u32,
    /// Viewer must move at least this far (world units) before another load
    /// is considered.
    pub reload_distance: f64,
    /// Window recompute cadence in ticks; merges still happen every tick.
    pub recompute_every: u64,
    /// Batch payload capacity.
    pub buffers: BufferConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            window_radius: 12,
            reload_distance: 100.0,
            recompute_every: 30,
            buffers: BufferConfig::default(),
        }
    }
}

/// Counters for observability; all monotonic.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineStats {
    /// Blocks merged into the window.
    pub merged: u64,
    /// Results discarded as stale or out of band.
    pub discarded: u64,
    /// Requests dropped because a batch was in flight.
    pub dropped_requests: u64,
    /// Batches dispatched.
    pub dispatched: u64,
}

/// Single-threaded streaming control loop.
///
/// [`update`](Self::update) is the whole external surface: call it once per
/// tick with the viewer position. It polls the coordinator, merges finished
/// work, and recomputes the window when the viewer has moved far enough.
/// It never blocks.
pub struct StreamEngine {
    spiral: SpiralIndex,
    window: ResidencyWindow,
    coordinator: LoadCoordinator,
    config: StreamConfig,
    tick: u64,
    last_load_pos: Option<SpiralPos>,
    stats: EngineStats,
}

impl StreamEngine {
    /// Assemble an engine over its collaborators, with the window initially
    /// centered on the chain tip.
    pub fn new(
        spiral: SpiralIndex,
        store: DynDocumentStore,
        source: DynChainSource,
        layout: LayoutEngine,
        config: StreamConfig,
    ) -> Self {
        let max_height = spiral.max_height();
        let window = ResidencyWindow::new(max_height, config.window_radius, max_height);
        let coordinator =
            LoadCoordinator::new(store, source, layout, config.buffers.clone());
        Self {
            spiral,
            window,
            coordinator,
            config,
            tick: 0,
            last_load_pos: None,
            stats: EngineStats::default(),
        }
    }

    /// One control tick.
    pub fn update(&mut self, viewer: SpiralPos) {
        self.merge_completed();

        let due = self.tick % self.config.recompute_every == 0;
        self.tick += 1;
        if !due {
            return;
        }

        // Small jitter in the viewer position must not trigger reloads.
        if let Some(last) = self.last_load_pos {
            if viewer.distance(&last) < self.config.reload_distance {
                return;
            }
        }

        let nearest = self.window.nearest_height_to(viewer, &self.spiral);
        let load_set = self.window.recenter(nearest);
        match self.coordinator.request(load_set, self.window.generation()) {
            RequestOutcome::Dispatched => {
                self.last_load_pos = Some(viewer);
                self.stats.dispatched += 1;
            }
            RequestOutcome::Dropped => {
                self.stats.dropped_requests += 1;
            }
            RequestOutcome::Empty => {
                self.last_load_pos = Some(viewer);
            }
        }
    }

    fn merge_completed(&mut self) {
        let Some(batch) = self.coordinator.poll() else {
            return;
        };
        let (generation, loaded, buffers) = batch.into_parts();
        for (slot, block) in loaded {
            let geometry = buffers.geometry(slot);
            match self
                .window
                .merge(slot.height, Resident { block, geometry }, generation)
            {
                MergeOutcome::Inserted => self.stats.merged += 1,
                MergeOutcome::AlreadyResident => {}
                MergeOutcome::StaleGeneration | MergeOutcome::OutOfRange => {
                    tracing::debug!(height = slot.height, "discarding stale load result");
                    self.stats.discarded += 1;
                }
            }
        }
        self.coordinator.reclaim(buffers);
    }

    /// The residency window.
    pub fn window(&self) -> &ResidencyWindow {
        &self.window
    }

    /// The spiral placement table.
    pub fn spiral(&self) -> &SpiralIndex {
        &self.spiral
    }

    /// Whether a load is outstanding.
    pub fn is_loading(&self) -> bool {
        self.coordinator.is_busy()
    }

    /// Counters so far.
    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}
