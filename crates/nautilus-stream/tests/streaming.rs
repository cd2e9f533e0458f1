//! End-to-end streaming behavior over an in-memory store and a synthetic
//! upstream chain.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::time::{sleep, timeout};

use nautilus_chain::{BoxFut, ChainSource, RawBlock, RawOutput, RawTransaction, SourceError};
use nautilus_layout::{LayoutConfig, LayoutEngine};
use nautilus_spiral::{SpiralConfig, SpiralIndex, SpiralPos};
use nautilus_store::{DocumentStore, DynDocumentStore, MemoryStore};
use nautilus_stream::{StreamConfig, StreamEngine, TickDriver};

/// Deterministic upstream: small blocks derived from the height.
struct SyntheticChain {
    tip: u64,
}

impl ChainSource for SyntheticChain {
    fn block_at(&self, height: u64) -> BoxFut<'_, Result<RawBlock, SourceError>> {
        let tip = self.tip;
        Box::pin(async move {
            if height > tip {
                return Err(SourceError::NotFound(height));
            }
            let tx_count = 1 + height % 5;
            let tx = (0..tx_count)
                .map(|i| RawTransaction {
                    hash: format!("{:064x}", (height << 16) | i),
                    fee: (height % 3) * 10,
                    out: vec![RawOutput {
                        value: 1_000 + height * 7 + i,
                        spent: i % 2 == 0,
                    }],
                })
                .collect();
            Ok(RawBlock {
                height,
                hash: format!("{:064x}", height),
                tx,
            })
        })
    }

    fn tip(&self) -> BoxFut<'_, Result<u64, SourceError>> {
        let tip = self.tip;
        Box::pin(async move { Ok(tip) })
    }
}

/// Upstream that blocks every fetch on a semaphore, so tests can hold a
/// batch in flight for as long as they need.
struct GatedChain {
    inner: SyntheticChain,
    gate: Arc<Semaphore>,
}

impl ChainSource for GatedChain {
    fn block_at(&self, height: u64) -> BoxFut<'_, Result<RawBlock, SourceError>> {
        Box::pin(async move {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| SourceError::Transport(e.to_string()))?;
            permit.forget();
            self.inner.block_at(height).await
        })
    }

    fn tip(&self) -> BoxFut<'_, Result<u64, SourceError>> {
        self.inner.tip()
    }
}

fn test_config(radius: u32) -> StreamConfig {
    StreamConfig {
        window_radius: radius,
        reload_distance: 0.0,
        recompute_every: 1,
        ..StreamConfig::default()
    }
}

fn build_engine(
    max_height: u64,
    radius: u32,
    store: Arc<MemoryStore>,
    source: Arc<dyn ChainSource>,
) -> StreamEngine {
    let spiral = SpiralIndex::build(&SpiralConfig {
        max_height,
        ..SpiralConfig::default()
    });
    StreamEngine::new(
        spiral,
        store as DynDocumentStore,
        source,
        LayoutEngine::new(LayoutConfig::default()),
        test_config(radius),
    )
}

/// Tick the engine until `done` holds or the deadline passes.
async fn drive_until(
    engine: &mut StreamEngine,
    viewer: SpiralPos,
    done: impl Fn(&StreamEngine) -> bool,
) {
    timeout(Duration::from_secs(10), async {
        loop {
            engine.update(viewer);
            if done(engine) {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("engine did not settle in time");
}

#[tokio::test(flavor = "multi_thread")]
async fn initial_load_fills_the_window() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(SyntheticChain { tip: 100 });
    let mut engine = build_engine(100, 4, store, source);
    let viewer = engine.spiral().position(100).unwrap();

    drive_until(&mut engine, viewer, |e| e.window().len() == 5).await;

    for height in 96..=100 {
        assert!(engine.window().contains(height), "height {} missing", height);
    }
    assert_eq!(engine.stats().merged, 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn moving_viewer_recenters_and_evicts() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(SyntheticChain { tip: 100 });
    let mut engine = build_engine(100, 4, store, source);

    let tip_pos = engine.spiral().position(100).unwrap();
    drive_until(&mut engine, tip_pos, |e| e.window().len() == 5).await;

    // Walk to height 80; the nearest-height band follows a few heights per
    // recompute, so this takes several ticks.
    let target = engine.spiral().position(80).unwrap();
    drive_until(&mut engine, target, |e| {
        e.window().reference_height() == 80 && e.window().len() == 9
    })
    .await;

    for height in 76..=84 {
        assert!(engine.window().contains(height), "height {} missing", height);
    }
    for height in 96..=100 {
        assert!(!engine.window().contains(height), "height {} lingers", height);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn results_landing_after_recenter_are_discarded() {
    let gate = Arc::new(Semaphore::new(0));
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(GatedChain {
        inner: SyntheticChain { tip: 200 },
        gate: gate.clone(),
    });
    let mut engine = build_engine(200, 2, store, source);

    // Dispatch a batch for the tip band and leave it stuck upstream.
    let tip_pos = engine.spiral().position(200).unwrap();
    engine.update(tip_pos);
    assert!(engine.is_loading());

    // Walk away while the batch is still in flight; every recompute bumps
    // the window generation.
    let away = engine.spiral().position(170).unwrap();
    for _ in 0..40 {
        engine.update(away);
        sleep(Duration::from_millis(1)).await;
    }
    let reference = engine.window().reference_height();
    assert!(reference < 200);

    // Let the stuck batch finish and drain it.
    gate.add_permits(10_000);
    drive_until(&mut engine, away, |e| e.stats().discarded > 0).await;

    // Nothing from the stale batch may have landed outside the live band.
    for height in engine.window().heights() {
        assert!(height.abs_diff(engine.window().reference_height()) <= 2);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn cached_geometry_is_not_regenerated() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(SyntheticChain { tip: 50 });

    let mut engine = build_engine(50, 3, store.clone(), source.clone());
    let viewer = engine.spiral().position(50).unwrap();
    drive_until(&mut engine, viewer, |e| e.window().len() == 4).await;

    let cached = store.geometry_count();
    assert_eq!(cached, 4);
    let first = store.geometry_by_hash(&format!("{:064x}", 50)).await.unwrap();

    // A fresh session over the same store must reuse, not regenerate.
    let mut engine = build_engine(50, 3, store.clone(), source);
    drive_until(&mut engine, viewer, |e| e.window().len() == 4).await;

    assert_eq!(store.geometry_count(), cached);
    let second = store.geometry_by_hash(&format!("{:064x}", 50)).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread")]
async fn driver_runs_and_stops_deterministically() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(SyntheticChain { tip: 100 });
    let engine = build_engine(100, 4, store, source);
    let viewer = engine.spiral().position(100).unwrap();

    let (_position_tx, position_rx) = watch::channel(viewer);
    let driver = TickDriver::spawn(engine, Duration::from_millis(2), position_rx);

    sleep(Duration::from_millis(300)).await;
    assert!(!driver.is_finished());

    let engine = driver.stop().await.unwrap();
    assert!(!engine.window().is_empty());
    assert!(engine.window().contains(100));
}
