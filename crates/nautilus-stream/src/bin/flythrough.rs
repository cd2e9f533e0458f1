//! Nautilus flythrough demo
//!
//! Builds a synthetic chain, then flies the viewer down the spiral from the
//! tip toward genesis, streaming blocks in and out of residency.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nautilus_chain::{BoxFut, ChainSource, RawBlock, RawOutput, RawTransaction, SourceError};
use nautilus_layout::{LayoutConfig, LayoutEngine};
use nautilus_spiral::{SpiralConfig, SpiralIndex, SpiralPos};
use nautilus_store::{DynDocumentStore, MemoryStore};
use nautilus_stream::{StreamConfig, StreamEngine, TickDriver};

/// Deterministic fake upstream: block contents derive from the height.
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
            let mut rng = ChaCha8Rng::seed_from_u64(height ^ 0x9e37_79b9);
            let tx_count: u32 = rng.gen_range(1..=24);
            let tx = (0..tx_count)
                .map(|i| RawTransaction {
                    hash: format!("{:064x}", (height << 20) | u64::from(i)),
                    fee: rng.gen_range(0..2_000),
                    out: (0..rng.gen_range(1..=3u32))
                        .map(|_| RawOutput {
                            value: rng.gen_range(1_000..50_000_000),
                            spent: rng.gen_bool(0.4),
                        })
                        .collect(),
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flythrough=info,nautilus_stream=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line args
    let args: Vec<String> = env::args().collect();

    let max_height: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(5_000);

    let seconds: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(5);

    let source = Arc::new(SyntheticChain { tip: max_height });
    let tip = source.tip().await?;

    println!("Nautilus Flythrough");
    println!("===================");
    println!();
    println!("Chain tip at height {}, flying for {}s...", tip, seconds);

    let spiral_config = SpiralConfig {
        max_height: tip,
        ..SpiralConfig::default()
    };
    let spiral = SpiralIndex::build(&spiral_config);

    // Waypoints down the spiral, a couple of heights per frame.
    let waypoints: Vec<SpiralPos> = (0..=tip)
        .rev()
        .step_by(2)
        .filter_map(|h| spiral.position(h))
        .collect();

    let store = Arc::new(MemoryStore::new());
    let engine = StreamEngine::new(
        spiral,
        store.clone() as DynDocumentStore,
        source,
        LayoutEngine::new(LayoutConfig::default()),
        StreamConfig::default(),
    );

    let start = waypoints.first().copied().unwrap_or_default();
    let (position_tx, position_rx) = watch::channel(start);
    let driver = TickDriver::spawn(engine, Duration::from_millis(16), position_rx);

    let frame = Duration::from_millis(30);
    let frames = (seconds * 1000) / 30;
    for pos in waypoints.iter().take(frames as usize) {
        position_tx.send(*pos)?;
        tokio::time::sleep(frame).await;
    }

    let engine = driver.stop().await?;
    let stats = engine.stats();

    println!();
    println!("Flythrough complete:");
    println!("  Resident blocks:    {}", engine.window().len());
    println!("  Reference height:   {}", engine.window().reference_height());
    println!("  Batches dispatched: {}", stats.dispatched);
    println!("  Blocks merged:      {}", stats.merged);
    println!("  Stale discards:     {}", stats.discarded);
    println!("  Dropped requests:   {}", stats.dropped_requests);
    println!("  Cached blocks:      {}", store.block_count());
    println!("  Cached geometry:    {}", store.geometry_count());

    Ok(())
}
