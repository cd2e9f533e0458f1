//! Explicit tick scheduling.
//!
//! The engine is driven by one interval task with a shutdown channel and a
//! join handle, so teardown is deterministic: `stop` resolves only after
//! the task has exited and hands the engine back.

use std::time::Duration;

use nautilus_spiral::SpiralPos;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::engine::StreamEngine;
use crate::{Result, StreamError};

/// Handle to a running tick loop.
pub struct TickDriver {
    handle: JoinHandle<StreamEngine>,
    shutdown: watch::Sender<bool>,
}

impl TickDriver {
    /// Drive `engine` every `period`, reading the viewer position from
    /// `position_rx`.
    pub fn spawn(
        mut engine: StreamEngine,
        period: Duration,
        position_rx: watch::Receiver<SpiralPos>,
    ) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let viewer = *position_rx.borrow();
                        engine.update(viewer);
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            tracing::debug!("tick driver stopped");
            engine
        });
        Self { handle, shutdown }
    }

    /// Stop the loop and recover the engine.
    pub async fn stop(self) -> Result<StreamEngine> {
        let _ = self.shutdown.send(true);
        self.handle
            .await
            .map_err(|err| StreamError::Driver(err.to_string()))
    }

    /// Whether the loop has already exited on its own.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
