//! Background maintenance scheduling shared by every tier in this crate.
//!
//! Each cache exposes a synchronous `maintenance()` that sweeps expired
//! entries and enforces size bounds; this module is the one place that
//! knows how to run one of those on a timer without the caller having to
//! manage the task itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Anything that can run a maintenance pass. Implemented by
/// [`crate::blob_store::CompressedBlobStore`], [`crate::call_graph_cache::CallGraphCache`],
/// and [`crate::compilation_tiers::CompilationCacheTiers`].
pub trait Maintainable: Send + Sync + 'static {
    fn run_maintenance(&self) -> usize;
}

/// Handle to a spawned background maintenance loop. Dropping it cancels
/// the loop; call [`MaintenanceHandle::stop`] for the same effect
/// explicitly.
pub struct MaintenanceHandle {
    handle: JoinHandle<()>,
}

impl MaintenanceHandle {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Runs `target.run_maintenance()` on every tick of `interval` until the
/// returned handle is dropped or stopped. Requires a Tokio runtime.
pub fn spawn_background_maintenance<M: Maintainable>(
    target: Arc<M>,
    interval: Duration,
) -> MaintenanceHandle {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            target.run_maintenance();
        }
    });
    MaintenanceHandle { handle }
}
