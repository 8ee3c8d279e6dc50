//! File-watch invalidation for [`crate::call_graph_cache::CallGraphCache`].
//!
//! A watcher holds no strong reference to the cache it invalidates; it
//! only pushes change notifications onto a channel, which the cache's
//! owner drains and applies. This keeps the watcher itself droppable
//! independent of cache lifetime, and keeps invalidation off the
//! filesystem-event thread.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::warn;

/// A single file change relevant to call-graph cache invalidation.
#[derive(Debug, Clone)]
pub struct SourceChange {
    pub path: PathBuf,
}

/// Watches a project directory tree and enqueues [`SourceChange`] events
/// for the owner to drain and turn into cache invalidations.
pub struct SourceWatcher {
    _inner: RecommendedWatcher,
    receiver: Receiver<SourceChange>,
}

impl SourceWatcher {
    /// Starts watching `root` recursively. Events for non-source
    /// extensions are not filtered here; callers typically only care
    /// about invalidating the project the path falls under, so filtering
    /// by extension is left to the drain loop.
    pub fn watch(root: &Path) -> notify::Result<Self> {
        let (tx, rx): (Sender<SourceChange>, Receiver<SourceChange>) = channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res
        {
            Ok(event) => {
                if matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) {
                    for path in event.paths {
                        if tx.send(SourceChange { path }).is_err() {
                            // Receiver dropped; watcher will be torn down shortly.
                            break;
                        }
                    }
                }
            }
            Err(e) => warn!(error = %e, "file watcher error"),
        })?;

        watcher.watch(root, RecursiveMode::Recursive)?;

        Ok(SourceWatcher {
            _inner: watcher,
            receiver: rx,
        })
    }

    /// Drains every change queued since the last call, without blocking.
    pub fn drain(&self) -> Vec<SourceChange> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn drain_reports_a_file_write() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = SourceWatcher::watch(dir.path()).unwrap();

        let file = dir.path().join("Foo.cs");
        fs::write(&file, "class Foo {}").unwrap();

        std::thread::sleep(Duration::from_millis(200));
        let changes = watcher.drain();
        assert!(!changes.is_empty(), "expected at least one change event");
    }

    #[test]
    fn drain_is_empty_with_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = SourceWatcher::watch(dir.path()).unwrap();
        let changes = watcher.drain();
        assert!(changes.is_empty());
    }
}
