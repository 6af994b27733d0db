//! Directory watcher for tree rebuilds.
//!
//! Watches the route and vhost roots recursively and emits a unit signal on
//! every relevant change. Consumers debounce and rebuild; the watcher itself
//! never touches the tree.

use std::path::PathBuf;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// A watcher over the directories a tree is built from.
pub struct TreeWatcher {
    paths: Vec<PathBuf>,
    change_tx: mpsc::UnboundedSender<()>,
}

impl TreeWatcher {
    /// Create a new TreeWatcher.
    ///
    /// Returns the watcher and a receiver of change notifications.
    pub fn new(paths: Vec<PathBuf>) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        (Self { paths, change_tx }, change_rx)
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        tracing::debug!(paths = ?event.paths, "route tree change detected");
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = %e, "watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        for path in &self.paths {
            if path.is_dir() {
                watcher.watch(path, RecursiveMode::Recursive)?;
                tracing::info!(path = %path.display(), "watching for route changes");
            } else {
                tracing::warn!(path = %path.display(), "not watching missing directory");
            }
        }

        Ok(watcher)
    }
}
