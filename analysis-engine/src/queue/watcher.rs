//! Filesystem subscription feeding the daemon's event queue.

use std::path::{Path, PathBuf};

use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch directory {} does not exist or is not a directory", .0.display())]
    MissingDirectory(PathBuf),

    #[error("failed to subscribe to {}: {source}", path.display())]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Live subscription on one directory. Events are buffered in an unbounded
/// channel, so nothing is lost while the consumer is busy with a file.
/// Dropping the value unsubscribes.
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
}

impl DirectoryWatcher {
    pub fn subscribe(dir: &Path, recursive: bool) -> Result<Self, WatchError> {
        if !dir.is_dir() {
            return Err(WatchError::MissingDirectory(dir.to_path_buf()));
        }

        let (tx, events) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // receiver gone means the daemon is shutting down
            let _ = tx.send(res);
        })
        .map_err(|source| WatchError::Subscribe {
            path: dir.to_path_buf(),
            source,
        })?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(dir, mode)
            .map_err(|source| WatchError::Subscribe {
                path: dir.to_path_buf(),
                source,
            })?;

        debug!(dir = %dir.display(), recursive, "Subscribed to directory");
        Ok(Self {
            _watcher: watcher,
            events,
        })
    }

    /// Next raw event, `None` once the underlying watcher has gone away.
    pub async fn next_event(&mut self) -> Option<notify::Result<Event>> {
        self.events.recv().await
    }

    /// Take everything already queued without waiting and return the
    /// created files it held.
    pub fn drain_pending(&mut self) -> Vec<PathBuf> {
        let mut pending = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let Ok(event) = event {
                pending.extend(created_files(&event));
            }
        }
        pending
    }
}

/// Regular files announced by a creation event. Everything else (modify,
/// remove, directory creation) is ignored.
pub fn created_files(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event
            .paths
            .iter()
            .filter(|path| path.is_file())
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}
