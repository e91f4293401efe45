pub mod watcher;
pub mod worker;

pub use watcher::{DirectoryWatcher, WatchError};
pub use worker::{DaemonStats, FileWatchDaemon, WatchConfig};
