use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use super::watcher::{created_files, DirectoryWatcher, WatchError};
use crate::scanners::{log_scan_failure, FileScanner};

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub dir: PathBuf,
    pub recursive: bool,
    /// Pause between the creation event and reading the file, so the
    /// writer has a chance to finish.
    pub settle_delay: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./watch"),
            recursive: false,
            settle_delay: Duration::from_millis(1000),
        }
    }
}

/// Counters reported when the daemon stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DaemonStats {
    /// Files that produced a report
    pub processed: u64,
    /// Reports with a malicious verdict
    pub malicious: u64,
    /// Files dropped because of a per-file error
    pub skipped: u64,
    /// Files still queued when shutdown arrived
    pub abandoned: u64,
}

/// Watches one directory and runs every newly created file through the
/// scanner, one at a time, in arrival order.
pub struct FileWatchDaemon {
    config: WatchConfig,
    scanner: Arc<FileScanner>,
}

impl FileWatchDaemon {
    pub fn new(config: WatchConfig, scanner: FileScanner) -> Self {
        Self {
            config,
            scanner: Arc::new(scanner),
        }
    }

    /// Run until `shutdown` resolves. The shutdown signal is only observed
    /// between files, so a file already being processed always finishes.
    pub async fn run<F>(&self, shutdown: F) -> Result<DaemonStats, WatchError>
    where
        F: Future<Output = ()>,
    {
        let mut watcher = DirectoryWatcher::subscribe(&self.config.dir, self.config.recursive)?;
        info!(
            dir = %self.config.dir.display(),
            recursive = self.config.recursive,
            settle_delay_ms = self.config.settle_delay.as_millis() as u64,
            "Watching for new files"
        );

        let mut stats = DaemonStats::default();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Received shutdown signal, stopping watcher");
                    let pending = watcher.drain_pending();
                    if !pending.is_empty() {
                        for path in &pending {
                            warn!(path = %path.display(), "File not scanned before shutdown");
                        }
                        warn!(count = pending.len(), "Shutdown abandoned queued files");
                        stats.abandoned = pending.len() as u64;
                    }
                    break;
                }

                event = watcher.next_event() => {
                    match event {
                        Some(Ok(event)) => {
                            for path in created_files(&event) {
                                self.process(path, &mut stats).await;
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Filesystem watch error");
                        }
                        None => {
                            error!("Event stream closed unexpectedly");
                            break;
                        }
                    }
                }
            }
        }

        drop(watcher);
        info!(
            processed = stats.processed,
            malicious = stats.malicious,
            skipped = stats.skipped,
            abandoned = stats.abandoned,
            "File watch daemon stopped"
        );
        Ok(stats)
    }

    async fn process(&self, path: PathBuf, stats: &mut DaemonStats) {
        info!(path = %path.display(), "New file detected");
        tokio::time::sleep(self.config.settle_delay).await;

        let scanner = Arc::clone(&self.scanner);
        let scan_path = path.clone();
        let outcome = tokio::task::spawn_blocking(move || scanner.scan(&scan_path)).await;

        match outcome {
            Ok(Ok(report)) => {
                self.scanner.emit(&report);
                stats.processed += 1;
                if report.is_malicious() {
                    stats.malicious += 1;
                }
            }
            Ok(Err(e)) => {
                log_scan_failure(&e);
                stats.skipped += 1;
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Scan task failed");
                stats.skipped += 1;
            }
        }
    }
}
