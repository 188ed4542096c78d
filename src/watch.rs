//! Watch Mode Daemon
//!
//! Monitors the dotfiles root for blobs written by external sync tooling and
//! refreshes the working copies of linked entries as new versions land.

use crate::blob::is_blob_candidate;
use crate::error::DotfileError;
use crate::repository::{update_decrypted_from_encrypted, Repository};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Watch mode configuration
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Batch window in milliseconds
    pub batch_window_ms: u64,
    /// Maximum paths per batch before it is flushed early
    pub max_batch_size: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            batch_window_ms: 500,
            max_batch_size: 100,
        }
    }
}

/// Collects changed blob paths until a batch is due
#[derive(Debug)]
struct EventBatcher {
    config: WatchConfig,
    pending: BTreeSet<PathBuf>,
    first_event: Option<Instant>,
}

impl EventBatcher {
    fn new(config: WatchConfig) -> Self {
        Self {
            config,
            pending: BTreeSet::new(),
            first_event: None,
        }
    }

    /// Queue a path; returns true if the batch is full
    fn add(&mut self, path: PathBuf) -> bool {
        let is_blob = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(is_blob_candidate)
            .unwrap_or(false);
        if !is_blob {
            return false;
        }
        self.first_event.get_or_insert_with(Instant::now);
        self.pending.insert(path);
        self.pending.len() >= self.config.max_batch_size
    }

    fn is_due(&self) -> bool {
        let window = Duration::from_millis(self.config.batch_window_ms);
        self.first_event
            .map(|first| first.elapsed() >= window)
            .unwrap_or(false)
    }

    fn take_batch(&mut self) -> Vec<PathBuf> {
        self.first_event = None;
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}

/// Paths a notify event reports as newly present
fn changed_paths(event: Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) => event.paths,
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => {
            // Renames report [from, to]; only the destination matters
            event.paths.into_iter().last().into_iter().collect()
        }
        EventKind::Modify(_) => event.paths,
        _ => Vec::new(),
    }
}

/// Watch mode daemon
pub struct WatchDaemon {
    repo: Repository,
    config: WatchConfig,
    running: Arc<AtomicBool>,
}

impl WatchDaemon {
    pub fn new(repo: Repository, config: WatchConfig) -> Self {
        Self {
            repo,
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag that stops [`WatchDaemon::run`] when cleared
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Watch until stopped or the watcher disconnects
    pub fn run(&self) -> Result<(), DotfileError> {
        let root = self.repo.layout().dotfiles_dir.clone();

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            if let Err(e) = tx.send(res) {
                error!("Error sending watch event: {}", e);
            }
        })
        .map_err(|e| DotfileError::Config(format!("Failed to create watcher: {}", e)))?;
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| DotfileError::Config(format!("Failed to watch {}: {}", root.display(), e)))?;
        info!(root = ?root, "Watching repository");

        let mut batcher = EventBatcher::new(self.config.clone());
        let tick = Duration::from_millis(self.config.batch_window_ms.max(10));

        while self.running.load(Ordering::SeqCst) {
            match rx.recv_timeout(tick) {
                Ok(Ok(event)) => {
                    for path in changed_paths(event) {
                        if batcher.add(path) {
                            self.process(batcher.take_batch());
                        }
                    }
                }
                Ok(Err(e)) => warn!("Watch error: {}", e),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watcher channel disconnected");
                    break;
                }
            }
            if batcher.is_due() {
                self.process(batcher.take_batch());
            }
        }
        Ok(())
    }

    /// Refresh working copies for a batch; failures are logged, not fatal
    fn process(&self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }
        debug!(count = paths.len(), "Processing changed blobs");
        match update_decrypted_from_encrypted(&self.repo, &paths) {
            Ok(refreshed) => {
                for name in refreshed {
                    info!(entry = %name.display(), "Refreshed working copy");
                }
            }
            Err(e) => error!("Failed to refresh working copies: {}", e),
        }
    }
}
