use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::WatchOptions;
use crate::storage::StoreFile;

/// Fired when another process replaced the persisted store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChanged;

/// Watches the store file for writes made by other processes and turns
/// them into [`StoreChanged`] signals. Events caused by this process's
/// own persists are suppressed through the store handle's write marker,
/// so reacting to a signal can never loop back into another write.
pub struct StoreWatcher {
    rx: Receiver<StoreChanged>,
    _watcher: RecommendedWatcher,
}

impl StoreWatcher {
    pub fn start(file: StoreFile, options: &WatchOptions) -> Result<Self> {
        let store_path = file.path().to_path_buf();
        let file_name: OsString = store_path
            .file_name()
            .with_context(|| format!("store path {} has no file name", store_path.display()))?
            .to_os_string();
        // Watch the parent directory: atomic replaces swap the file via
        // rename, which inode-based watches would lose track of.
        let watch_dir = store_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&watch_dir)
            .with_context(|| format!("creating store directory {}", watch_dir.display()))?;

        let (tx, rx) = unbounded();
        let debounce = Duration::from_millis(options.debounce_ms);
        let grace = Duration::from_millis(options.self_write_grace_ms);
        let mut last_emit: Option<Instant> = None;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(?err, "store watcher error");
                        return;
                    }
                };
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                let ours = event
                    .paths
                    .iter()
                    .any(|path| path.file_name() == Some(file_name.as_os_str()));
                if !ours {
                    return;
                }
                if file.wrote_recently(grace) {
                    tracing::trace!("ignoring change event for our own write");
                    return;
                }
                // A single replace lands as a burst of events; emit once.
                if last_emit.is_some_and(|at| at.elapsed() < debounce) {
                    return;
                }
                last_emit = Some(Instant::now());
                let _ = tx.send(StoreChanged);
            },
            notify::Config::default(),
        )
        .context("creating store file watcher")?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching store directory {}", watch_dir.display()))?;
        tracing::debug!(path = %store_path.display(), "watching store for external writes");

        Ok(Self {
            rx,
            _watcher: watcher,
        })
    }

    /// Block up to `timeout` for an external change signal.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<StoreChanged> {
        match self.rx.recv_timeout(timeout) {
            Ok(signal) => Some(signal),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}
