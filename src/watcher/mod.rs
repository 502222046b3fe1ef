pub mod event;

use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;

use crate::error::WatchError;
use event::{ChangeEvent, ChangeKind, has_watched_extension};

/// Handle to a running watcher. Dropping it stops watching.
pub struct WatcherHandle {
    /// Keep alive: dropping the watcher stops the OS watches.
    _watcher: RecommendedWatcher,
    /// The bridge task forwarding events from the std channel to the tokio channel.
    _bridge_task: JoinHandle<()>,
    roots: Vec<PathBuf>,
}

impl WatcherHandle {
    /// Roots that are actually being watched.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Start a recursive watcher on every root.
///
/// A root that cannot be watched is logged and skipped; the call fails only
/// when no root could be watched at all. Returns a `WatcherHandle` (must be
/// kept alive) and a tokio mpsc receiver yielding `ChangeEvent`s for files
/// whose extension is in `extensions`. Only changes made after this call are
/// reported.
pub fn start_watcher(
    roots: &[PathBuf],
    extensions: Vec<String>,
) -> Result<(WatcherHandle, tokio_mpsc::Receiver<ChangeEvent>), WatchError> {
    let (std_tx, std_rx) = std::sync::mpsc::channel::<notify::Result<notify::Event>>();

    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = std_tx.send(res);
    })?;

    let mut watched = Vec::with_capacity(roots.len());
    let mut first_error = None;
    for root in roots {
        match watcher.watch(root, RecursiveMode::Recursive) {
            Ok(()) => watched.push(root.clone()),
            Err(e) => {
                let err = WatchError::PathWatchFailed {
                    path: root.clone(),
                    reason: e.to_string(),
                };
                tracing::warn!("{err}");
                first_error.get_or_insert(err);
            }
        }
    }
    if watched.is_empty() {
        return Err(first_error.unwrap_or(WatchError::NoWatchableRoots { count: roots.len() }));
    }

    let (tokio_tx, tokio_rx) = tokio_mpsc::channel::<ChangeEvent>(256);

    // Bridge: spawn_blocking to receive from std channel, classify, forward to tokio
    let bridge_task = tokio::task::spawn_blocking(move || {
        while let Ok(result) = std_rx.recv() {
            match result {
                Ok(event) => {
                    let Some(kind) = ChangeKind::from_notify(&event.kind) else {
                        continue;
                    };
                    for path in event.paths {
                        if !has_watched_extension(&path, &extensions) {
                            continue;
                        }
                        if tokio_tx.blocking_send(ChangeEvent { kind, path }).is_err() {
                            return; // receiver dropped, shutdown
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("watcher error: {err}");
                }
            }
        }
    });

    Ok((
        WatcherHandle {
            _watcher: watcher,
            _bridge_task: bridge_task,
            roots: watched,
        },
        tokio_rx,
    ))
}
