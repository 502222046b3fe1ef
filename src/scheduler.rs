use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Context;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, warn};

use crate::correlate::{canonicalize, match_modules};
use crate::host::{DevServer, ModuleRecord, ReloadNotification};

/// Default wait between the first change event and the match-and-apply pass.
/// Editors and compilers often save a file in several writes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// An update waiting on its debounce or currently applying.
#[derive(Debug, Clone, Copy)]
pub struct PendingUpdate {
    pub scheduled_at: Instant,
}

/// Result of one match-and-apply pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Every matched module was reloaded and clients were told to refresh.
    Reloaded { modules: Vec<ModuleRecord> },
    /// The host has modules, but none correspond to the changed file.
    NoMatch,
    /// The host has not loaded any module yet.
    NoModulesLoaded,
    /// A host operation failed part-way through.
    Failed { error: String },
}

/// Coalesces change events per path into debounced reload passes.
///
/// At most one update is pending per raw path. Events arriving while one is
/// pending are dropped: the pending pass reads the module graph only after
/// its debounce elapses, so it already covers them. Distinct paths run
/// independently.
pub struct UpdateScheduler<H: DevServer> {
    inner: Arc<Inner<H>>,
}

impl<H: DevServer> Clone for UpdateScheduler<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<H> {
    server: Arc<H>,
    working_directory: PathBuf,
    debounce: Duration,
    pending: Mutex<HashMap<String, PendingUpdate>>,
}

impl<H: DevServer> UpdateScheduler<H> {
    pub fn new(server: Arc<H>, working_directory: PathBuf, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                server,
                working_directory,
                debounce,
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Schedule an update for `raw_path`.
    ///
    /// Returns the spawned task, or `None` if an update for the same path is
    /// already pending. Must be called from within a tokio runtime. The task
    /// logs under the caller's current span.
    pub fn schedule(&self, raw_path: &str) -> Option<JoinHandle<UpdateOutcome>> {
        let scheduled_at = Instant::now();
        match self.inner.lock_pending().entry(raw_path.to_owned()) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(slot) => {
                slot.insert(PendingUpdate { scheduled_at });
            }
        }

        debug!(path = raw_path, "queueing file update");

        let guard = PendingGuard {
            inner: Arc::clone(&self.inner),
            key: raw_path.to_owned(),
        };
        let deadline = scheduled_at + self.inner.debounce;
        Some(tokio::spawn(
            async move {
                tokio::time::sleep_until(deadline).await;
                guard.inner.apply(&guard.key).await
            }
            .in_current_span(),
        ))
    }

    pub fn is_pending(&self, raw_path: &str) -> bool {
        self.inner.lock_pending().contains_key(raw_path)
    }

    pub fn pending_since(&self, raw_path: &str) -> Option<Instant> {
        self.inner
            .lock_pending()
            .get(raw_path)
            .map(|update| update.scheduled_at)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock_pending().len()
    }
}

impl<H: DevServer> Inner<H> {
    fn lock_pending(&self) -> MutexGuard<'_, HashMap<String, PendingUpdate>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn apply(&self, raw_path: &str) -> UpdateOutcome {
        match self.try_apply(raw_path).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(path = raw_path, "error while processing file change: {err:#}");
                UpdateOutcome::Failed {
                    error: format!("{err:#}"),
                }
            }
        }
    }

    async fn try_apply(&self, raw_path: &str) -> anyhow::Result<UpdateOutcome> {
        let canonical = canonicalize(raw_path, &self.working_directory);
        let live = self.server.modules();

        if live.is_empty() {
            warn!(path = raw_path, "no matching module found: host has no modules loaded yet");
            return Ok(UpdateOutcome::NoModulesLoaded);
        }

        let matched = match_modules(&canonical, &live);
        if matched.is_empty() {
            warn!(path = raw_path, "no matching module found");
            return Ok(UpdateOutcome::NoMatch);
        }

        info!(
            "triggering file changes:\n-  {}",
            matched
                .iter()
                .map(|m| m.file.as_deref().unwrap_or(m.identity_key()))
                .collect::<Vec<_>>()
                .join("\n-  ")
        );

        for module in &matched {
            self.server
                .reload_module(module)
                .await
                .with_context(|| format!("reloading module {}", module.identity_key()))?;
        }
        self.server
            .broadcast(ReloadNotification::FullReload {
                path: Some(raw_path.to_owned()),
            })
            .await
            .context("broadcasting full reload")?;

        Ok(UpdateOutcome::Reloaded { modules: matched })
    }
}

/// Clears the pending entry when the update task ends, whether it returned,
/// failed, or panicked.
struct PendingGuard<H> {
    inner: Arc<Inner<H>>,
    key: String,
}

impl<H> Drop for PendingGuard<H> {
    fn drop(&mut self) {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingServer {
        modules: Vec<ModuleRecord>,
        snapshots: AtomicUsize,
    }

    #[async_trait]
    impl DevServer for CountingServer {
        fn modules(&self) -> Vec<ModuleRecord> {
            self.snapshots.fetch_add(1, Ordering::SeqCst);
            self.modules.clone()
        }

        async fn reload_module(&self, _module: &ModuleRecord) -> anyhow::Result<()> {
            Ok(())
        }

        async fn broadcast(&self, _notification: ReloadNotification) -> anyhow::Result<()> {
            Ok(())
        }

        async fn closed(&self) {
            std::future::pending::<()>().await
        }
    }

    fn scheduler(server: Arc<CountingServer>) -> UpdateScheduler<CountingServer> {
        UpdateScheduler::new(server, PathBuf::from("/w"), DEFAULT_DEBOUNCE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_schedule_for_same_path_is_dropped() {
        let server = Arc::new(CountingServer::default());
        let scheduler = scheduler(Arc::clone(&server));

        let first = scheduler.schedule("node_modules/a/x.js");
        assert!(first.is_some());
        assert!(scheduler.schedule("node_modules/a/x.js").is_none());
        assert_eq!(scheduler.pending_count(), 1);

        first.unwrap().await.unwrap();
        assert_eq!(server.snapshots.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_path_is_reschedulable_after_completion() {
        let server = Arc::new(CountingServer::default());
        let scheduler = scheduler(Arc::clone(&server));

        let outcome = scheduler.schedule("node_modules/a/x.js").unwrap().await.unwrap();
        assert_eq!(outcome, UpdateOutcome::NoModulesLoaded);
        assert!(!scheduler.is_pending("node_modules/a/x.js"));

        assert!(scheduler.schedule("node_modules/a/x.js").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_paths_are_scheduled_independently() {
        let server = Arc::new(CountingServer::default());
        let scheduler = scheduler(Arc::clone(&server));

        let a = scheduler.schedule("node_modules/a/x.js").unwrap();
        let b = scheduler.schedule("node_modules/b/y.js").unwrap();
        assert_eq!(scheduler.pending_count(), 2);

        a.await.unwrap();
        b.await.unwrap();
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(server.snapshots.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_since_records_first_event() {
        let server = Arc::new(CountingServer::default());
        let scheduler = scheduler(server);

        let start = Instant::now();
        let handle = scheduler.schedule("node_modules/a/x.js").unwrap();
        tokio::time::advance(Duration::from_millis(10)).await;
        assert!(scheduler.schedule("node_modules/a/x.js").is_none());
        assert_eq!(scheduler.pending_since("node_modules/a/x.js"), Some(start));

        handle.await.unwrap();
        assert_eq!(scheduler.pending_since("node_modules/a/x.js"), None);
    }
}
