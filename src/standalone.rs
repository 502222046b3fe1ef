use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::watch;

use watch_node_modules::{DevServer, ModuleRecord, ReloadNotification};

/// Dev server stand-in backed by a module-graph snapshot on disk.
///
/// The snapshot is re-read on every query so it can be regenerated while the
/// watcher runs. Reloads are logged; notifications go to stdout as JSON lines.
pub struct SnapshotServer {
    snapshot: Option<PathBuf>,
    closed_tx: watch::Sender<bool>,
}

impl SnapshotServer {
    pub fn new(snapshot: Option<PathBuf>) -> Self {
        let (closed_tx, _) = watch::channel(false);
        Self {
            snapshot,
            closed_tx,
        }
    }

    pub fn shutdown(&self) {
        self.closed_tx.send_replace(true);
    }
}

fn read_snapshot(path: &Path) -> anyhow::Result<Vec<ModuleRecord>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[async_trait]
impl DevServer for SnapshotServer {
    fn modules(&self) -> Vec<ModuleRecord> {
        let Some(path) = &self.snapshot else {
            return Vec::new();
        };
        match read_snapshot(path) {
            Ok(modules) => modules,
            Err(err) => {
                tracing::warn!("failed to read module snapshot {}: {err:#}", path.display());
                Vec::new()
            }
        }
    }

    async fn reload_module(&self, module: &ModuleRecord) -> anyhow::Result<()> {
        tracing::info!(url = %module.url, "reload module");
        Ok(())
    }

    async fn broadcast(&self, notification: ReloadNotification) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string(&notification)?);
        Ok(())
    }

    async fn closed(&self) {
        let mut rx = self.closed_tx.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_read_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("modules.json");
        std::fs::write(&path, r#"[{"id":"a","url":"/a.js","file":"/w/a.js"}]"#).unwrap();

        let server = SnapshotServer::new(Some(path));
        let modules = server.modules();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].file.as_deref(), Some("/w/a.js"));
    }

    #[test]
    fn test_unreadable_snapshot_yields_no_modules() {
        let tmp = tempfile::tempdir().unwrap();
        let server = SnapshotServer::new(Some(tmp.path().join("missing.json")));
        assert!(server.modules().is_empty());
        assert!(SnapshotServer::new(None).modules().is_empty());
    }

    #[tokio::test]
    async fn test_closed_resolves_after_shutdown() {
        let server = SnapshotServer::new(None);
        server.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(1), server.closed())
            .await
            .expect("closed() did not resolve");
    }
}
