use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A module record as held by the host dev server's module graph.
///
/// The plugin only reads these; every mutation goes through [`DevServer`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    /// Resolved module id, absent while the host is still resolving it.
    #[serde(default)]
    pub id: Option<String>,
    /// URL the browser requests this module by.
    pub url: String,
    /// Primary on-disk file.
    #[serde(default)]
    pub file: Option<String>,
    /// File backing the client-rendering variant, when the host keeps one.
    #[serde(default)]
    pub client_file: Option<String>,
    /// File backing the server-rendering variant, when the host keeps one.
    #[serde(default)]
    pub ssr_file: Option<String>,
}

impl ModuleRecord {
    /// Key used to de-duplicate matches. Falls back to the URL for records
    /// that have no resolved id yet.
    pub fn identity_key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.url)
    }

    /// Every file path associated with the record: primary, client, ssr.
    pub fn file_paths(&self) -> impl Iterator<Item = &str> {
        [&self.file, &self.client_file, &self.ssr_file]
            .into_iter()
            .filter_map(|p| p.as_deref())
    }
}

/// Notification pushed to connected clients over the host's HMR channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReloadNotification {
    FullReload {
        /// Changed file that triggered the reload.
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
}

/// The capabilities the plugin needs from a running dev server.
#[async_trait]
pub trait DevServer: Send + Sync + 'static {
    /// Snapshot of the live module collection.
    fn modules(&self) -> Vec<ModuleRecord>;

    /// Invalidate the module and re-run its transform.
    async fn reload_module(&self, module: &ModuleRecord) -> anyhow::Result<()>;

    /// Push a notification to every connected client.
    async fn broadcast(&self, notification: ReloadNotification) -> anyhow::Result<()>;

    /// Resolves once the server has shut down.
    async fn closed(&self);
}
