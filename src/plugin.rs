use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

use crate::host::DevServer;
use crate::resolver::{PackageRoots, resolve_package_roots};
use crate::scheduler::{DEFAULT_DEBOUNCE, UpdateScheduler};
use crate::watcher::start_watcher;

/// Name the plugin registers under with the host.
pub const PLUGIN_NAME: &str = "vite-plugin-watch-node-modules";

/// Extensions of the source files the host executes.
pub const DEFAULT_EXTENSIONS: &[&str] = &["js"];

/// Which host command the plugin takes part in. Only the dev server has
/// a module graph to reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginApply {
    Serve,
}

#[derive(Debug, Clone)]
pub struct PluginOptions {
    /// Working directory; defaults to the process's current directory.
    pub cwd: Option<PathBuf>,
    pub debounce: Duration,
    /// Extensions (without the dot) whose changes trigger a reload.
    pub extensions: Vec<String>,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            debounce: DEFAULT_DEBOUNCE,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
        }
    }
}

/// The slice of the host's user config the plugin reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    #[serde(default)]
    pub optimize_deps: OptimizeDeps,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeDeps {
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Partial config the host deep-merges into its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    pub optimize_deps: OptimizeDeps,
    pub build: BuildPatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPatch {
    pub rollup_options: RollupOptionsPatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollupOptionsPatch {
    pub output: RollupOutputPatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupOutputPatch {
    pub inline_dynamic_imports: bool,
}

/// Dev-server plugin that hot-reloads allow-listed packages inside `node_modules`.
#[derive(Debug, Clone)]
pub struct WatchNodeModules {
    packages: Vec<String>,
    options: PluginOptions,
}

impl WatchNodeModules {
    pub fn new<I, S>(packages: I, options: PluginOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
            options,
        }
    }

    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    pub fn apply(&self) -> PluginApply {
        PluginApply::Serve
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    pub fn working_directory(&self) -> anyhow::Result<PathBuf> {
        match &self.options.cwd {
            Some(cwd) => Ok(cwd.clone()),
            None => std::env::current_dir().context("failed to read current directory"),
        }
    }

    /// Config hook: keep watched packages out of dependency pre-bundling, so
    /// the host never serves a stale optimized copy of them.
    ///
    /// Existing exclusions come first; duplicates are dropped.
    pub fn config(&self, host: &HostConfig) -> ConfigPatch {
        let mut exclude: Vec<String> = Vec::new();
        for name in host.optimize_deps.exclude.iter().chain(&self.packages) {
            if !exclude.contains(name) {
                exclude.push(name.clone());
            }
        }

        ConfigPatch {
            optimize_deps: OptimizeDeps { exclude },
            build: BuildPatch {
                rollup_options: RollupOptionsPatch {
                    output: RollupOutputPatch {
                        inline_dynamic_imports: true,
                    },
                },
            },
        }
    }

    /// Server hook: discover package roots, start watching them and route
    /// changes into a fresh [`UpdateScheduler`]. Returns once wiring is done.
    ///
    /// The watcher is torn down when `server.closed()` resolves. Discovery
    /// gaps and watcher failures are logged and leave the server running
    /// without live reload for the affected packages.
    pub async fn configure_server<H: DevServer>(
        &self,
        server: Arc<H>,
    ) -> anyhow::Result<WatchSession<H>> {
        let cwd = self.working_directory()?;
        info!("working directory: {}", cwd.display());

        let packages = self.packages.clone();
        let search_root = cwd.clone();
        let resolved =
            tokio::task::spawn_blocking(move || resolve_package_roots(&packages, &search_root))
                .await
                .context("package discovery task failed")?;

        let scheduler = UpdateScheduler::new(Arc::clone(&server), cwd, self.options.debounce);
        let roots: Vec<PathBuf> = resolved
            .iter()
            .flat_map(|p| p.roots.iter().cloned())
            .collect();

        if roots.is_empty() {
            warn!(
                "no node_modules found to watch for: \"{}\"",
                self.packages.join("\", \"")
            );
            return Ok(WatchSession::unwatched(resolved, scheduler));
        }

        let (handle, mut events) = match start_watcher(&roots, self.options.extensions.clone()) {
            Ok(started) => started,
            Err(err) => {
                error!("failed to start node_modules watcher: {err}");
                return Ok(WatchSession::unwatched(resolved, scheduler));
            }
        };

        info!(
            "watching node_modules changes for:\n  - {}",
            handle
                .roots()
                .iter()
                .map(|r| r.display().to_string())
                .collect::<Vec<_>>()
                .join("\n  - ")
        );

        let forward = {
            let scheduler = scheduler.clone();
            tokio::spawn(
                async move {
                    while let Some(event) = events.recv().await {
                        let path = event.path.to_string_lossy();
                        scheduler.schedule(&path);
                        debug!(kind = ?event.kind, path = %path, "file changed");
                    }
                }
                .in_current_span(),
            )
        };

        let teardown = tokio::spawn(
            async move {
                server.closed().await;
                drop(handle);
                let _ = forward.await;
                info!("node_modules watcher stopped");
            }
            .in_current_span(),
        );

        Ok(WatchSession {
            packages: resolved,
            scheduler,
            teardown: Some(teardown),
        })
    }
}

/// What one `configure_server` call set up.
pub struct WatchSession<H: DevServer> {
    packages: Vec<PackageRoots>,
    scheduler: UpdateScheduler<H>,
    teardown: Option<JoinHandle<()>>,
}

impl<H: DevServer> WatchSession<H> {
    fn unwatched(packages: Vec<PackageRoots>, scheduler: UpdateScheduler<H>) -> Self {
        Self {
            packages,
            scheduler,
            teardown: None,
        }
    }

    /// Discovery result for every configured target, in configuration order.
    pub fn packages(&self) -> &[PackageRoots] {
        &self.packages
    }

    pub fn scheduler(&self) -> &UpdateScheduler<H> {
        &self.scheduler
    }

    pub fn is_watching(&self) -> bool {
        self.teardown.is_some()
    }

    /// Wait until the watcher has been torn down after server shutdown.
    /// Returns immediately when nothing was being watched.
    pub async fn stopped(self) {
        if let Some(teardown) = self.teardown {
            let _ = teardown.await;
        }
    }
}
