use std::path::Path;

use serde::Deserialize;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "watch-node-modules.toml";

/// Configuration loaded from `watch-node-modules.toml` at the working directory.
///
/// Every field is optional; command-line flags take precedence.
#[derive(Debug, Deserialize, Default)]
pub struct WatchConfig {
    /// Package names (or glob patterns) to watch inside `node_modules`.
    pub packages: Option<Vec<String>>,
    /// Delay between a change and the reload pass, in milliseconds.
    pub debounce_ms: Option<u64>,
    /// File extensions (without the dot) that trigger a reload.
    pub extensions: Option<Vec<String>>,
    /// Default tracing filter when `RUST_LOG` is unset, e.g. `"info"` or `"watch_node_modules=debug"`.
    pub log_level: Option<String>,
}

impl WatchConfig {
    /// Load configuration from `watch-node-modules.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    /// Runs before logging is initialised, so problems go straight to stderr.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("warning: failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                eprintln!("warning: failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}
