//! Hot reload for packages inside `node_modules`.
//!
//! Dev servers treat installed dependencies as immutable and never watch them.
//! This crate watches an allow-list of packages, correlates each changed file
//! with the module records the host holds for it, and asks the host to reload
//! those modules. The host is reached only through [`host::DevServer`].

pub mod config;
pub mod correlate;
pub mod error;
pub mod host;
pub mod logging;
pub mod plugin;
pub mod resolver;
pub mod scheduler;
pub mod watcher;

pub use host::{DevServer, ModuleRecord, ReloadNotification};
pub use plugin::{PluginOptions, WatchNodeModules, WatchSession};
pub use scheduler::{UpdateOutcome, UpdateScheduler};
