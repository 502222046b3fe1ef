//! Error types for watcher setup.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while starting the dependency watcher.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("None of the {count} package roots could be watched")]
    NoWatchableRoots { count: usize },

    #[error("Invalid package pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
