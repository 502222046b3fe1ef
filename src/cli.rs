use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Hot reload for packages inside node_modules.
///
/// Watches an allow-list of installed packages and reloads the modules a dev
/// server holds for any file that changes beneath them.
#[derive(Parser, Debug)]
#[command(
    name = "watch-node-modules",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve package names to the node_modules directories that would be watched.
    Resolve {
        /// Package names or glob patterns (e.g. "left-pad" or "@scope/*").
        #[arg(required = true)]
        packages: Vec<String>,

        /// Working directory to search from (defaults to the current directory).
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Output results as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Show every path form a changed file is matched against.
    Inspect {
        /// Changed file path, absolute or relative to the working directory.
        path: String,

        /// Working directory the path is relative to.
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Output results as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Watch packages and reload modules listed in a module-graph snapshot.
    ///
    /// Reload notifications are written to stdout as JSON lines. Stops on Ctrl-C.
    Watch {
        /// Package names or glob patterns. Falls back to `packages` in watch-node-modules.toml.
        packages: Vec<String>,

        /// Working directory to search from (defaults to the current directory).
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// JSON file holding an array of module records; re-read on every change.
        #[arg(long)]
        modules: Option<PathBuf>,

        /// Delay between a change and the reload pass, in milliseconds.
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// File extensions that trigger a reload (comma-separated, without the dot).
        #[arg(long, value_delimiter = ',')]
        ext: Vec<String>,
    },
}
