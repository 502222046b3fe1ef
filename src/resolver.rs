use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::correlate::canonical::DEPENDENCY_ROOT;
use crate::error::WatchError;

/// Manifest file that marks the root of an installed package.
const MANIFEST_FILE: &str = "package.json";

/// The on-disk roots discovered for one watch target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRoots {
    /// Package name or pattern as configured, e.g. `"left-pad"` or `"@scope/*"`.
    pub target: String,
    pub roots: Vec<PathBuf>,
}

/// Discover the install directories of every watch target beneath `cwd`.
///
/// A target resolves to each directory `**/node_modules/<target>` that holds a
/// `package.json`. Targets may carry glob syntax. Roots are de-duplicated
/// across targets, keeping the first target that found them. A target that
/// resolves to nothing is logged and skipped.
pub fn resolve_package_roots(targets: &[String], cwd: &Path) -> Vec<PackageRoots> {
    let mut seen: Vec<PathBuf> = Vec::new();
    let mut result = Vec::with_capacity(targets.len());

    for target in targets {
        let roots = match find_manifest_dirs(target, cwd) {
            Ok(dirs) => dirs
                .into_iter()
                .filter(|dir| {
                    if seen.contains(dir) {
                        false
                    } else {
                        seen.push(dir.clone());
                        true
                    }
                })
                .collect::<Vec<_>>(),
            Err(err) => {
                tracing::warn!("{err}");
                Vec::new()
            }
        };

        if roots.is_empty() {
            tracing::warn!(package = %target, "no node_modules directory found to watch");
        }

        result.push(PackageRoots {
            target: target.clone(),
            roots,
        });
    }

    result
}

fn find_manifest_dirs(target: &str, cwd: &Path) -> Result<Vec<PathBuf>, WatchError> {
    let pattern = format!(
        "{}/**/{}/{}/{}",
        glob::Pattern::escape(&cwd.to_string_lossy()),
        DEPENDENCY_ROOT,
        target.trim_matches('/'),
        MANIFEST_FILE
    );

    let paths = glob::glob(&pattern).map_err(|e| WatchError::InvalidPattern {
        pattern: target.to_owned(),
        reason: e.to_string(),
    })?;

    let mut dirs: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                tracing::debug!(
                    "skipping unreadable path {}: {}",
                    err.path().display(),
                    err.error()
                );
                None
            }
        })
        .filter_map(|manifest| manifest.parent().map(Path::to_path_buf))
        .collect();
    dirs.sort();
    Ok(dirs)
}
