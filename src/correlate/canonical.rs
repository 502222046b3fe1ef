use std::path::{Component, Path, PathBuf};

use serde::Serialize;

/// Directory segment under which the package manager installs dependencies.
pub const DEPENDENCY_ROOT: &str = "node_modules";

/// Every identifier form the host module graph might use for one changed file.
///
/// Recomputed per event; nothing here is cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalPathSet {
    /// Working-directory-joined, lexically normalized path.
    pub absolute: String,
    pub absolute_forward: String,
    /// `absolute` with its parent directory resolved through symlinks.
    pub resolved: String,
    pub resolved_forward: String,
    /// Package identity in cache-key form (`@scope_pkg`, `lodash__debounce`).
    /// `None` when the path does not sit beneath a dependency root.
    pub package_fragment: Option<String>,
    /// File name in cache-key form, extension kept.
    pub file_fragment: String,
}

impl CanonicalPathSet {
    /// The four literal path variants, compared verbatim against module files.
    pub fn literal_paths(&self) -> [&str; 4] {
        [
            &self.absolute,
            &self.absolute_forward,
            &self.resolved,
            &self.resolved_forward,
        ]
    }
}

/// Derive a [`CanonicalPathSet`] for `raw_path`, which may be absolute or
/// relative to `working_directory`.
///
/// The only I/O is resolving the containing directory through symlinks. When
/// that fails the unresolved path fills the resolved slots and a warning is
/// logged.
pub fn canonicalize(raw_path: &str, working_directory: &Path) -> CanonicalPathSet {
    let absolute = normalize_lexically(&working_directory.join(raw_path));
    let resolved = resolve_containing_dir(&absolute);

    let absolute = absolute.to_string_lossy().into_owned();
    let resolved = resolved.to_string_lossy().into_owned();

    let (package_fragment, file_fragment) = dependency_fragments(raw_path);

    CanonicalPathSet {
        absolute_forward: to_forward_slashes(&absolute),
        resolved_forward: to_forward_slashes(&resolved),
        absolute,
        resolved,
        package_fragment,
        file_fragment,
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root.
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Apply the host's dependency-cache naming convention: separators become `_`
/// and the first `.` becomes `__`.
pub fn to_cache_key(name: &str) -> String {
    name.replace(['/', '\\'], "_").replacen('.', "__", 1)
}

fn to_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

fn resolve_containing_dir(absolute: &Path) -> PathBuf {
    let (Some(dir), Some(file_name)) = (absolute.parent(), absolute.file_name()) else {
        return absolute.to_path_buf();
    };

    match std::fs::canonicalize(dir) {
        Ok(real_dir) => real_dir.join(file_name),
        Err(err) => {
            tracing::warn!(
                path = %absolute.display(),
                "could not resolve symlinks for containing directory: {err}"
            );
            absolute.to_path_buf()
        }
    }
}

/// Split `raw_path` into the cache-key package fragment and file fragment.
fn dependency_fragments(raw_path: &str) -> (Option<String>, String) {
    let segments: Vec<&str> = raw_path
        .split(is_separator)
        .filter(|s| !s.is_empty())
        .collect();

    let file_name = segments.last().copied().unwrap_or_default();
    let file_fragment = cache_key_file_name(file_name);

    let package_fragment = segments
        .iter()
        .rposition(|s| *s == DEPENDENCY_ROOT)
        .and_then(|idx| {
            let rest = &segments[idx + 1..];
            let width = if rest.first()?.starts_with('@') { 2 } else { 1 };
            Some(to_cache_key(&rest[..width.min(rest.len())].join("/")))
        });

    (package_fragment, file_fragment)
}

fn cache_key_file_name(file_name: &str) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.extension() {
        Some(ext) => format!("{}.{}", to_cache_key(&stem), ext.to_string_lossy()),
        None => to_cache_key(&stem),
    }
}
