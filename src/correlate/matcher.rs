use std::collections::HashSet;
use std::path::Path;

use crate::host::ModuleRecord;

use super::canonical::{CanonicalPathSet, normalize_lexically};

/// Package entry points are often re-keyed in the dependency cache, so their
/// file fragment is allowed to match on the package fragment alone.
const ENTRY_FILE_FRAGMENT: &str = "index.js";

/// Select the live modules that correspond to the changed file.
///
/// A module matches when any of these holds:
/// 1. one of its file paths equals one of the literal canonical paths;
/// 2. its primary file contains the package fragment and either contains the
///    file fragment or the file fragment is `index.js`;
/// 3. its primary file, lexically normalized, equals the canonical absolute path.
///
/// The heuristic in (2) can over-match across packages sharing a file name.
/// A spurious reload is cheap; a missed one leaves the page stale.
///
/// Results are de-duplicated by identity key and keep first-match order.
pub fn match_modules(canonical: &CanonicalPathSet, live: &[ModuleRecord]) -> Vec<ModuleRecord> {
    let mut seen = HashSet::new();
    live.iter()
        .filter(|module| is_match(canonical, module))
        .filter(|module| seen.insert(module.identity_key().to_owned()))
        .cloned()
        .collect()
}

fn is_match(canonical: &CanonicalPathSet, module: &ModuleRecord) -> bool {
    let literals = canonical.literal_paths();
    if module.file_paths().any(|p| literals.contains(&p)) {
        return true;
    }

    let Some(file) = module.file.as_deref() else {
        return false;
    };

    if let Some(package) = canonical.package_fragment.as_deref()
        && file.contains(package)
        && (file.contains(&canonical.file_fragment)
            || canonical.file_fragment == ENTRY_FILE_FRAGMENT)
    {
        return true;
    }

    normalize_lexically(Path::new(file)) == Path::new(&canonical.absolute)
}
