//! Correlates a changed file on disk with the module records the host holds for it.
//!
//! The host does not always key dependency modules by their source path:
//! pre-bundled dependencies live under a cache directory with mangled names,
//! and linked packages may be recorded under their symlink target. The
//! canonicalizer derives every plausible form; the matcher searches the live
//! module collection for any of them.

pub mod canonical;
pub mod matcher;

pub use canonical::{CanonicalPathSet, canonicalize};
pub use matcher::match_modules;
