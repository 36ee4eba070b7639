//! Rewrite engines
//!
//! - `groups`: replaces local dependencies of the live project graph with named,
//!   version-constrained dependencies (what `build` puts into package metadata)
//! - `lock`: strips local sources from the lock document records (what `export`
//!   reads)

mod groups;
mod lock;

pub use groups::{GroupRewrite, Replacement, create_named_dependency, rewrite_dependency_groups};
pub use lock::{ANY_VERSION, current_locked_version, rewrite_lock_packages, rewrite_locked_package};
