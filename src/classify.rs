//! Decides which packages and dependencies get rewritten
//!
//! The same rule applies to all three shapes: the source type must be one of
//! the configured `source_types`, and with `only_develop` a dependency that
//! could be a develop dependency (a directory/path) has to actually be one.

use crate::config::{Config, SourceType};
use crate::dependency::Dependency;
use crate::lockfile::{DependencySpec, LockedPackage};

fn passes_develop_filter(config: &Config, can_be_develop: bool, is_develop: bool) -> bool {
    !(config.only_develop && can_be_develop && !is_develop)
}

/// A `[[package]]` record of the lock document
pub fn is_eligible_package(config: &Config, package: &LockedPackage) -> bool {
    let Some(source_type) = package.source_type() else {
        return false;
    };
    let can_be_develop = source_type == SourceType::Directory;
    let is_develop = can_be_develop && package.is_develop();

    config.accepts(source_type) && passes_develop_filter(config, can_be_develop, is_develop)
}

/// A dependency of the live project graph
pub fn is_eligible_dependency(config: &Config, dependency: &Dependency) -> bool {
    let Some(source_type) = dependency.source_type() else {
        return false;
    };
    let develop = dependency.develop();
    let can_be_develop = develop.is_some();
    let is_develop = develop.unwrap_or(false);

    config.accepts(source_type) && passes_develop_filter(config, can_be_develop, is_develop)
}

/// An entry of a locked package's `dependencies` table
///
/// Bare constraints and marker lists never refer to a local source.
pub fn is_eligible_inner_dependency(config: &Config, spec: &DependencySpec) -> bool {
    let Some(detailed) = spec.as_detailed() else {
        return false;
    };
    let matches = detailed
        .candidate_source_types()
        .into_iter()
        .any(|t| config.accepts(t));
    let can_be_develop = detailed.path.is_some();

    matches && passes_develop_filter(config, can_be_develop, detailed.is_develop())
}
