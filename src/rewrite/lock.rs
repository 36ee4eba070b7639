//! Rewriting of lock document records

use crate::classify::{is_eligible_inner_dependency, is_eligible_package};
use crate::config::Config;
use crate::lockfile::{DependencySpec, LockedPackage};

/// Version used for a dependency whose locked version cannot be found
pub const ANY_VERSION: &str = "*";

/// Version of the first record named `name` (case-insensitive)
pub fn current_locked_version<'a>(packages: &'a [LockedPackage], name: &str) -> Option<&'a str> {
    let name = name.to_lowercase();
    packages
        .iter()
        .find(|p| p.name.to_lowercase() == name)
        .map(|p| p.version.as_str())
}

/// Rewrite the record at `index` if it is eligible, returning whether it was.
///
/// The record loses its `source` and `develop` keys. Each of its dependency
/// entries that points at a local source loses the source keys and gets the
/// locked version of that dependency (or `*`) unless it already has one.
pub fn rewrite_locked_package(config: &Config, packages: &mut [LockedPackage], index: usize) -> bool {
    let Some(package) = packages.get(index) else {
        return false;
    };
    if !is_eligible_package(config, package) {
        return false;
    }

    let resolved: Vec<(String, String)> = package
        .dependencies
        .iter()
        .filter(|(_, spec)| is_eligible_inner_dependency(config, spec))
        .map(|(name, _)| {
            let version = current_locked_version(packages, name).unwrap_or(ANY_VERSION);
            (name.clone(), version.to_string())
        })
        .collect();

    let package = &mut packages[index];
    package.strip_source();

    for (name, version) in resolved {
        let Some(entry) = package
            .dependencies
            .get_mut(&name)
            .and_then(DependencySpec::as_detailed_mut)
        else {
            continue;
        };

        let is_git = entry.git.is_some();
        entry.strip_path_source();
        if is_git {
            entry.strip_git_source();
        }
        entry.fill_version(&version);
    }

    true
}

/// Rewrite every eligible record, returning the names of the rewritten ones
pub fn rewrite_lock_packages(config: &Config, packages: &mut [LockedPackage]) -> Vec<String> {
    let mut rewritten = Vec::new();
    for index in 0..packages.len() {
        if rewrite_locked_package(config, packages, index) {
            rewritten.push(packages[index].name.clone());
        }
    }
    rewritten
}
