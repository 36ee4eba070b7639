//! Rewriting of the project's dependency groups

use crate::classify::is_eligible_dependency;
use crate::config::{Config, Constraint};
use crate::dependency::{Dependency, ProjectPackage};
use crate::io::Io;
use crate::repository::{LockedPackageVersion, LockedRepository};
use serde::Serialize;

/// One dependency that was swapped for a named one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub group: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupRewrite {
    pub replaced: Vec<Replacement>,
    /// Eligible dependencies without a locked version, left untouched
    pub missing: Vec<String>,
}

/// Build the named replacement for `dependency`, pinned to the locked version.
///
/// The name comes from the locked package, optional flag, groups, prerelease
/// allowance and extras from the original dependency.
pub fn create_named_dependency(
    constraint: Constraint,
    dependency: &Dependency,
    package: &LockedPackageVersion,
) -> Dependency {
    Dependency::new(package.pretty_name(), &constraint.apply(package.version()))
        .with_optional(dependency.is_optional())
        .with_groups(dependency.groups().iter().cloned())
        .with_allows_prereleases(dependency.allows_prereleases())
        .with_extras(dependency.extras().iter().cloned())
}

/// Replace every eligible dependency in every group of `package`.
///
/// Dependencies without a locked package are reported on the error stream and
/// kept as they are.
pub fn rewrite_dependency_groups(
    config: &Config,
    package: &mut ProjectPackage,
    repository: &LockedRepository,
    io: &mut dyn Io,
) -> GroupRewrite {
    let mut rewrite = GroupRewrite::default();

    for group_name in package.dependency_group_names() {
        let Some(group) = package.dependency_group_mut(&group_name) else {
            continue;
        };

        let dependencies = group.dependencies().to_vec();
        for dependency in dependencies
            .iter()
            .filter(|dep| is_eligible_dependency(config, dep))
        {
            let Some(locked) = repository.find_package(dependency.name()) else {
                io.write_error_line(&format!(
                    "Failed to find version for path dependency {}",
                    dependency.name()
                ));
                rewrite.missing.push(dependency.name().to_string());
                continue;
            };

            let named = create_named_dependency(config.constraint, dependency, locked);
            let replacement = Replacement {
                group: group_name.clone(),
                from: dependency.to_pep_508(),
                to: named.to_pep_508(),
            };
            io.write_line(&format!(
                "# Replacing path dependency {} in group {} with {}",
                replacement.from, replacement.group, replacement.to
            ));

            group.remove_dependency(dependency.name());
            group.add_dependency(named);
            rewrite.replaced.push(replacement);
        }
    }

    rewrite
}
