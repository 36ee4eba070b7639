//! In-memory dependency graph of the project being built
//!
//! A project package owns named dependency groups (`main`, `dev`, ...) and each
//! group owns its dependencies. Dependencies know where they come from through
//! [`DependencySource`]; only directory dependencies carry a `develop` flag.

use crate::config::SourceType;
use crate::version::{Version, normalize_constraint};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the group holding the regular (non-dev) dependencies
pub const MAIN_GROUP: &str = "main";

/// Normalize a package name per PEP 503
///
/// Lower case, with runs of `-`, `_` and `.` collapsed to a single `-`.
pub fn canonicalize_name(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                canonical.push('-');
            }
            in_separator = true;
        } else {
            canonical.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    canonical
}

/// Git reference a git dependency is pinned to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitReference {
    Default,
    Branch(String),
    Tag(String),
    Rev(String),
}

impl GitReference {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GitReference::Default => None,
            GitReference::Branch(r) | GitReference::Tag(r) | GitReference::Rev(r) => Some(r),
        }
    }
}

/// Where a dependency is fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencySource {
    /// A package index; the dependency is just a name and a constraint
    Registry,
    Directory {
        path: PathBuf,
        develop: bool,
    },
    File {
        path: PathBuf,
    },
    Url {
        url: String,
    },
    Git {
        url: String,
        reference: GitReference,
        subdirectory: Option<String>,
    },
}

impl DependencySource {
    pub fn source_type(&self) -> Option<SourceType> {
        match self {
            DependencySource::Registry => None,
            DependencySource::Directory { .. } => Some(SourceType::Directory),
            DependencySource::File { .. } => Some(SourceType::File),
            DependencySource::Url { .. } => Some(SourceType::Url),
            DependencySource::Git { .. } => Some(SourceType::Git),
        }
    }

    /// The develop flag, present only for directory dependencies
    pub fn develop(&self) -> Option<bool> {
        match self {
            DependencySource::Directory { develop, .. } => Some(*develop),
            _ => None,
        }
    }

    /// PEP 508 direct reference for non-registry sources
    pub fn direct_reference(&self) -> Option<String> {
        match self {
            DependencySource::Registry => None,
            DependencySource::Directory { path, .. } | DependencySource::File { path } => {
                Some(path_to_uri(path))
            }
            DependencySource::Url { url } => Some(url.clone()),
            DependencySource::Git {
                url,
                reference,
                subdirectory,
            } => {
                let mut reference_str = format!("git+{}", url);
                if let Some(r) = reference.as_str() {
                    reference_str.push('@');
                    reference_str.push_str(r);
                }
                if let Some(subdirectory) = subdirectory {
                    reference_str.push_str("#subdirectory=");
                    reference_str.push_str(subdirectory);
                }
                Some(reference_str)
            }
        }
    }
}

fn path_to_uri(path: &Path) -> String {
    let display = path.to_string_lossy().replace('\\', "/");
    if display.starts_with('/') {
        format!("file://{}", display)
    } else if path.is_absolute() {
        // Windows drive paths
        format!("file:///{}", display)
    } else {
        display
    }
}

/// A requirement on another package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    name: String,
    pretty_name: String,
    constraint: String,
    source: DependencySource,
    extras: BTreeSet<String>,
    optional: bool,
    groups: BTreeSet<String>,
    allows_prereleases: bool,
    markers: Option<String>,
}

impl Dependency {
    /// A registry dependency on `name` with the given constraint text
    pub fn new(name: &str, constraint: &str) -> Self {
        let constraint = constraint.trim();
        Self {
            name: canonicalize_name(name),
            pretty_name: name.trim().to_string(),
            constraint: if constraint.is_empty() {
                "*".to_string()
            } else {
                constraint.to_string()
            },
            source: DependencySource::Registry,
            extras: BTreeSet::new(),
            optional: false,
            groups: BTreeSet::from([MAIN_GROUP.to_string()]),
            allows_prereleases: false,
            markers: None,
        }
    }

    pub fn with_source(mut self, source: DependencySource) -> Self {
        self.source = source;
        self
    }

    pub fn with_extras<I, S>(mut self, extras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extras = extras.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allows_prereleases(mut self, allows_prereleases: bool) -> Self {
        self.allows_prereleases = allows_prereleases;
        self
    }

    pub fn with_markers(mut self, markers: Option<String>) -> Self {
        self.markers = markers.filter(|m| !m.trim().is_empty());
        self
    }

    /// Canonical (PEP 503) name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pretty_name(&self) -> &str {
        &self.pretty_name
    }

    pub fn constraint(&self) -> &str {
        &self.constraint
    }

    pub fn source(&self) -> &DependencySource {
        &self.source
    }

    pub fn source_type(&self) -> Option<SourceType> {
        self.source.source_type()
    }

    pub fn develop(&self) -> Option<bool> {
        self.source.develop()
    }

    pub fn extras(&self) -> &BTreeSet<String> {
        &self.extras
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    pub fn markers(&self) -> Option<&str> {
        self.markers.as_deref()
    }

    /// Explicitly allowed, or implied by a pre-release in the constraint
    pub fn allows_prereleases(&self) -> bool {
        self.allows_prereleases
            || self
                .constraint
                .split(',')
                .filter_map(|clause| {
                    Version::parse(clause.trim().trim_start_matches(['^', '~', '=', '>', '<', '!']))
                })
                .any(|v| v.is_prerelease())
    }

    /// Render as a PEP 508 requirement, e.g. `lib-a[extra] (>=1.0,<2.0)`
    pub fn to_pep_508(&self) -> String {
        let mut requirement = self.name.clone();
        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras.iter().map(String::as_str).collect();
            requirement.push('[');
            requirement.push_str(&extras.join(","));
            requirement.push(']');
        }

        match self.source.direct_reference() {
            Some(reference) => {
                requirement.push_str(" @ ");
                requirement.push_str(&reference);
            }
            None => {
                let specifiers = normalize_constraint(&self.constraint);
                if !specifiers.is_empty() {
                    requirement.push_str(&format!(" ({})", specifiers));
                }
            }
        }

        if let Some(markers) = &self.markers {
            requirement.push_str(" ; ");
            requirement.push_str(markers);
        }
        requirement
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pep_508())
    }
}

/// A named group of dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGroup {
    name: String,
    dependencies: Vec<Dependency>,
}

impl DependencyGroup {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dependencies: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn add_dependency(&mut self, dependency: Dependency) {
        self.dependencies.push(dependency);
    }

    /// Remove every dependency with the given name, returning how many were removed
    pub fn remove_dependency(&mut self, name: &str) -> usize {
        let name = canonicalize_name(name);
        let before = self.dependencies.len();
        self.dependencies.retain(|dep| dep.name() != name);
        before - self.dependencies.len()
    }
}

/// The root package of a project and its dependency groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPackage {
    pub name: String,
    pub version: String,
    groups: Vec<DependencyGroup>,
}

impl ProjectPackage {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            groups: Vec::new(),
        }
    }

    pub fn dependency_group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }

    pub fn dependency_group(&self, name: &str) -> Option<&DependencyGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn dependency_group_mut(&mut self, name: &str) -> Option<&mut DependencyGroup> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    pub fn groups(&self) -> &[DependencyGroup] {
        &self.groups
    }

    /// Add a dependency to the group(s) it belongs to, creating groups on demand
    pub fn add_dependency(&mut self, dependency: Dependency) {
        for group in dependency.groups().clone() {
            if self.dependency_group(&group).is_none() {
                self.groups.push(DependencyGroup::new(&group));
            }
            if let Some(g) = self.dependency_group_mut(&group) {
                g.add_dependency(dependency.clone());
            }
        }
    }
}
