//! poetry.lock document model
//!
//! The lock document is a list of `[[package]]` records plus a `[metadata]`
//! table. Only the fields the rewrite touches are typed; everything else on a
//! record (description, files, python-versions, ...) is kept verbatim so the
//! document can be written back without losing information.
//!
//! ```toml
//! [[package]]
//! name = "lib-b"
//! version = "0.2.0"
//! develop = true
//!
//! [package.dependencies]
//! lib-a = {path = "../lib-a", develop = true}
//! requests = ">=2.31"
//!
//! [package.source]
//! type = "directory"
//! url = "../lib-b"
//! ```
//!
//! Also provides helpers for finding files by walking up the directory tree.

use crate::config::SourceType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LOCKFILE_NAME: &str = "poetry.lock";

#[derive(Error, Debug)]
pub enum LockfileError {
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {details}")]
    Parse { path: PathBuf, details: String },

    #[error("Failed to serialize lock document: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A parsed poetry.lock
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockDocument {
    #[serde(default)]
    pub package: Vec<LockedPackage>,
    /// `[metadata]` and anything else at the top level
    #[serde(flatten)]
    pub rest: toml::Table,
}

/// One resolved package (`[[package]]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedPackage {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub develop: Option<bool>,
    #[serde(flatten)]
    pub rest: toml::Table,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, DependencySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PackageSource>,
}

/// Source information for a non-registry package (`[package.source]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSource {
    /// "directory", "file", "url", "git", or "legacy" for private indexes
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// reference, resolved_reference, subdirectory
    #[serde(flatten)]
    pub rest: toml::Table,
}

/// A dependency entry of a locked package
///
/// ```toml
/// a = "1.0.0"
/// b = {version = ">=0.1", extras = ["foo"]}
/// c = {path = "../lib-c", develop = true}
/// d = [{version = "1.0", markers = "python_version < \"3.9\""}, {version = "2.0", markers = "python_version >= \"3.9\""}]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Only a version constraint
    Bare(String),
    Detailed(DetailedDependency),
    /// One entry per environment marker
    Multiple(Vec<DependencySpec>),
}

/// Table form of a dependency entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedDependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub develop: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdirectory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(flatten)]
    pub rest: toml::Table,
}

impl LockDocument {
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load(path: &Path) -> Result<Self, LockfileError> {
        let content = fs::read_to_string(path).map_err(|source| LockfileError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|e| LockfileError::Parse {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }

    pub fn to_toml_string(&self) -> Result<String, LockfileError> {
        Ok(toml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), LockfileError> {
        let content = self.to_toml_string()?;
        fs::write(path, content).map_err(|source| LockfileError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn find_package(&self, name: &str) -> Option<&LockedPackage> {
        self.package.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

impl LockedPackage {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            develop: None,
            rest: toml::Table::new(),
            dependencies: BTreeMap::new(),
            source: None,
        }
    }

    pub fn with_source(mut self, source_type: &str, url: &str) -> Self {
        self.source = Some(PackageSource {
            source_type: source_type.to_string(),
            url: Some(url.to_string()),
            rest: toml::Table::new(),
        });
        self
    }

    pub fn with_develop(mut self, develop: bool) -> Self {
        self.develop = Some(develop);
        self
    }

    pub fn with_dependency(mut self, name: &str, spec: DependencySpec) -> Self {
        self.dependencies.insert(name.to_string(), spec);
        self
    }

    /// Source type of the record, `None` for registry packages and unknown kinds
    pub fn source_type(&self) -> Option<SourceType> {
        self.source
            .as_ref()
            .and_then(|s| s.source_type.parse().ok())
    }

    pub fn is_develop(&self) -> bool {
        self.develop.unwrap_or(false)
    }

    /// Drop `source` and `develop`, leaving a plain registry record
    pub fn strip_source(&mut self) {
        self.source = None;
        self.develop = None;
    }
}

impl DependencySpec {
    pub fn as_detailed(&self) -> Option<&DetailedDependency> {
        match self {
            DependencySpec::Detailed(detailed) => Some(detailed),
            _ => None,
        }
    }

    pub fn as_detailed_mut(&mut self) -> Option<&mut DetailedDependency> {
        match self {
            DependencySpec::Detailed(detailed) => Some(detailed),
            _ => None,
        }
    }
}

impl From<&str> for DependencySpec {
    fn from(constraint: &str) -> Self {
        DependencySpec::Bare(constraint.to_string())
    }
}

impl From<DetailedDependency> for DependencySpec {
    fn from(detailed: DetailedDependency) -> Self {
        DependencySpec::Detailed(detailed)
    }
}

impl DetailedDependency {
    pub fn path(path: &str, develop: bool) -> Self {
        Self {
            path: Some(path.to_string()),
            develop: Some(develop),
            ..Default::default()
        }
    }

    pub fn version(version: &str) -> Self {
        Self {
            version: Some(version.to_string()),
            ..Default::default()
        }
    }

    /// Source types this entry may refer to
    ///
    /// A `path` can point at either a directory or a file archive, so it
    /// yields both.
    pub fn candidate_source_types(&self) -> Vec<SourceType> {
        let mut types = Vec::new();
        if self.path.is_some() {
            types.push(SourceType::Directory);
            types.push(SourceType::File);
        }
        if self.url.is_some() {
            types.push(SourceType::Url);
        }
        if self.git.is_some() {
            types.push(SourceType::Git);
        }
        types
    }

    pub fn is_develop(&self) -> bool {
        self.path.is_some() && self.develop.unwrap_or(false)
    }

    /// Remove `path`, `develop` and `url`
    pub fn strip_path_source(&mut self) {
        self.path = None;
        self.develop = None;
        self.url = None;
    }

    /// Remove `git` and its `rev`, `branch`, `tag` and `subdirectory`
    pub fn strip_git_source(&mut self) {
        self.git = None;
        self.rev = None;
        self.branch = None;
        self.tag = None;
        self.subdirectory = None;
    }

    /// Set `version` unless the entry already has one
    pub fn fill_version(&mut self, version: &str) {
        if self.version.is_none() {
            self.version = Some(version.to_string());
        }
    }
}

/// Find the nearest matching file by walking up from a start directory.
///
/// `filenames` are checked in order at each directory level.
pub fn find_nearest_file_from(start: &Path, filenames: &[&str]) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        for filename in filenames {
            let path = dir.join(filename);
            if path.is_file() {
                return Some(path);
            }
        }

        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }

    None
}
