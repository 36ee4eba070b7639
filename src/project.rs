//! Project loading
//!
//! Reads a poetry project's `pyproject.toml` into the dependency graph the
//! group rewriter works on. Dependencies are collected from:
//! - `[tool.poetry.dependencies]` (group `main`, `python` is skipped)
//! - `[tool.poetry.group.<name>.dependencies]`
//! - `[tool.poetry.dev-dependencies]` (group `dev`, legacy layout)
//! - `[project.dependencies]` (PEP 621 requirement strings, group `main`)

use crate::dependency::{Dependency, DependencySource, GitReference, MAIN_GROUP, ProjectPackage};
use crate::lockfile::{LOCKFILE_NAME, LockDocument, LockfileError, find_nearest_file_from};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const PYPROJECT_NAME: &str = "pyproject.toml";

/// Path suffixes of distribution archives, which make a path dependency a file dependency
const ARCHIVE_SUFFIXES: [&str; 5] = [".whl", ".zip", ".tar.gz", ".tar.bz2", ".tgz"];

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Poetry could not find a pyproject.toml file in {} or its parents", .start.display())]
    NotFound { start: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {details}")]
    Parse { path: PathBuf, details: String },

    #[error("Invalid dependency '{name}' in group {group}: {details}")]
    InvalidDependency {
        group: String,
        name: String,
        details: String,
    },

    #[error(transparent)]
    Lockfile(#[from] LockfileError),
}

/// A poetry project: its `pyproject.toml` and the dependency graph read from it
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    pyproject: toml::Value,
    package: ProjectPackage,
}

impl Project {
    /// Find the nearest `pyproject.toml` at or above `start` and load it
    pub fn discover(start: &Path) -> Result<Self, ProjectError> {
        let path = find_nearest_file_from(start, &[PYPROJECT_NAME]).ok_or_else(|| {
            ProjectError::NotFound {
                start: start.to_path_buf(),
            }
        })?;
        Self::load(&path)
    }

    pub fn load(pyproject_path: &Path) -> Result<Self, ProjectError> {
        let content = fs::read_to_string(pyproject_path).map_err(|source| ProjectError::ReadFile {
            path: pyproject_path.to_path_buf(),
            source,
        })?;
        let root = pyproject_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::parse(&root, &content)
    }

    /// Parse `pyproject.toml` content of a project rooted at `root`
    pub fn parse(root: &Path, content: &str) -> Result<Self, ProjectError> {
        let pyproject: toml::Value = toml::from_str(content).map_err(|e| ProjectError::Parse {
            path: root.join(PYPROJECT_NAME),
            details: e.to_string(),
        })?;
        let package = read_package(root, &pyproject)?;

        Ok(Self {
            root: root.to_path_buf(),
            pyproject,
            package,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pyproject(&self) -> &toml::Value {
        &self.pyproject
    }

    pub fn package(&self) -> &ProjectPackage {
        &self.package
    }

    pub fn package_mut(&mut self) -> &mut ProjectPackage {
        &mut self.package
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCKFILE_NAME)
    }

    /// The project's lock document, `None` when the project is not locked
    pub fn load_lock(&self) -> Result<Option<LockDocument>, ProjectError> {
        let path = self.lock_path();
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(LockDocument::load(&path)?))
    }
}

fn read_package(root: &Path, doc: &toml::Value) -> Result<ProjectPackage, ProjectError> {
    let poetry = doc.get("tool").and_then(|v| v.get("poetry"));
    let project = doc.get("project");

    let field = |key: &str| {
        poetry
            .and_then(|v| v.get(key))
            .or_else(|| project.and_then(|v| v.get(key)))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    let mut package = ProjectPackage::new(&field("name"), &field("version"));

    if let Some(table) = poetry
        .and_then(|v| v.get("dependencies"))
        .and_then(|v| v.as_table())
    {
        add_poetry_dependencies(root, &mut package, MAIN_GROUP, table)?;
    }

    if let Some(requirements) = project
        .and_then(|v| v.get("dependencies"))
        .and_then(|v| v.as_array())
    {
        for requirement in requirements {
            let Some(requirement) = requirement.as_str() else {
                continue;
            };
            let dependency =
                parse_requirement(root, requirement).ok_or_else(|| ProjectError::InvalidDependency {
                    group: MAIN_GROUP.to_string(),
                    name: requirement.to_string(),
                    details: "not a PEP 508 requirement".to_string(),
                })?;
            package.add_dependency(dependency);
        }
    }

    if let Some(groups) = poetry
        .and_then(|v| v.get("group"))
        .and_then(|v| v.as_table())
    {
        for (group, definition) in groups {
            if let Some(table) = definition.get("dependencies").and_then(|v| v.as_table()) {
                add_poetry_dependencies(root, &mut package, group, table)?;
            }
        }
    }

    if let Some(table) = poetry
        .and_then(|v| v.get("dev-dependencies"))
        .and_then(|v| v.as_table())
    {
        add_poetry_dependencies(root, &mut package, "dev", table)?;
    }

    Ok(package)
}

fn add_poetry_dependencies(
    root: &Path,
    package: &mut ProjectPackage,
    group: &str,
    table: &toml::Table,
) -> Result<(), ProjectError> {
    for (name, value) in table {
        if name == "python" {
            continue;
        }
        let dependencies = parse_poetry_dependency(root, name, value).map_err(|details| {
            ProjectError::InvalidDependency {
                group: group.to_string(),
                name: name.clone(),
                details,
            }
        })?;
        for dependency in dependencies {
            package.add_dependency(dependency.with_groups([group]));
        }
    }
    Ok(())
}

/// Parse a poetry dependency value
///
/// Can be:
/// - String: `"^2.31.0"`
/// - Table: `{ version = "^2.31.0", optional = true, extras = ["socks"] }`
/// - Table with path: `{ path = "../lib-a", develop = true }`
/// - Table with git: `{ git = "url", branch = "main" }`
/// - Array of tables, one per environment marker
fn parse_poetry_dependency(
    root: &Path,
    name: &str,
    value: &toml::Value,
) -> Result<Vec<Dependency>, String> {
    match value {
        toml::Value::String(constraint) => Ok(vec![Dependency::new(name, constraint)]),
        toml::Value::Table(table) => Ok(vec![parse_dependency_table(root, name, table)?]),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                toml::Value::String(constraint) => Ok(Dependency::new(name, constraint)),
                toml::Value::Table(table) => parse_dependency_table(root, name, table),
                other => Err(format!("unexpected {} in constraint list", other.type_str())),
            })
            .collect(),
        other => Err(format!("expected a string or table, found {}", other.type_str())),
    }
}

fn parse_dependency_table(root: &Path, name: &str, table: &toml::Table) -> Result<Dependency, String> {
    let constraint = get_str(table, "version")?.unwrap_or("*");

    let source = if let Some(path) = get_str(table, "path")? {
        let path = normalize_path(&root.join(path));
        if is_archive(&path) {
            DependencySource::File { path }
        } else {
            DependencySource::Directory {
                path,
                develop: get_bool(table, "develop")?.unwrap_or(false),
            }
        }
    } else if let Some(url) = get_str(table, "url")? {
        DependencySource::Url {
            url: url.to_string(),
        }
    } else if let Some(url) = get_str(table, "git")? {
        let reference = if let Some(branch) = get_str(table, "branch")? {
            GitReference::Branch(branch.to_string())
        } else if let Some(tag) = get_str(table, "tag")? {
            GitReference::Tag(tag.to_string())
        } else if let Some(rev) = get_str(table, "rev")? {
            GitReference::Rev(rev.to_string())
        } else {
            GitReference::Default
        };
        DependencySource::Git {
            url: url.to_string(),
            reference,
            subdirectory: get_str(table, "subdirectory")?.map(str::to_string),
        }
    } else {
        DependencySource::Registry
    };

    let extras = match table.get("extras") {
        None => Vec::new(),
        Some(value) => value
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .map(|i| i.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| "extras should be a list of strings".to_string())?,
    };

    let allows_prereleases = match get_bool(table, "allow-prereleases")? {
        Some(allowed) => allowed,
        None => get_bool(table, "allows-prereleases")?.unwrap_or(false),
    };

    Ok(Dependency::new(name, constraint)
        .with_source(source)
        .with_extras(extras)
        .with_optional(get_bool(table, "optional")?.unwrap_or(false))
        .with_allows_prereleases(allows_prereleases)
        .with_markers(get_str(table, "markers")?.map(str::to_string)))
}

fn get_str<'a>(table: &'a toml::Table, key: &str) -> Result<Option<&'a str>, String> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| format!("{} should be a string", key)),
    }
}

fn get_bool(table: &toml::Table, key: &str) -> Result<Option<bool>, String> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_bool()
            .map(Some)
            .ok_or_else(|| format!("{} should be a boolean", key)),
    }
}

/// Parse a PEP 508 requirement string
///
/// Handles formats like:
/// - `requests>=2.31.0`
/// - `requests[security] (>=2.31.0) ; python_version >= "3.8"`
/// - `lib-a @ file:///repo/lib-a`
/// - `lib-b @ git+https://github.com/org/lib-b.git@main#subdirectory=src`
fn parse_requirement(root: &Path, requirement: &str) -> Option<Dependency> {
    let (requirement, markers) = match requirement.split_once(';') {
        Some((req, markers)) => (req.trim(), Some(markers.trim().to_string())),
        None => (requirement.trim(), None),
    };

    let name_end = requirement
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(requirement.len());
    let name = &requirement[..name_end];
    if name.is_empty() {
        return None;
    }

    let mut rest = requirement[name_end..].trim_start();
    let mut extras = Vec::new();
    if let Some(after_bracket) = rest.strip_prefix('[') {
        let (inner, after) = after_bracket.split_once(']')?;
        extras = inner
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect();
        rest = after.trim_start();
    }

    let dependency = if let Some(url) = rest.strip_prefix('@') {
        Dependency::new(name, "*").with_source(direct_reference_source(root, url.trim())?)
    } else {
        let constraint = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .unwrap_or(rest)
            .trim();
        Dependency::new(name, constraint)
    };

    Some(dependency.with_extras(extras).with_markers(markers))
}

fn direct_reference_source(root: &Path, url: &str) -> Option<DependencySource> {
    if url.is_empty() {
        return None;
    }

    if let Some(location) = url.strip_prefix("file://").or_else(|| url.strip_prefix("file:")) {
        let path = normalize_path(&root.join(location));
        return Some(if is_archive(&path) {
            DependencySource::File { path }
        } else {
            DependencySource::Directory {
                path,
                develop: false,
            }
        });
    }

    if let Some(git_url) = url.strip_prefix("git+") {
        let (git_url, fragment) = match git_url.split_once('#') {
            Some((u, f)) => (u, Some(f)),
            None => (git_url, None),
        };
        let subdirectory = fragment
            .and_then(|f| f.split('&').find_map(|p| p.strip_prefix("subdirectory=")))
            .map(str::to_string);

        let (git_url, reference) = split_git_revision(git_url);

        return Some(DependencySource::Git {
            url: git_url.to_string(),
            reference,
            subdirectory,
        });
    }

    Some(DependencySource::Url {
        url: url.to_string(),
    })
}

/// Split `https://host/org/repo.git@rev` into url and revision
///
/// Only an `@` after the host counts, so `ssh://git@host/repo.git` has no revision.
fn split_git_revision(url: &str) -> (&str, GitReference) {
    let host_start = url.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = url[host_start..]
        .find('/')
        .map(|i| host_start + i)
        .unwrap_or(url.len());

    match url[path_start..].rfind('@') {
        Some(at) => (
            &url[..path_start + at],
            GitReference::Rev(url[path_start + at + 1..].to_string()),
        ),
        None => (url, GitReference::Default),
    }
}

fn is_archive(path: &Path) -> bool {
    let display = path.to_string_lossy().to_lowercase();
    ARCHIVE_SUFFIXES.iter().any(|s| display.ends_with(s)) || path.is_file()
}

/// Resolve `.` and `..` components without touching the filesystem
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
