//! Locked repository: the resolved packages and their versions

use crate::dependency::canonicalize_name;
use crate::lockfile::LockDocument;

/// A resolved package as seen by the group rewriter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedPackageVersion {
    name: String,
    pretty_name: String,
    version: String,
}

impl LockedPackageVersion {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: canonicalize_name(name),
            pretty_name: name.to_string(),
            version: version.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pretty_name(&self) -> &str {
        &self.pretty_name
    }

    /// Resolved version text as written in the lock file
    pub fn version(&self) -> &str {
        &self.version
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockedRepository {
    packages: Vec<LockedPackageVersion>,
}

impl LockedRepository {
    pub fn new(packages: Vec<LockedPackageVersion>) -> Self {
        Self { packages }
    }

    pub fn from_document(doc: &LockDocument) -> Self {
        Self::new(
            doc.package
                .iter()
                .map(|p| LockedPackageVersion::new(&p.name, &p.version))
                .collect(),
        )
    }

    pub fn packages(&self) -> &[LockedPackageVersion] {
        &self.packages
    }

    /// First package whose canonical name equals `name`
    pub fn find_package(&self, name: &str) -> Option<&LockedPackageVersion> {
        self.packages.iter().find(|p| p.name == name)
    }
}
