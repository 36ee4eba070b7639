//! Plugin configuration
//!
//! Read from the `[tool.poetry-monorepo.deps]` section of `pyproject.toml`:
//!
//! ```toml
//! [tool.poetry-monorepo.deps]
//! enabled = true
//! commands = ["build", "export"]
//! constraint = "~="
//! source_types = ["file", "directory"]
//! only_develop = false
//! ```
//!
//! The section has to be present (it may be empty) for the plugin to be active.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Key path of the configuration section inside `pyproject.toml`
pub const TOML_SECTION: [&str; 3] = ["tool", "poetry-monorepo", "deps"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tool.poetry-monorepo.deps should be a table, found {found}")]
    InvalidSection { found: &'static str },

    #[error("{key} should be of type {expected}")]
    InvalidType {
        key: &'static str,
        expected: &'static str,
    },

    #[error("Unsupported constraint '{value}'. Supported: >=, ~=, =, ==, ^")]
    InvalidConstraint { value: String },

    #[error("Unknown source type '{value}'. Supported: file, directory, url, git")]
    UnknownSourceType { value: String },
}

/// Operator used to build a version constraint from a locked version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Constraint {
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "~=")]
    Compatible,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "==")]
    DoubleEqual,
    #[serde(rename = "^")]
    Caret,
}

impl Constraint {
    pub const ALL: [Constraint; 5] = [
        Constraint::GreaterOrEqual,
        Constraint::Compatible,
        Constraint::Equal,
        Constraint::DoubleEqual,
        Constraint::Caret,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Constraint::GreaterOrEqual => ">=",
            Constraint::Compatible => "~=",
            Constraint::Equal => "=",
            Constraint::DoubleEqual => "==",
            Constraint::Caret => "^",
        }
    }

    /// Constraint text for a resolved version, e.g. `~=` + `1.2.3`
    pub fn apply(&self, version: &str) -> String {
        format!("{}{}", self.as_str(), version)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Constraint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Constraint::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidConstraint {
                value: s.to_string(),
            })
    }
}

/// Kind of source a package or dependency is fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    File,
    Directory,
    Url,
    Git,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::File => "file",
            SourceType::Directory => "directory",
            SourceType::Url => "url",
            SourceType::Git => "git",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(SourceType::File),
            "directory" => Ok(SourceType::Directory),
            "url" => Ok(SourceType::Url),
            "git" => Ok(SourceType::Git),
            _ => Err(ConfigError::UnknownSourceType {
                value: s.to_string(),
            }),
        }
    }
}

/// Effective plugin configuration for one command invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub enabled: bool,
    /// Host commands that trigger the rewrite
    pub commands: BTreeSet<String>,
    pub constraint: Constraint,
    /// Source types whose dependencies get replaced
    ///
    /// Kept as written; a name that is not a known source type never matches.
    pub source_types: BTreeSet<String>,
    /// Only replace directory dependencies that are marked `develop = true`
    pub only_develop: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            commands: ["build", "export"].iter().map(|c| c.to_string()).collect(),
            constraint: Constraint::Compatible,
            source_types: [SourceType::File, SourceType::Directory]
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            only_develop: false,
        }
    }
}

impl Config {
    /// Build a configuration from the section table, starting from the defaults
    /// and overriding every key that is present.
    pub fn from_table(table: &toml::Table) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(value) = table.get("enabled") {
            config.enabled = expect_bool("enabled", value)?;
        }
        if let Some(value) = table.get("commands") {
            config.commands = expect_strings("commands", value)?.into_iter().collect();
        }
        if let Some(value) = table.get("constraint") {
            config.constraint = expect_str("constraint", value)?.parse()?;
        }
        if let Some(value) = table.get("source_types") {
            config.source_types = expect_strings("source_types", value)?.into_iter().collect();
        }
        if let Some(value) = table.get("only_develop") {
            config.only_develop = expect_bool("only_develop", value)?;
        }

        Ok(config)
    }

    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn with_source_types<I>(mut self, source_types: I) -> Self
    where
        I: IntoIterator<Item = SourceType>,
    {
        self.source_types = source_types
            .into_iter()
            .map(|t| t.as_str().to_string())
            .collect();
        self
    }

    pub fn with_only_develop(mut self, only_develop: bool) -> Self {
        self.only_develop = only_develop;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn triggers_on(&self, command: &str) -> bool {
        self.commands.contains(command)
    }

    pub fn accepts(&self, source_type: SourceType) -> bool {
        self.source_types.contains(source_type.as_str())
    }
}

/// Load the plugin configuration from a parsed `pyproject.toml`.
///
/// Returns `Ok(None)` when the section is missing or `enabled = false`. A
/// disabled section is not validated any further.
pub fn load_config(pyproject: &toml::Value) -> Result<Option<Config>, ConfigError> {
    let [tool, plugin, deps] = TOML_SECTION;
    let Some(section) = pyproject
        .get(tool)
        .and_then(|v| v.get(plugin))
        .and_then(|v| v.get(deps))
    else {
        return Ok(None);
    };
    let table = section.as_table().ok_or(ConfigError::InvalidSection {
        found: section.type_str(),
    })?;

    if let Some(value) = table.get("enabled")
        && !expect_bool("enabled", value)?
    {
        return Ok(None);
    }

    Ok(Some(Config::from_table(table)?))
}

fn expect_bool(key: &'static str, value: &toml::Value) -> Result<bool, ConfigError> {
    value.as_bool().ok_or(ConfigError::InvalidType {
        key,
        expected: "bool",
    })
}

fn expect_str<'a>(key: &'static str, value: &'a toml::Value) -> Result<&'a str, ConfigError> {
    value.as_str().ok_or(ConfigError::InvalidType {
        key,
        expected: "string",
    })
}

fn expect_strings(key: &'static str, value: &toml::Value) -> Result<Vec<String>, ConfigError> {
    let invalid = ConfigError::InvalidType {
        key,
        expected: "list of strings",
    };
    let Some(items) = value.as_array() else {
        return Err(invalid);
    };

    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or(invalid)
}
