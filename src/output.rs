//! Output formatting for JSON and text modes
//!
//! Provides types for structured output that can be serialized to JSON
//! for machine-readable output, or displayed as text for human consumption.

use monorepo_deps::config::Config;
use monorepo_deps::dependency::ProjectPackage;
use monorepo_deps::plugin::HookOutcome;
use monorepo_deps::rewrite::Replacement;
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of firing the hook for one command
#[derive(Debug, Serialize)]
pub struct HookResult {
    pub command: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replaced: Vec<Replacement>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rewritten_packages: Vec<String>,
    /// PEP 508 lines per dependency group, after the rewrite
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
}

impl HookResult {
    pub fn new(command: &str, outcome: &HookOutcome) -> Self {
        let mut result = Self {
            command: command.to_string(),
            status: status(outcome),
            replaced: Vec::new(),
            missing: Vec::new(),
            rewritten_packages: Vec::new(),
            groups: BTreeMap::new(),
            written_to: None,
            dry_run: false,
        };
        if let HookOutcome::Rewritten(summary) = outcome {
            result.replaced = summary.replaced.clone();
            result.missing = summary.missing.clone();
            result.rewritten_packages = summary.rewritten_packages.clone();
        }
        result
    }

    pub fn with_groups(mut self, package: &ProjectPackage) -> Self {
        self.groups = group_lines(package);
        self
    }

    pub fn with_written_to(mut self, target: &str) -> Self {
        self.written_to = Some(target.to_string());
        self
    }

    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Result of the config command
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Config>,
}

impl ConfigOutput {
    pub fn new(config: Option<Config>) -> Self {
        Self {
            active: config.is_some(),
            config,
        }
    }
}

pub fn status(outcome: &HookOutcome) -> &'static str {
    match outcome {
        HookOutcome::NotConfigured => "not_configured",
        HookOutcome::CommandNotSelected { .. } => "command_not_selected",
        HookOutcome::Rewritten(_) => "rewritten",
    }
}

pub fn group_lines(package: &ProjectPackage) -> BTreeMap<String, Vec<String>> {
    package
        .groups()
        .iter()
        .map(|group| {
            let lines = group
                .dependencies()
                .iter()
                .map(|dependency| dependency.to_pep_508())
                .collect();
            (group.name().to_string(), lines)
        })
        .collect()
}

/// Print a value as JSON to stdout
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing JSON: {}", e);
            std::process::exit(1);
        }
    }
}
