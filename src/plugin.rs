//! Command hook
//!
//! Called by the host when one of its commands starts. Rewrites only when the
//! project has a `[tool.poetry-monorepo.deps]` section and the command is one
//! of the configured `commands`:
//! - the project's dependency groups, which `build` turns into package metadata
//! - the lock document records, which `export` turns into requirements

use crate::config::{Config, ConfigError, load_config};
use crate::io::Io;
use crate::lockfile::LockDocument;
use crate::project::Project;
use crate::repository::LockedRepository;
use crate::rewrite::{Replacement, rewrite_dependency_groups, rewrite_lock_packages};

/// What the hook did for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// No configuration section, or `enabled = false`
    NotConfigured,
    /// The command is not one of the configured commands
    CommandNotSelected { command: String },
    Rewritten(RewriteSummary),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub replaced: Vec<Replacement>,
    /// Eligible dependencies without a locked version
    pub missing: Vec<String>,
    /// Lock document records that lost their source
    pub rewritten_packages: Vec<String>,
}

impl HookOutcome {
    pub fn is_rewritten(&self) -> bool {
        matches!(self, HookOutcome::Rewritten(_))
    }
}

/// Run the rewrite for `command` if the project's configuration asks for it.
///
/// Only configuration errors are returned; a missing lock document just means
/// there are no locked versions to pin to.
pub fn handle_command(
    command: &str,
    project: &mut Project,
    lock: Option<&mut LockDocument>,
    io: &mut dyn Io,
) -> Result<HookOutcome, ConfigError> {
    let Some(config) = load_config(project.pyproject())? else {
        io.write_debug_line(
            "Not replacing path dependencies by named dependencies as no tool configuration section found.",
        );
        return Ok(HookOutcome::NotConfigured);
    };

    if !config.triggers_on(command) {
        io.write_debug_line(&format!(
            "Not replacing path dependencies with named dependencies for command {}.",
            command
        ));
        return Ok(HookOutcome::CommandNotSelected {
            command: command.to_string(),
        });
    }

    io.write_debug_line("Replacing path dependencies with named dependencies.");
    Ok(HookOutcome::Rewritten(rewrite(&config, project, lock, io)))
}

/// Run both rewriters unconditionally
pub fn rewrite(
    config: &Config,
    project: &mut Project,
    lock: Option<&mut LockDocument>,
    io: &mut dyn Io,
) -> RewriteSummary {
    let repository = lock
        .as_deref()
        .map(LockedRepository::from_document)
        .unwrap_or_default();

    let groups = rewrite_dependency_groups(config, project.package_mut(), &repository, io);
    let rewritten_packages = match lock {
        Some(doc) => rewrite_lock_packages(config, &mut doc.package),
        None => Vec::new(),
    };

    RewriteSummary {
        replaced: groups.replaced,
        missing: groups.missing,
        rewritten_packages,
    }
}
