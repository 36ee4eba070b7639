mod cli;
mod output;

use clap::Parser;
use cli::{Cli, Command, LockTarget};
use monorepo_deps::config::load_config;
use monorepo_deps::file_lock::LockedFile;
use monorepo_deps::io::ConsoleIo;
use monorepo_deps::lockfile::LockDocument;
use monorepo_deps::plugin::{self, HookOutcome};
use monorepo_deps::project::Project;
use output::{ConfigOutput, HookResult};
use std::path::Path;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    let cli = Cli::parse();
    let json_output = cli.json;
    let dry_run = cli.dry_run;

    let result = match cli.command {
        Some(Command::Run { command, target }) => run_hook(
            &command,
            &target,
            cli.project.as_deref(),
            json_output,
            dry_run,
            cli.verbose,
        ),
        Some(Command::Config) => run_config(cli.project.as_deref(), json_output),
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_project(dir: Option<&Path>) -> Result<Project, Box<dyn std::error::Error>> {
    let start = match dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };
    // Walking up needs an absolute path
    let start = std::fs::canonicalize(&start).unwrap_or(start);
    Ok(Project::discover(&start)?)
}

fn run_hook(
    command: &str,
    target: &LockTarget,
    project_dir: Option<&Path>,
    json_output: bool,
    dry_run: bool,
    verbose: bool,
) -> CmdResult {
    if json_output && target.is_stdout() {
        return Err("--output - cannot be combined with --json".into());
    }

    let mut project = load_project(project_dir)?;
    let lock_path = project.lock_path();

    // Held from the read to the write of an in-place rewrite
    let mut locked = if target.in_place && !dry_run && lock_path.is_file() {
        Some(LockedFile::acquire(&lock_path)?)
    } else {
        None
    };
    let mut lock = match locked.as_mut() {
        Some(file) => Some(file.read_document()?),
        None => project.load_lock()?,
    };

    // stdout belongs to the JSON document or the lock document
    let quiet = json_output || target.is_stdout();
    let mut io = ConsoleIo::new(verbose, quiet);
    let outcome = plugin::handle_command(command, &mut project, lock.as_mut(), &mut io)?;

    let mut result = HookResult::new(command, &outcome);
    if dry_run {
        result = result.with_dry_run();
    }

    let HookOutcome::Rewritten(summary) = &outcome else {
        if json_output {
            output::print_json(&result);
        } else if !quiet {
            match &outcome {
                HookOutcome::CommandNotSelected { command } => {
                    println!("Command {} is not configured for rewriting. Nothing to do.", command)
                }
                _ => println!("No [tool.poetry-monorepo.deps] section found. Nothing to do."),
            }
        }
        return Ok(());
    };

    result = result.with_groups(project.package());
    let prefix = if dry_run { "[dry-run] " } else { "" };

    let written_to = match lock.as_ref() {
        Some(_) if dry_run => lock_target(&project, target),
        Some(doc) => write_lock(doc, &lock_path, target, locked.as_mut())?,
        None => {
            if target.in_place || target.output.is_some() {
                eprintln!("No poetry.lock found in {}. Nothing to write.", project.root().display());
            }
            None
        }
    };
    if let Some(written_to) = &written_to {
        result = result.with_written_to(written_to);
    }

    if json_output {
        output::print_json(&result);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    for name in &summary.rewritten_packages {
        println!("{}Removed source of locked package {}", prefix, name);
    }
    for (group, lines) in &result.groups {
        println!("\n{}:", group);
        for line in lines {
            println!("  {}", line);
        }
    }
    if let Some(written_to) = written_to {
        if dry_run {
            println!("\n[dry-run] Would write {}", written_to);
        } else {
            println!("\nWrote {}", written_to);
        }
    }

    Ok(())
}

/// Display name of where the lock document would go
fn lock_target(project: &Project, target: &LockTarget) -> Option<String> {
    if target.in_place {
        Some(project.lock_path().display().to_string())
    } else {
        target.output.as_ref().map(|path| path.display().to_string())
    }
}

fn write_lock(
    doc: &LockDocument,
    lock_path: &Path,
    target: &LockTarget,
    locked: Option<&mut LockedFile>,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    if target.in_place {
        match locked {
            Some(file) => file.write_document(doc)?,
            None => LockedFile::acquire(lock_path)?.write_document(doc)?,
        }
        return Ok(Some(lock_path.display().to_string()));
    }

    let Some(path) = &target.output else {
        return Ok(None);
    };
    if target.is_stdout() {
        print!("{}", doc.to_toml_string()?);
    } else {
        doc.save(path)?;
    }

    Ok(Some(path.display().to_string()))
}

fn run_config(project_dir: Option<&Path>, json_output: bool) -> CmdResult {
    let project = load_project(project_dir)?;
    let config = load_config(project.pyproject())?;

    if json_output {
        output::print_json(&ConfigOutput::new(config));
        return Ok(());
    }

    let Some(config) = config else {
        println!(
            "Plugin is inactive for {}: no [tool.poetry-monorepo.deps] section, or enabled = false.",
            project.root().display()
        );
        return Ok(());
    };

    let commands: Vec<&str> = config.commands.iter().map(String::as_str).collect();
    let source_types: Vec<&str> = config.source_types.iter().map(|t| t.as_str()).collect();

    println!("enabled      = {}", config.enabled);
    println!("commands     = [{}]", commands.join(", "));
    println!("constraint   = {}", config.constraint);
    println!("source_types = [{}]", source_types.join(", "));
    println!("only_develop = {}", config.only_develop);

    Ok(())
}
