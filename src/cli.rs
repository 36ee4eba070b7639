use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Replaces path dependencies of poetry mono-repo packages with named dependencies
#[derive(Parser, Debug)]
#[command(name = "monorepo-deps")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Project directory (defaults to the nearest pyproject.toml above the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Show what would change without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Print debug lines
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fire the command hook as if poetry were starting COMMAND
    Run {
        /// Host command name, e.g. build or export
        command: String,

        #[command(flatten)]
        target: LockTarget,
    },
    /// Show the effective configuration
    Config,
}

/// Where the rewritten lock document goes
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct LockTarget {
    /// Write the rewritten lock document back over poetry.lock
    #[arg(long)]
    pub in_place: bool,

    /// Write the rewritten lock document to PATH ("-" for stdout)
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

impl LockTarget {
    pub fn is_stdout(&self) -> bool {
        self.output.as_deref().is_some_and(|path| path.as_os_str() == "-")
    }
}
