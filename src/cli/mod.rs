//! Command-line interface for gitfs.

pub mod args;
mod commands;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::binfs::BinfsError;
use crate::tree::TreeError;

pub use args::{ArgsError, GlobalArgs, OutputSink};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during CLI execution.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument processing error.
    #[error("{0}")]
    Args(#[from] ArgsError),

    /// Opening the project failed.
    #[error("{0}")]
    Open(#[from] crate::Error),

    /// Reading from the tree failed.
    #[error("{0}")]
    Tree(#[from] TreeError),

    /// Packing or unpacking failed.
    #[error("{0}")]
    Binfs(#[from] BinfsError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The compared trees are not the same.
    #[error("trees differ in {0} paths")]
    TreesDiffer(usize),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

// =============================================================================
// CLI Definition
// =============================================================================

/// gitfs - Read-only access to files in a git repository.
#[derive(Parser, Debug)]
#[command(name = "gitfs", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List paths in a project.
    Ls(commands::LsArgs),

    /// Print a file of a project.
    Cat(commands::CatArgs),

    /// Pack a project into a single file.
    Pack(commands::PackArgs),

    /// Compare a project with a packed file.
    Diff(commands::DiffArgs),
}

// =============================================================================
// CLI Execution
// =============================================================================

impl Cli {
    /// Parse command-line arguments and return the CLI instance.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Ls(args) => args.run(&self.global).await,
            Command::Cat(args) => args.run(&self.global).await,
            Command::Pack(args) => args.run(&self.global).await,
            Command::Diff(args) => args.run(&self.global).await,
        }
    }
}

/// Install a stderr log subscriber. `RUST_LOG` takes precedence over the
/// verbosity flag.
fn init_logging(verbose: bool) {
    let default = if verbose { "warn,gitfs=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Main entry point for the CLI.
pub async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.global.verbose);
    cli.run().await
}
