//! Command-line definition.
use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the environment bootstrapper.
#[derive(Parser, Debug)]
#[command(
    name = "devsetup",
    about = "Resumable development environment bootstrapper",
    disable_version_flag = true
)]
pub struct Cli {
    /// Subcommand to run; `install` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Directory holding `config/` (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<std::path::PathBuf>,

    /// Print version information
    #[arg(short = 'v', long = "version")]
    pub show_version: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Install every phase (default)
    Install,
    /// Check prerequisites and report problems
    Doctor,
    /// Show the recorded state
    Status,
    /// Re-install release-binary tools at their latest versions
    Update,
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Doctor => "doctor",
            Self::Status => "status",
            Self::Update => "update",
            Self::Version => "version",
        }
    }
}
