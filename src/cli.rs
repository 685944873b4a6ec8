use clap::{Args, Parser, Subcommand};

pub const DEFAULT_TARGET: &str = "dev";

#[derive(Debug, Parser)]
#[command(name = "vumit", version, about = "AI-assisted review of git branch changes")]
pub struct Cli {
    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Review the commits on this branch and suggest improvements
    Check(CheckArgs),
    /// Write a merge request description for this branch
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Branch to compare against
    #[arg(long, default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Review staged, unstaged and untracked changes instead of commits
    #[arg(long)]
    pub uncommitted: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Branch to compare against
    #[arg(long, default_value = DEFAULT_TARGET)]
    pub target: String,
}
