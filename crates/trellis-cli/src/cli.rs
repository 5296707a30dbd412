use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "trellis",
    about = "Trellis: diff and apply outline snapshots",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with apply settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the edit script between two outline files
    Diff(DiffArgs),
    /// Apply two outline files in turn to an in-memory outline and show its rows
    Apply(ApplyArgs),
    /// Rewrite an outline file in normalized form
    Export(ExportArgs),
    /// Show item counts for an outline file
    Stats(StatsArgs),
    /// Print a sample outline
    Sample,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Outline currently shown
    pub old: PathBuf,
    /// Outline to show next
    pub new: PathBuf,
}

#[derive(Args)]
pub struct ApplyArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    /// Animate the second update
    #[arg(long)]
    pub animate: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    pub file: PathBuf,
    /// Write here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatsArgs {
    pub file: PathBuf,
}
