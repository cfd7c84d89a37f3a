use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed hot-potato tracker CLI.
/// Data lives under ~/.potato or a directory passed via --data-dir.
#[derive(Parser)]
#[command(name = "potato", version, about = "Gamified task-handoff tracker")]
pub struct Cli {
    /// Directory holding the JSON data files.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
