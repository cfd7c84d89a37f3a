//! # Hot Potato - task-handoff tracker CLI
//!
//! Tasks ("potatoes") circulate among a fixed roster of users. Each task
//! accumulates a 0-100 temperature from its age and every hand-off; hotter
//! tasks pay a bigger bonus when completed, and completed tasks are archived
//! with their earned value for reporting and leaderboards.
//!
//! ## Quick start
//!
//! ```bash
//! # Create a task
//! potato add "Chase the Hendersons quote" --desc "Revised quote for the extension" \
//!     --category sales --holder ilan --value 1000
//!
//! # Hand it off (adds a temperature penalty)
//! potato pass <id> --from ilan --to nas
//!
//! # Complete it (hot tasks pay up to 2x)
//! potato complete <id> --by nas
//!
//! # Reporting
//! potato leaderboard --sort earnings
//! potato report --start 2026-03-01 --user nas
//! potato export --output march.csv --start 2026-03-01 --end 2026-03-31
//! ```
//!
//! Data is stored locally under `~/.potato/` as plain JSON files; the roster
//! lives in `config.json` there and can be edited freely.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod fields;
pub mod game;
pub mod heat;
pub mod report;
pub mod service;
pub mod store;
pub mod task;
pub mod users;

use cli::Cli;
use cmd::Commands;
use config::Config;
use service::TaskService;
use store::Store;

fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
    if let Some(dir) = cli.data_dir.clone() {
        return Ok(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Ok(PathBuf::from(home).join(".potato"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Completions need no store.
    if let Commands::Completions { shell } = &cli.command {
        return cmd::cmd_completions(*shell);
    }

    let dir = data_dir(&cli)?;
    std::fs::create_dir_all(&dir)?;
    let config = Config::load_or_init(&dir)?;
    let store = Store::open(&dir, &config)?;
    let svc = TaskService::new(store, config);

    match cli.command {
        Commands::Add {
            title,
            desc,
            category,
            difficulty,
            value,
            holder,
            time_limit,
        } => cmd::cmd_add(&svc, title, desc, category, difficulty, value, holder, time_limit),
        Commands::List { user, category } => cmd::cmd_list(&svc, user, category),
        Commands::View { id } => cmd::cmd_view(&svc, id),
        Commands::Pass { id, from, to } => cmd::cmd_pass(&svc, id, from, to),
        Commands::Complete { id, by, earned_value } => {
            cmd::cmd_complete(&svc, id, by, earned_value)
        }
        Commands::Update {
            id,
            title,
            desc,
            category,
            difficulty,
            value,
            time_limit,
            expected_version,
        } => cmd::cmd_update(
            &svc,
            id,
            title,
            desc,
            category,
            difficulty,
            value,
            time_limit,
            expected_version,
        ),
        Commands::Delete { id, archived } => cmd::cmd_delete(&svc, id, archived),
        Commands::Archive { limit } => cmd::cmd_archive(&svc, limit),
        Commands::Stats => cmd::cmd_stats(&svc),
        Commands::Potential => cmd::cmd_potential(&svc),
        Commands::Earnings { user } => cmd::cmd_earnings(&svc, user),
        Commands::Leaderboard { sort, limit } => cmd::cmd_leaderboard(&svc, sort, limit),
        Commands::Report {
            start,
            end,
            user,
            category,
            difficulty,
        } => cmd::cmd_report(&svc, start, end, user, category, difficulty),
        Commands::Trends { days } => cmd::cmd_trends(&svc, days),
        Commands::Export {
            output,
            start,
            end,
            user,
            category,
            difficulty,
        } => cmd::cmd_export(&svc, output, start, end, user, category, difficulty),
        Commands::Users => cmd::cmd_users(&svc),
        Commands::Streak { user, reset } => cmd::cmd_streak(&svc, user, reset),
        Commands::Status { user, status } => cmd::cmd_status(&svc, user, status),
        Commands::Achievements { user, check } => cmd::cmd_achievements(&svc, user, check),
        Commands::Completions { .. } => unreachable!("handled above"),
    }
}
