//! Command implementations for the CLI interface.
//!
//! Thin presentation layer: each handler calls into the lifecycle service or
//! the reporting engine and prints the result. All domain rules live below
//! this module.

use std::io::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use uuid::Uuid;

use crate::cli::Cli;
use crate::error::PotatoError;
use crate::fields::{
    format_category, format_difficulty, format_status, format_tier, Category, Difficulty,
    LeaderboardKey, UserStatus,
};
use crate::report::{self, ReportFilters};
use crate::service::{ListFilter, TaskService};
use crate::task::{NewTask, TaskPatch};

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Longer description.
        #[arg(long)]
        desc: String,
        /// Business category.
        #[arg(long, value_enum)]
        category: Category,
        /// Difficulty tier: common | rare | epic. Defaults to common.
        #[arg(long, value_enum)]
        difficulty: Option<Difficulty>,
        /// Base value (100..=50000). Defaults from the difficulty tier.
        #[arg(long)]
        value: Option<i64>,
        /// Initial holder (roster user id).
        #[arg(long)]
        holder: String,
        /// Soft time budget in seconds (default 3600).
        #[arg(long)]
        time_limit: Option<i64>,
    },

    /// List active tasks with live temperatures.
    List {
        /// Filter by holder.
        #[arg(long)]
        user: Option<String>,
        /// Filter by category.
        #[arg(long, value_enum)]
        category: Option<Category>,
    },

    /// View a single task by id.
    View { id: Uuid },

    /// Hand a task to another holder.
    Pass {
        id: Uuid,
        /// Current holder (must actually hold the task).
        #[arg(long)]
        from: String,
        /// Receiving user.
        #[arg(long)]
        to: String,
    },

    /// Complete a task: snapshot to the archive and pay out.
    Complete {
        id: Uuid,
        /// Completing user.
        #[arg(long)]
        by: String,
        /// Explicit earned-value override (skips the bonus computation).
        #[arg(long)]
        earned_value: Option<i64>,
    },

    /// Update fields on an active task.
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, value_enum)]
        category: Option<Category>,
        #[arg(long, value_enum)]
        difficulty: Option<Difficulty>,
        #[arg(long)]
        value: Option<i64>,
        #[arg(long)]
        time_limit: Option<i64>,
        /// Expected task version; the update is rejected if someone wrote
        /// first.
        #[arg(long)]
        expected_version: Option<u64>,
    },

    /// Remove a task without archiving it.
    Delete {
        id: Uuid,
        /// Delete from the archive instead of the active set.
        #[arg(long)]
        archived: bool,
    },

    /// List archived (completed) tasks, newest first.
    Archive {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Active-set statistics.
    Stats,

    /// Potential-earnings preview for the active set.
    Potential,

    /// Earnings summary for one user.
    Earnings { user: String },

    /// Roster leaderboard.
    Leaderboard {
        #[arg(long, value_enum, default_value_t = LeaderboardKey::Xp)]
        sort: LeaderboardKey,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Filtered archive report with breakdowns and top performers.
    Report {
        /// Start date (YYYY-MM-DD, inclusive).
        #[arg(long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD, inclusive).
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long, value_enum)]
        category: Option<Category>,
        #[arg(long, value_enum)]
        difficulty: Option<Difficulty>,
    },

    /// Per-day completion counts and earnings.
    Trends {
        /// Trailing window in days (defaults from config).
        #[arg(long)]
        days: Option<i64>,
    },

    /// Export the filtered archive to CSV.
    Export {
        /// Output file path (default: archive.csv).
        #[arg(long)]
        output: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long, value_enum)]
        category: Option<Category>,
        #[arg(long, value_enum)]
        difficulty: Option<Difficulty>,
    },

    /// Show the roster with levels and streaks.
    Users,

    /// Bump or reset a user's streak.
    Streak {
        user: String,
        /// Reset to zero instead of incrementing.
        #[arg(long)]
        reset: bool,
    },

    /// Set a user's availability status.
    Status {
        user: String,
        #[arg(value_enum)]
        status: UserStatus,
    },

    /// Show a user's achievements; optionally run the award check.
    Achievements {
        user: String,
        /// Evaluate thresholds and award anything newly earned.
        #[arg(long)]
        check: bool,
    },

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parse a YYYY-MM-DD date as the start of that UTC day.
fn parse_day_start(s: &str) -> Result<DateTime<Utc>, PotatoError> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| PotatoError::Validation(format!("invalid date '{s}', expected YYYY-MM-DD")))?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap().and_utc())
}

/// Parse a YYYY-MM-DD date as the end of that UTC day (inclusive bound).
fn parse_day_end(s: &str) -> Result<DateTime<Utc>, PotatoError> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| PotatoError::Validation(format!("invalid date '{s}', expected YYYY-MM-DD")))?;
    Ok(date.and_hms_opt(23, 59, 59).unwrap().and_utc())
}

fn build_filters(
    start: Option<String>,
    end: Option<String>,
    user: Option<String>,
    category: Option<Category>,
    difficulty: Option<Difficulty>,
) -> anyhow::Result<ReportFilters> {
    Ok(ReportFilters {
        start: start.as_deref().map(parse_day_start).transpose()?,
        end: end.as_deref().map(parse_day_end).transpose()?,
        user,
        category,
        difficulty,
    })
}

/// Truncate a string for table display, adding an ellipsis if needed.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    svc: &TaskService,
    title: String,
    desc: String,
    category: Category,
    difficulty: Option<Difficulty>,
    value: Option<i64>,
    holder: String,
    time_limit: Option<i64>,
) -> anyhow::Result<()> {
    let task = svc.create(NewTask {
        title,
        description: desc,
        category,
        difficulty,
        value,
        holder,
        time_limit,
    })?;
    println!("Created task {} ({})", task.id, task.title);
    println!(
        "  holder: {}  value: {}  difficulty: {}",
        task.holder,
        task.value,
        format_difficulty(task.difficulty)
    );
    Ok(())
}

pub fn cmd_list(
    svc: &TaskService,
    user: Option<String>,
    category: Option<Category>,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let tasks = svc.list(&ListFilter {
        holder: user,
        category,
    });
    println!(
        "{:<36} {:<22} {:<8} {:>6} {:>6} {:<11} {}",
        "ID", "Title", "Holder", "Temp", "Bonus", "Tier", "Category"
    );
    for task in &tasks {
        let heat = task.heat(now);
        println!(
            "{:<36} {:<22} {:<8} {:>6.1} {:>5.1}x {:<11} {}",
            task.id,
            truncate(&task.title, 22),
            task.holder,
            heat.temperature,
            heat.bonus_multiplier,
            format_tier(heat.tier),
            format_category(task.category)
        );
    }
    println!("{} task(s)", tasks.len());
    Ok(())
}

pub fn cmd_view(svc: &TaskService, id: Uuid) -> anyhow::Result<()> {
    let task = svc.get(id).ok_or(PotatoError::TaskNotFound(id))?;
    let heat = task.heat(Utc::now());
    println!("{}  v{}", task.id, task.version);
    println!("  title:       {}", task.title);
    println!("  description: {}", task.description);
    println!("  category:    {}", format_category(task.category));
    println!("  difficulty:  {}", format_difficulty(task.difficulty));
    println!("  value:       {}", task.value);
    println!("  holder:      {}", task.holder);
    println!(
        "  last passer: {}",
        task.last_passer.as_deref().unwrap_or("-")
    );
    println!("  passes:      {}  combo: {}", task.pass_count, task.combo);
    println!(
        "  temperature: {:.1} ({}), bonus {:.1}x",
        heat.temperature,
        format_tier(heat.tier),
        heat.bonus_multiplier
    );
    println!("  potential:   {}", task.potential_value(Utc::now()));
    println!("  time left:   {}s", heat.time_left);
    println!("  created:     {}", task.created_at.to_rfc3339());
    Ok(())
}

pub fn cmd_pass(svc: &TaskService, id: Uuid, from: String, to: String) -> anyhow::Result<()> {
    let task = svc.pass(id, &from, &to)?;
    let heat = task.heat(Utc::now());
    println!(
        "Passed {} -> {} (pass #{}, combo {}, temperature {:.1})",
        from, to, task.pass_count, task.combo, heat.temperature
    );
    Ok(())
}

pub fn cmd_complete(
    svc: &TaskService,
    id: Uuid,
    by: String,
    earned_value: Option<i64>,
) -> anyhow::Result<()> {
    let (archived, awarded) = svc.complete(id, &by, earned_value)?;
    println!(
        "Completed '{}': earned {} ({}x at {:.1} degrees), score {}",
        archived.title,
        archived.earned_value,
        archived.bonus_multiplier,
        archived.final_temperature,
        archived.game_score
    );
    for a in awarded {
        println!("  achievement unlocked: {}", a.achievement_name);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_update(
    svc: &TaskService,
    id: Uuid,
    title: Option<String>,
    desc: Option<String>,
    category: Option<Category>,
    difficulty: Option<Difficulty>,
    value: Option<i64>,
    time_limit: Option<i64>,
    expected_version: Option<u64>,
) -> anyhow::Result<()> {
    let task = svc.update(
        id,
        TaskPatch {
            title,
            description: desc,
            category,
            difficulty,
            value,
            time_limit,
        },
        expected_version,
    )?;
    println!("Updated {} (now v{})", task.id, task.version);
    Ok(())
}

pub fn cmd_delete(svc: &TaskService, id: Uuid, archived: bool) -> anyhow::Result<()> {
    if archived {
        svc.delete_archived(id)?;
        println!("Deleted archived task {id}");
    } else {
        svc.delete(id)?;
        println!("Deleted task {id}");
    }
    Ok(())
}

pub fn cmd_archive(svc: &TaskService, limit: usize) -> anyhow::Result<()> {
    let state = svc.store().read();
    let mut entries: Vec<_> = state.archive.iter().collect();
    entries.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    println!(
        "{:<36} {:<22} {:<8} {:>8} {:>6} {}",
        "ID", "Title", "By", "Earned", "Score", "Completed"
    );
    for task in entries.iter().take(limit) {
        println!(
            "{:<36} {:<22} {:<8} {:>8} {:>6} {}",
            task.id,
            truncate(&task.title, 22),
            task.completed_by,
            task.earned_value,
            task.game_score,
            task.completed_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!("{} archived task(s)", state.archive.len());
    Ok(())
}

pub fn cmd_stats(svc: &TaskService) -> anyhow::Result<()> {
    let stats = svc.stats(Utc::now());
    println!("Active tasks:       {}", stats.total);
    println!("Completed tasks:    {}", stats.completed);
    println!("Average temperature: {:.1}", stats.avg_temperature);
    println!("Hot (>80):          {}", stats.hot_tasks);
    println!("Critical (>90):     {}", stats.critical_tasks);
    println!("Total base value:   {}", stats.total_value);
    println!("Potential earnings: {}", stats.potential_earnings);
    if !stats.by_category.is_empty() {
        println!("By category:");
        for (category, count) in &stats.by_category {
            println!("  {category}: {count}");
        }
    }
    if !stats.by_user.is_empty() {
        println!("By holder:");
        for (user, count) in &stats.by_user {
            println!("  {user}: {count}");
        }
    }
    if !stats.by_difficulty.is_empty() {
        println!("By difficulty:");
        for (difficulty, count) in &stats.by_difficulty {
            println!("  {difficulty}: {count}");
        }
    }
    Ok(())
}

pub fn cmd_potential(svc: &TaskService) -> anyhow::Result<()> {
    let potential = svc.potential_earnings(Utc::now());
    println!(
        "Potential earnings: {} across {} task(s)",
        potential.total, potential.total_tasks
    );
    println!(
        "Epic share: {} across {} task(s)",
        potential.epic_total, potential.epic_tasks
    );
    for (user, value) in &potential.by_user {
        println!("  {user}: {value}");
    }
    Ok(())
}

pub fn cmd_earnings(svc: &TaskService, user: String) -> anyhow::Result<()> {
    let state = svc.store().read();
    let earnings = report::user_earnings(&state.archive, &user, Utc::now());
    println!("Earnings for {user}:");
    println!("  total:      {}", earnings.total);
    println!(
        "  this week:  {} ({} task(s))",
        earnings.this_week, earnings.this_week_count
    );
    println!(
        "  this month: {} ({} task(s))",
        earnings.this_month, earnings.this_month_count
    );
    println!("  completed:  {}", earnings.completed);
    println!("  avg/task:   {:.1}", earnings.avg_per_task);
    println!("  best task:  {}", earnings.best_task);
    Ok(())
}

pub fn cmd_leaderboard(svc: &TaskService, sort: LeaderboardKey, limit: usize) -> anyhow::Result<()> {
    let state = svc.store().read();
    let rows = report::leaderboard(&state.users, &state.archive, sort, limit);
    println!(
        "{:<5} {:<10} {:>5} {:>7} {:>9} {:>7} {:>9}",
        "Rank", "User", "Lvl", "XP", "Completed", "Streak", "Earnings"
    );
    for row in rows {
        println!(
            "{:<5} {:<10} {:>5} {:>7} {:>9} {:>7} {:>9}",
            row.rank, row.user_id, row.level, row.xp, row.completed, row.streak, row.earnings
        );
    }
    Ok(())
}

pub fn cmd_report(
    svc: &TaskService,
    start: Option<String>,
    end: Option<String>,
    user: Option<String>,
    category: Option<Category>,
    difficulty: Option<Difficulty>,
) -> anyhow::Result<()> {
    let filters = build_filters(start, end, user, category, difficulty)?;
    let state = svc.store().read();
    let report = report::archive_report(&state.archive, &filters);
    println!("Tasks:        {}", report.summary.total_tasks);
    println!("Total earned: {}", report.summary.total_value);
    println!("Average:      {:.1}", report.summary.average_value);
    println!("Highest:      {}", report.summary.highest_value);
    println!("Lowest:       {}", report.summary.lowest_value);
    if !report.by_category.is_empty() {
        println!("By category:");
        for (key, totals) in &report.by_category {
            println!("  {key}: {} task(s), {}", totals.count, totals.total_value);
        }
    }
    if !report.by_difficulty.is_empty() {
        println!("By difficulty:");
        for (key, totals) in &report.by_difficulty {
            println!("  {key}: {} task(s), {}", totals.count, totals.total_value);
        }
    }
    if !report.by_month.is_empty() {
        println!("By month:");
        for (key, totals) in &report.by_month {
            println!("  {key}: {} task(s), {}", totals.count, totals.total_value);
        }
    }
    if !report.top_performers.is_empty() {
        println!("Top performers:");
        for (i, p) in report.top_performers.iter().enumerate() {
            println!(
                "  {}. {} — {} from {} task(s) (avg {:.1})",
                i + 1,
                p.user_id,
                p.total_value,
                p.count,
                p.average_value
            );
        }
    }
    Ok(())
}

pub fn cmd_trends(svc: &TaskService, days: Option<i64>) -> anyhow::Result<()> {
    let days = days.unwrap_or(svc.config().trend_window_days);
    let state = svc.store().read();
    let trends = report::trends(&state.archive, days, Utc::now());
    println!("{:<12} {:>11} {:>9}", "Date", "Completions", "Earnings");
    for (date, count) in &trends.daily_completions {
        let earned = trends.daily_earnings.get(date).copied().unwrap_or(0);
        println!("{:<12} {:>11} {:>9}", date, count, earned);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_export(
    svc: &TaskService,
    output: Option<String>,
    start: Option<String>,
    end: Option<String>,
    user: Option<String>,
    category: Option<Category>,
    difficulty: Option<Difficulty>,
) -> anyhow::Result<()> {
    let filters = build_filters(start, end, user, category, difficulty)?;
    let output_path = output.unwrap_or_else(|| "archive.csv".to_string());
    let state = svc.store().read();
    let csv = report::export_csv(&state.archive, &filters);
    let rows = csv.lines().count() - 1;
    std::fs::write(&output_path, csv)?;
    println!("Exported {rows} row(s) to {output_path}");
    Ok(())
}

pub fn cmd_users(svc: &TaskService) -> anyhow::Result<()> {
    println!(
        "{:<10} {:<10} {:<8} {:>5} {:>7} {:>9} {:>7}",
        "User", "Name", "Status", "Lvl", "XP", "Completed", "Streak"
    );
    for user in svc.users() {
        println!(
            "{:<10} {:<10} {:<8} {:>5} {:>7} {:>9} {:>7}",
            user.id,
            user.name,
            format_status(user.status),
            user.level,
            user.xp,
            user.potatoes_completed,
            user.streak
        );
    }
    Ok(())
}

pub fn cmd_streak(svc: &TaskService, user: String, reset: bool) -> anyhow::Result<()> {
    let updated = svc.adjust_streak(&user, reset)?;
    println!("{}: streak is now {}", updated.id, updated.streak);
    Ok(())
}

pub fn cmd_status(svc: &TaskService, user: String, status: UserStatus) -> anyhow::Result<()> {
    let updated = svc.set_status(&user, status)?;
    println!("{}: status is now {}", updated.id, format_status(updated.status));
    Ok(())
}

pub fn cmd_achievements(svc: &TaskService, user: String, check: bool) -> anyhow::Result<()> {
    if check {
        let awarded = svc.check_achievements(&user)?;
        if awarded.is_empty() {
            println!("Nothing new for {user}");
        } else {
            for a in awarded {
                println!("Achievement unlocked: {}", a.achievement_name);
            }
        }
    }
    let held = svc.achievements_for(&user);
    println!("{user} holds {} achievement(s):", held.len());
    for a in held {
        println!(
            "  {} (awarded {})",
            a.achievement_name,
            a.awarded_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

pub fn cmd_completions(shell: Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
    std::io::stdout().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_bounds_are_inclusive() {
        let start = parse_day_start("2026-03-18").unwrap();
        let end = parse_day_end("2026-03-18").unwrap();
        assert_eq!(start.to_rfc3339(), "2026-03-18T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-03-18T23:59:59+00:00");
        assert!(parse_day_start("18/03/2026").is_err());
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title here", 8), "a longe…");
    }
}
