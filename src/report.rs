//! Aggregation and reporting over the archive.
//!
//! Everything here is a pure read-side derivation: per-user earnings with
//! rolling windows, leaderboards, filtered reports with breakdowns, daily
//! trend series and CSV export. Empty inputs always yield zero/empty
//! aggregates — every average guards its divisor.
//!
//! Windows and buckets use UTC throughout; "this week" is the ISO week
//! (Monday start).

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;

use crate::fields::{format_category, format_difficulty, Category, Difficulty, LeaderboardKey};
use crate::task::ArchivedTask;
use crate::users::User;

/// Midnight UTC on the Monday of the week containing `now`.
fn start_of_iso_week(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    monday.and_hms_opt(0, 0, 0).unwrap().and_utc()
}

/// Midnight UTC on the first of the month containing `now`.
fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive().with_day(1).unwrap();
    date.and_hms_opt(0, 0, 0).unwrap().and_utc()
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct UserEarnings {
    pub total: i64,
    pub this_week: i64,
    pub this_month: i64,
    pub completed: usize,
    pub this_week_count: usize,
    pub this_month_count: usize,
    pub avg_per_task: f64,
    pub best_task: i64,
}

/// Windowed earnings for one user, derived entirely from the archive.
pub fn user_earnings(archive: &[ArchivedTask], user_id: &str, now: DateTime<Utc>) -> UserEarnings {
    let week_start = start_of_iso_week(now);
    let month_start = start_of_month(now);

    let mut out = UserEarnings::default();
    for task in archive.iter().filter(|t| t.completed_by == user_id) {
        out.total += task.earned_value;
        out.completed += 1;
        out.best_task = out.best_task.max(task.earned_value);
        if task.completed_at >= week_start {
            out.this_week += task.earned_value;
            out.this_week_count += 1;
        }
        if task.completed_at >= month_start {
            out.this_month += task.earned_value;
            out.this_month_count += 1;
        }
    }
    if out.completed > 0 {
        out.avg_per_task = out.total as f64 / out.completed as f64;
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub user_id: String,
    pub name: String,
    pub level: u32,
    pub xp: i64,
    pub completed: u32,
    pub streak: u32,
    pub earnings: i64,
}

/// Rank the roster by the given key, descending. Ties break by user id
/// ascending so the ordering is deterministic.
pub fn leaderboard(
    users: &[User],
    archive: &[ArchivedTask],
    key: LeaderboardKey,
    limit: usize,
) -> Vec<LeaderboardRow> {
    let mut rows: Vec<LeaderboardRow> = users
        .iter()
        .map(|u| LeaderboardRow {
            rank: 0,
            user_id: u.id.clone(),
            name: u.name.clone(),
            level: u.level,
            xp: u.xp,
            completed: u.potatoes_completed,
            streak: u.streak,
            earnings: archive
                .iter()
                .filter(|t| t.completed_by == u.id)
                .map(|t| t.earned_value)
                .sum(),
        })
        .collect();

    rows.sort_by(|a, b| {
        let ord = match key {
            LeaderboardKey::Xp => b.xp.cmp(&a.xp),
            LeaderboardKey::Level => b.level.cmp(&a.level),
            LeaderboardKey::Completed => b.completed.cmp(&a.completed),
            LeaderboardKey::Streak => b.streak.cmp(&a.streak),
            LeaderboardKey::Earnings => b.earnings.cmp(&a.earnings),
        };
        ord.then_with(|| a.user_id.cmp(&b.user_id))
    });
    rows.truncate(limit);
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    rows
}

/// Conjunctive archive filters: a record must match every one that is set.
#[derive(Debug, Default, Clone)]
pub struct ReportFilters {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub user: Option<String>,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
}

impl ReportFilters {
    fn matches(&self, task: &ArchivedTask) -> bool {
        self.start.map_or(true, |s| task.completed_at >= s)
            && self.end.map_or(true, |e| task.completed_at <= e)
            && self.user.as_deref().map_or(true, |u| task.completed_by == u)
            && self.category.map_or(true, |c| task.category == c)
            && self.difficulty.map_or(true, |d| task.difficulty == d)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ReportSummary {
    pub total_tasks: usize,
    pub total_value: i64,
    pub average_value: f64,
    pub highest_value: i64,
    pub lowest_value: i64,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct GroupTotals {
    pub count: usize,
    pub total_value: i64,
}

#[derive(Debug, Serialize)]
pub struct TopPerformer {
    pub user_id: String,
    pub count: usize,
    pub total_value: i64,
    pub average_value: f64,
}

#[derive(Debug, Serialize)]
pub struct ArchiveReport {
    pub summary: ReportSummary,
    pub by_category: BTreeMap<String, GroupTotals>,
    pub by_user: BTreeMap<String, GroupTotals>,
    pub by_difficulty: BTreeMap<String, GroupTotals>,
    pub by_month: BTreeMap<String, GroupTotals>,
    pub top_performers: Vec<TopPerformer>,
    pub data: Vec<ArchivedTask>,
}

/// Filtered archive report: summary stats, breakdowns, top-5 performers and
/// the matching rows sorted newest-first.
pub fn archive_report(archive: &[ArchivedTask], filters: &ReportFilters) -> ArchiveReport {
    let mut data: Vec<ArchivedTask> = archive
        .iter()
        .filter(|t| filters.matches(t))
        .cloned()
        .collect();
    data.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    let total_value: i64 = data.iter().map(|t| t.earned_value).sum();
    let summary = ReportSummary {
        total_tasks: data.len(),
        total_value,
        average_value: if data.is_empty() {
            0.0
        } else {
            total_value as f64 / data.len() as f64
        },
        highest_value: data.iter().map(|t| t.earned_value).max().unwrap_or(0),
        lowest_value: data.iter().map(|t| t.earned_value).min().unwrap_or(0),
    };

    let mut by_category: BTreeMap<String, GroupTotals> = BTreeMap::new();
    let mut by_user: BTreeMap<String, GroupTotals> = BTreeMap::new();
    let mut by_difficulty: BTreeMap<String, GroupTotals> = BTreeMap::new();
    let mut by_month: BTreeMap<String, GroupTotals> = BTreeMap::new();
    for task in &data {
        for (map, key) in [
            (&mut by_category, format_category(task.category).to_string()),
            (&mut by_user, task.completed_by.clone()),
            (&mut by_difficulty, format_difficulty(task.difficulty).to_string()),
            (&mut by_month, task.completed_at.format("%Y-%m").to_string()),
        ] {
            let entry = map.entry(key).or_default();
            entry.count += 1;
            entry.total_value += task.earned_value;
        }
    }

    let mut top_performers: Vec<TopPerformer> = by_user
        .iter()
        .map(|(user_id, totals)| TopPerformer {
            user_id: user_id.clone(),
            count: totals.count,
            total_value: totals.total_value,
            average_value: totals.total_value as f64 / totals.count as f64,
        })
        .collect();
    top_performers.sort_by(|a, b| {
        b.total_value
            .cmp(&a.total_value)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    top_performers.truncate(5);

    ArchiveReport {
        summary,
        by_category,
        by_user,
        by_difficulty,
        by_month,
        top_performers,
        data,
    }
}

#[derive(Debug, Default, Serialize)]
pub struct Trends {
    pub daily_completions: BTreeMap<String, usize>,
    pub daily_earnings: BTreeMap<String, i64>,
}

/// Per-day completion counts and earnings over a trailing window, keyed by
/// `YYYY-MM-DD` in UTC.
pub fn trends(archive: &[ArchivedTask], days: i64, now: DateTime<Utc>) -> Trends {
    let cutoff = now - Duration::days(days);
    let mut out = Trends::default();
    for task in archive.iter().filter(|t| t.completed_at >= cutoff) {
        let date = task.completed_at.format("%Y-%m-%d").to_string();
        *out.daily_completions.entry(date.clone()).or_default() += 1;
        *out.daily_earnings.entry(date).or_default() += task.earned_value;
    }
    out
}

const CSV_HEADER: &str = "ID,Title,Description,Category,Difficulty,Original Value,Earned Value,\
Temperature,Temperature Bonus,Pass Count,Completed By,Completed At,Created At";

/// Quote a free-text field, doubling embedded quotes per standard CSV
/// escaping.
fn csv_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Serialize the filtered archive as CSV, header row first. Deterministic:
/// rows come out newest-first like the report data.
pub fn export_csv(archive: &[ArchivedTask], filters: &ReportFilters) -> String {
    let report = archive_report(archive, filters);
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for task in &report.data {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
            task.id,
            csv_quote(&task.title),
            csv_quote(&task.description),
            format_category(task.category),
            format_difficulty(task.difficulty),
            task.value,
            task.earned_value,
            task.final_temperature,
            task.bonus_multiplier,
            task.pass_count,
            task.completed_by,
            task.completed_at.to_rfc3339(),
            task.created_at.to_rfc3339(),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::UserStatus;
    use uuid::Uuid;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn archived(
        completed_by: &str,
        completed_at: DateTime<Utc>,
        earned_value: i64,
        category: Category,
        difficulty: Difficulty,
    ) -> ArchivedTask {
        ArchivedTask {
            id: Uuid::new_v4(),
            title: "Snag list walkthrough".into(),
            description: "Walk the site and log outstanding snags.".into(),
            category,
            difficulty,
            value: 1000,
            holder: completed_by.into(),
            pass_count: 2,
            combo: 0,
            completed_by: completed_by.into(),
            completed_at,
            earned_value,
            final_temperature: 42.0,
            bonus_multiplier: 1.0,
            game_score: earned_value / 10,
            completion_time_ms: 120_000,
            created_at: completed_at - Duration::hours(1),
        }
    }

    fn user(id: &str, xp: i64, level: u32, completed: u32, streak: u32) -> User {
        User {
            id: id.into(),
            name: id.into(),
            status: UserStatus::Active,
            level,
            xp,
            potatoes_completed: completed,
            streak,
        }
    }

    #[test]
    fn earnings_windows_split_on_iso_week_and_month() {
        // 2026-03-18 is a Wednesday; the ISO week starts Monday 03-16.
        let now = at("2026-03-18T12:00:00Z");
        let archive = vec![
            archived("nas", at("2026-03-17T08:00:00Z"), 500, Category::Sales, Difficulty::Common),
            archived("nas", at("2026-03-10T08:00:00Z"), 300, Category::Sales, Difficulty::Common),
            archived("nas", at("2026-02-20T08:00:00Z"), 200, Category::Sales, Difficulty::Common),
            archived("ilan", at("2026-03-17T09:00:00Z"), 999, Category::Sales, Difficulty::Common),
        ];
        let e = user_earnings(&archive, "nas", now);
        assert_eq!(e.total, 1000);
        assert_eq!(e.this_week, 500);
        assert_eq!(e.this_week_count, 1);
        assert_eq!(e.this_month, 800);
        assert_eq!(e.this_month_count, 2);
        assert_eq!(e.completed, 3);
        assert_eq!(e.best_task, 500);
        assert!((e.avg_per_task - 1000.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn earnings_for_unknown_user_are_all_zero() {
        let e = user_earnings(&[], "ghost", at("2026-03-18T12:00:00Z"));
        assert_eq!(e, UserEarnings::default());
        assert!(!e.avg_per_task.is_nan());
    }

    #[test]
    fn leaderboard_sorts_desc_with_id_tiebreak() {
        let users = vec![
            user("brandon", 500, 3, 2, 1),
            user("ann", 500, 3, 9, 1),
            user("zoe", 900, 4, 1, 1),
        ];
        let rows = leaderboard(&users, &[], LeaderboardKey::Xp, 10);
        let ids: Vec<_> = rows.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, ["zoe", "ann", "brandon"]);
        assert_eq!(rows[0].rank, 1);

        let rows = leaderboard(&users, &[], LeaderboardKey::Completed, 2);
        let ids: Vec<_> = rows.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, ["ann", "brandon"]);
    }

    #[test]
    fn leaderboard_earnings_come_from_the_archive() {
        let users = vec![user("a", 0, 1, 0, 0), user("b", 0, 1, 0, 0)];
        let now = at("2026-03-18T12:00:00Z");
        let archive = vec![
            archived("b", now, 700, Category::Sales, Difficulty::Common),
            archived("a", now, 200, Category::Sales, Difficulty::Common),
            archived("b", now, 100, Category::Sales, Difficulty::Common),
        ];
        let rows = leaderboard(&users, &archive, LeaderboardKey::Earnings, 10);
        assert_eq!(rows[0].user_id, "b");
        assert_eq!(rows[0].earnings, 800);
        assert_eq!(rows[1].earnings, 200);
    }

    #[test]
    fn report_filters_are_conjunctive() {
        let now = at("2026-03-18T12:00:00Z");
        let archive = vec![
            archived("nas", now, 500, Category::Sales, Difficulty::Common),
            archived("nas", now, 300, Category::Construction, Difficulty::Common),
            archived("ilan", now, 200, Category::Sales, Difficulty::Epic),
        ];
        let report = archive_report(
            &archive,
            &ReportFilters {
                user: Some("nas".into()),
                category: Some(Category::Sales),
                ..ReportFilters::default()
            },
        );
        assert_eq!(report.summary.total_tasks, 1);
        assert_eq!(report.summary.total_value, 500);
        assert_eq!(report.summary.highest_value, 500);
        assert_eq!(report.summary.lowest_value, 500);
    }

    #[test]
    fn report_on_empty_archive_is_all_zero() {
        let report = archive_report(&[], &ReportFilters::default());
        assert_eq!(report.summary.total_tasks, 0);
        assert_eq!(report.summary.total_value, 0);
        assert_eq!(report.summary.average_value, 0.0);
        assert!(report.top_performers.is_empty());
        assert!(report.data.is_empty());
    }

    #[test]
    fn top_performers_are_capped_at_five() {
        let now = at("2026-03-18T12:00:00Z");
        let archive: Vec<ArchivedTask> = (0..7)
            .map(|i| {
                archived(
                    &format!("user{i}"),
                    now,
                    100 * (i + 1),
                    Category::Sales,
                    Difficulty::Common,
                )
            })
            .collect();
        let report = archive_report(&archive, &ReportFilters::default());
        assert_eq!(report.top_performers.len(), 5);
        assert_eq!(report.top_performers[0].user_id, "user6");
        assert_eq!(report.top_performers[0].total_value, 700);
    }

    #[test]
    fn trends_bucket_by_utc_day() {
        let now = at("2026-03-18T12:00:00Z");
        let archive = vec![
            archived("nas", at("2026-03-17T08:00:00Z"), 500, Category::Sales, Difficulty::Common),
            archived("nas", at("2026-03-17T18:00:00Z"), 100, Category::Sales, Difficulty::Common),
            archived("nas", at("2026-01-01T08:00:00Z"), 999, Category::Sales, Difficulty::Common),
        ];
        let t = trends(&archive, 30, now);
        assert_eq!(t.daily_completions.get("2026-03-17"), Some(&2));
        assert_eq!(t.daily_earnings.get("2026-03-17"), Some(&600));
        // Outside the 30-day window.
        assert!(!t.daily_completions.contains_key("2026-01-01"));
    }

    /// Minimal CSV line parser for the round-trip check: handles quoted
    /// fields with doubled quotes.
    fn parse_csv_line(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut chars = line.chars().peekable();
        let mut in_quotes = false;
        while let Some(c) = chars.next() {
            match c {
                '"' if in_quotes => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                '"' => in_quotes = true,
                ',' if !in_quotes => {
                    fields.push(std::mem::take(&mut field));
                }
                _ => field.push(c),
            }
        }
        fields.push(field);
        fields
    }

    #[test]
    fn csv_round_trips_embedded_quotes() {
        let now = at("2026-03-18T12:00:00Z");
        let mut task = archived("nas", now, 500, Category::Sales, Difficulty::Common);
        task.title = "Fix the \"urgent\" boiler".into();
        let csv = export_csv(&[task], &ReportFilters::default());

        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("ID,Title,Description,"));
        assert!(header.ends_with("Completed At,Created At"));
        let fields = parse_csv_line(lines.next().unwrap());
        assert_eq!(fields[1], "Fix the \"urgent\" boiler");
        assert_eq!(fields[3], "Sales");
        assert_eq!(fields[6], "500");
    }

    #[test]
    fn csv_on_empty_archive_is_header_only() {
        let csv = export_csv(&[], &ReportFilters::default());
        assert_eq!(csv.lines().count(), 1);
    }
}
