//! Plain-text rendering of tasks and stats for the terminal.

use std::fmt::Write as _;

use chrono::NaiveDate;
use taskdeck_proto::query::Pagination;
use taskdeck_proto::stats::StatsSnapshot;
use taskdeck_proto::task::Task;

/// Human-friendly due date relative to `today`: `Today`, `Tomorrow`,
/// `Yesterday`, otherwise `Mon DD, YYYY`.
#[must_use]
pub fn format_due_date(due: NaiveDate, today: NaiveDate) -> String {
    match (due - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ => due.format("%b %d, %Y").to_string(),
    }
}

/// A due date strictly before `today`. Tasks due today are not overdue.
#[must_use]
pub fn is_overdue(due: Option<NaiveDate>, today: NaiveDate) -> bool {
    due.is_some_and(|d| d < today)
}

/// One line per task: checkbox, priority, title and due date.
#[must_use]
pub fn task_line(task: &Task, today: NaiveDate) -> String {
    let mut line = format!(
        "[{}] {:<6} {}",
        if task.completed { 'x' } else { ' ' },
        task.priority.as_str(),
        task.title
    );
    if let Some(due) = task.due_date {
        let _ = write!(line, "  (due {})", format_due_date(due, today));
        if !task.completed && is_overdue(Some(due), today) {
            line.push_str(" OVERDUE");
        }
    }
    let _ = write!(line, "  {}", task.id);
    line
}

/// Title, description and timestamps of one task.
#[must_use]
pub fn task_detail(task: &Task, today: NaiveDate) -> String {
    let mut out = task_line(task, today);
    if !task.description.is_empty() {
        let _ = write!(out, "\n    {}", task.description);
    }
    let _ = write!(
        out,
        "\n    created {}  updated {}",
        task.created_at.format("%b %d, %Y %H:%M"),
        task.updated_at.format("%b %d, %Y %H:%M")
    );
    out
}

/// `Page 2 of 3 (25 tasks)`.
#[must_use]
pub fn pagination_line(pagination: &Pagination) -> String {
    format!(
        "Page {} of {} ({} tasks)",
        pagination.page,
        pagination.pages.max(1),
        pagination.total
    )
}

/// Summary of the stats snapshot.
#[must_use]
pub fn stats_block(stats: &StatsSnapshot) -> String {
    format!(
        "Total: {}  Completed: {}  Pending: {}\nHigh: {}  Medium: {}  Low: {}",
        stats.total, stats.completed, stats.pending, stats.high, stats.medium, stats.low
    )
}
