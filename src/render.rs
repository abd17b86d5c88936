//! Terminal rendering for vendo-core types.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use owo_colors::OwoColorize;
use vendo_core::color::TaskColor;
use vendo_core::event::Event;
use vendo_core::remote::protocol::CalendarInfo;
use vendo_core::run::{ActionKind, ActionOutcome, ActionRecord, Plan, PlanEntry, RunResult};
use vendo_core::task::Task;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for ActionKind {
    fn render(&self) -> String {
        match self {
            ActionKind::Create => "+".green().to_string(),
            ActionKind::Update => "~".yellow().to_string(),
            ActionKind::RefreshColor => "*".blue().to_string(),
        }
    }
}

impl Render for TaskColor {
    fn render(&self) -> String {
        match self {
            TaskColor::Overdue => self.red().to_string(),
            TaskColor::Done => self.dimmed().to_string(),
            TaskColor::Normal => self.green().to_string(),
        }
    }
}

impl Render for Event {
    fn render(&self) -> String {
        format!("- {} {}", self.summary, self.start.to_string().dimmed())
    }
}

impl Render for CalendarInfo {
    fn render(&self) -> String {
        let marker = if self.primary { "*" } else { " " };
        format!("{} {:30}  ->  {}", marker, self.summary, self.id.dimmed())
    }
}

pub fn local(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%a %Y-%m-%d %H:%M").to_string()
}

fn span(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>, tz: Tz) -> String {
    match (start, end) {
        (Some(start), Some(end)) => format!(
            "{} - {}",
            local(start, tz),
            end.with_timezone(&tz).format("%H:%M")
        ),
        _ => "unplaced".to_string(),
    }
}

pub fn render_task(task: &Task, color: TaskColor, tz: Tz) -> String {
    let mut tags = Vec::new();
    if let Some(priority) = task.priority {
        tags.push(format!("priority {priority}"));
    }
    tags.push(format!("{} min", task.duration().num_minutes()));
    if let Some(due) = task.due_date {
        tags.push(format!("due {due}"));
    }

    format!(
        "{} {} [{}]\n   {}",
        task.summary,
        color.render(),
        tags.join(", "),
        span(task.original_start, task.original_end, tz).dimmed()
    )
}

fn render_entry(entry: &PlanEntry, tz: Tz) -> String {
    let note = entry
        .note
        .as_deref()
        .map(|n| format!(" ({n})"))
        .unwrap_or_default();
    format!(
        "{} {}{}",
        entry.summary,
        span(entry.start, entry.end, tz).dimmed(),
        note.dimmed()
    )
}

pub fn render_plan(plan: &Plan, tz: Tz) -> String {
    let mut lines = Vec::new();

    for entry in &plan.placed {
        lines.push(format!("   {} {}", ">".green(), render_entry(entry, tz)));
    }
    for entry in &plan.frozen {
        lines.push(format!("   {} {}", "=".blue(), render_entry(entry, tz)));
    }
    for entry in &plan.unschedulable {
        lines.push(format!("   {} {}", "!".red(), render_entry(entry, tz).red()));
    }

    if lines.is_empty() {
        return "   No vendor tasks".dimmed().to_string();
    }
    lines.join("\n")
}

/// Warning lines for calendars that could not be read.
pub fn render_skipped(skipped: &[(String, String)]) -> Option<String> {
    if skipped.is_empty() {
        return None;
    }
    let lines: Vec<String> = skipped
        .iter()
        .map(|(calendar_id, error)| {
            format!("   {} {} skipped: {}", "!".yellow(), calendar_id, error.dimmed())
        })
        .collect();
    Some(lines.join("\n"))
}

pub fn render_action(action: &ActionRecord, tz: Tz) -> String {
    let draft = &action.draft;
    let outcome = match &action.outcome {
        ActionOutcome::Planned => "planned".dimmed().to_string(),
        ActionOutcome::Applied { .. } => "ok".green().to_string(),
        ActionOutcome::Failed { error } => error.red().to_string(),
    };
    format!(
        "   {} {} {} {}",
        action.kind.render(),
        draft.summary,
        span(Some(draft.start), Some(draft.end), tz).dimmed(),
        outcome
    )
}

pub fn render_summary(result: &RunResult) -> String {
    let mut line = format!("[run {}] actions: {}", result.run_id, result.actions.len());
    if result.dry_run {
        line.push_str(&" (dry run)".dimmed().to_string());
    }
    if result.failed() > 0 {
        line.push_str(&format!(", {}", format!("{} failed", result.failed()).red()));
    }
    line
}
