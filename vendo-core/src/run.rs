//! One scheduling run: read calendars, schedule, write back, record.
//!
//! The orchestrator only talks to calendars through [`CalendarRead`] and
//! [`CalendarWrite`], and to persistence through [`RunLogSink`]. Reads that
//! fail skip the calendar; writes that fail are recorded and the batch goes
//! on. Invariant violations in upstream data abort the run.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::busy::BusyIndex;
use crate::color::{ColorPalette, TaskColor};
use crate::date_range::{DateRange, days_duration};
use crate::error::VendoResult;
use crate::event::{Event, EventDraft};
use crate::scheduler::{Schedule, Scheduler, SchedulerOptions, WorkingHours};
use crate::task::{Task, tasks_from_events};

#[async_trait]
pub trait CalendarRead: Send + Sync {
    async fn list_events(&self, calendar_id: &str, range: &DateRange) -> VendoResult<Vec<Event>>;
}

#[async_trait]
pub trait CalendarWrite: Send + Sync {
    /// Create an event and return it with its new id.
    async fn create_event(&self, calendar_id: &str, draft: &EventDraft) -> VendoResult<Event>;

    /// Overwrite time, color and description of an existing event.
    async fn update_event_time(
        &self,
        calendar_id: &str,
        event_id: &str,
        draft: &EventDraft,
    ) -> VendoResult<Event>;
}

/// Persists the record of a finished run.
pub trait RunLogSink {
    fn record(&self, result: &RunResult) -> VendoResult<()>;
}

/// Events gathered from several calendars.
#[derive(Debug, Default)]
pub struct MultiListing {
    /// `(calendar_id, events)` in the order the calendars were given
    pub events: Vec<(String, Vec<Event>)>,
    /// `(calendar_id, error)` for calendars that could not be read
    pub failed: Vec<(String, String)>,
}

/// Read every calendar in turn; a calendar that fails is left out.
pub async fn list_events_multi(
    reader: &dyn CalendarRead,
    calendar_ids: &[String],
    range: &DateRange,
) -> MultiListing {
    let mut listing = MultiListing::default();
    for calendar_id in calendar_ids {
        match reader.list_events(calendar_id, range).await {
            Ok(events) => listing.events.push((calendar_id.clone(), events)),
            Err(e) => {
                warn!(calendar = %calendar_id, error = %e, "skipping calendar");
                listing.failed.push((calendar_id.clone(), e.to_string()));
            }
        }
    }
    listing
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub calendar_id: String,
    pub busy_calendars: Vec<String>,
    pub timezone: Tz,
    pub working_hours: WorkingHours,
    pub lookback_days: u32,
    pub lookahead_days: u32,
    pub freeze_days: u32,
    pub palette: ColorPalette,
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            calendar_id: "primary".into(),
            busy_calendars: vec!["primary".into()],
            timezone: chrono_tz::Europe::Warsaw,
            working_hours: WorkingHours::default(),
            lookback_days: 10,
            lookahead_days: 20,
            freeze_days: 1,
            palette: ColorPalette::default(),
            dry_run: false,
        }
    }
}

/// A task as it sits on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub event_id: Option<String>,
    pub summary: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub color_id: Option<String>,
}

impl From<&Task> for TaskSnapshot {
    fn from(task: &Task) -> Self {
        TaskSnapshot {
            event_id: task.event_id.clone(),
            summary: task.summary.clone(),
            start: task.original_start,
            end: task.original_end,
            color_id: task.color_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Move a placed task
    Update,
    /// Put a task without an event id on the calendar
    Create,
    /// Keep the interval, change the color
    RefreshColor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Not executed (dry run)
    Planned,
    Applied { event_id: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Index of the task in the run's task list
    pub position: usize,
    pub kind: ActionKind,
    pub event_id: Option<String>,
    pub draft: EventDraft,
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorAssignment {
    pub event_id: Option<String>,
    pub summary: String,
    pub color: TaskColor,
    pub color_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub event_id: Option<String>,
    pub summary: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Why the task was frozen or could not be placed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Compact view of a [`Schedule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub placed: Vec<PlanEntry>,
    pub frozen: Vec<PlanEntry>,
    pub unschedulable: Vec<PlanEntry>,
}

impl From<&Schedule> for Plan {
    fn from(schedule: &Schedule) -> Self {
        let entry = |task: &Task, start, end, note| PlanEntry {
            event_id: task.event_id.clone(),
            summary: task.summary.clone(),
            start,
            end,
            note,
        };

        Plan {
            placed: schedule
                .placed
                .iter()
                .map(|p| entry(&p.task, Some(p.start), Some(p.end), None))
                .collect(),
            frozen: schedule
                .frozen
                .iter()
                .map(|f| {
                    let (start, end) = f.interval.unzip();
                    let note = serde_json::to_value(f.reason)
                        .ok()
                        .and_then(|v| v.as_str().map(str::to_string));
                    entry(&f.task, start, end, note)
                })
                .collect(),
            unschedulable: schedule
                .unschedulable
                .iter()
                .map(|u| entry(&u.task, None, None, Some(u.reason.clone())))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub snapshot_before: Vec<TaskSnapshot>,
    pub actions: Vec<ActionRecord>,
    pub snapshot_after: Vec<TaskSnapshot>,
    pub colors: Vec<ColorAssignment>,
    pub plan: Plan,
    pub trace: Vec<String>,
}

impl RunResult {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Applied { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ActionOutcome) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(&a.outcome)).count()
    }
}

pub fn new_run_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Everything a run reads: tasks, busy time and the window they came from.
pub struct Inputs {
    pub range: DateRange,
    pub today: NaiveDate,
    pub tasks: Vec<Task>,
    pub busy: BusyIndex,
    /// `(calendar_id, error)` for calendars that could not be read
    pub skipped: Vec<(String, String)>,
}

/// Read the target and busy calendars and build tasks and the busy index.
pub async fn gather(
    reader: &dyn CalendarRead,
    options: &RunOptions,
    now: DateTime<Utc>,
    trace: &mut Vec<String>,
) -> VendoResult<Inputs> {
    let tz = options.timezone;
    let today = now.with_timezone(&tz).date_naive();
    let range = DateRange::around(tz, today, options.lookback_days, options.lookahead_days)?;

    let mut skipped = Vec::new();
    let events = match reader.list_events(&options.calendar_id, &range).await {
        Ok(events) => events,
        Err(e) => {
            warn!(calendar = %options.calendar_id, error = %e, "could not read target calendar");
            trace.push(format!("list_events {} failed: {}", options.calendar_id, e));
            skipped.push((options.calendar_id.clone(), e.to_string()));
            Vec::new()
        }
    };
    trace.push(format!("list_events => {} ev", events.len()));
    let tasks = tasks_from_events(&events)?;
    trace.push(format!("tasks => {}", tasks.len()));

    let listing = list_events_multi(reader, &options.busy_calendars, &range).await;
    for (calendar_id, error) in &listing.failed {
        trace.push(format!("busy calendar {calendar_id} skipped: {error}"));
    }
    skipped.extend(listing.failed);
    let mut busy = BusyIndex::new();
    for (calendar_id, events) in &listing.events {
        busy = busy.with_events(calendar_id, events)?;
    }
    trace.push(format!("busy intervals => {}", busy.len()));

    Ok(Inputs {
        range,
        today,
        tasks,
        busy,
        skipped,
    })
}

/// Schedule gathered inputs at `now`.
pub fn plan(inputs: &Inputs, options: &RunOptions, now: DateTime<Utc>) -> VendoResult<Schedule> {
    let tz = options.timezone;
    let scheduler = Scheduler::new(SchedulerOptions {
        timezone: tz,
        working_hours: options.working_hours,
        freeze_window: days_duration("freeze_days", options.freeze_days)?,
        first_day: inputs.range.first_day(tz).max(inputs.today),
        horizon_end: inputs.range.to,
        not_before: Some(now),
    })?;

    Ok(scheduler.schedule(&inputs.tasks, inputs.busy.clone(), now))
}

/// Run the whole cycle once.
pub async fn run(
    reader: &dyn CalendarRead,
    writer: &dyn CalendarWrite,
    sink: Option<&dyn RunLogSink>,
    options: &RunOptions,
    now: DateTime<Utc>,
) -> VendoResult<RunResult> {
    let run_id = new_run_id();
    info!(run = %run_id, dry_run = options.dry_run, "run started");

    let mut trace = vec![format!("run {run_id} start")];
    let inputs = gather(reader, options, now, &mut trace).await?;
    let schedule = plan(&inputs, options, now)?;
    trace.extend(schedule.trace.iter().cloned());

    let palette = &options.palette;
    let colors: Vec<ColorAssignment> = inputs
        .tasks
        .iter()
        .map(|task| {
            let color = TaskColor::classify(task, inputs.today);
            ColorAssignment {
                event_id: task.event_id.clone(),
                summary: task.summary.clone(),
                color,
                color_id: palette.id(color).to_string(),
            }
        })
        .collect();

    let mut actions = plan_actions(&schedule, palette, inputs.today, &mut trace);
    info!(
        run = %run_id,
        placed = schedule.placed.len(),
        frozen = schedule.frozen.len(),
        unschedulable = schedule.unschedulable.len(),
        actions = actions.len(),
        "schedule ready"
    );

    if !options.dry_run {
        execute(writer, &options.calendar_id, &mut actions, &mut trace).await;
    }

    let snapshot_before: Vec<TaskSnapshot> = inputs.tasks.iter().map(TaskSnapshot::from).collect();
    let snapshot_after = apply_to_snapshot(&snapshot_before, &actions);
    trace.push(format!("run {run_id} end"));

    let result = RunResult {
        run_id,
        started_at: now,
        dry_run: options.dry_run,
        snapshot_before,
        actions,
        snapshot_after,
        colors,
        plan: Plan::from(&schedule),
        trace,
    };

    if let Some(sink) = sink
        && let Err(e) = sink.record(&result)
    {
        warn!(run = %result.run_id, error = %e, "could not record run");
    }

    info!(
        run = %result.run_id,
        applied = result.applied(),
        failed = result.failed(),
        "run finished"
    );
    Ok(result)
}

/// Writes needed to bring the calendar in line with the schedule.
fn plan_actions(
    schedule: &Schedule,
    palette: &ColorPalette,
    today: NaiveDate,
    trace: &mut Vec<String>,
) -> Vec<ActionRecord> {
    let mut actions = Vec::new();

    for placement in &schedule.placed {
        let task = &placement.task;
        let draft = draft_for(task, placement.start, placement.end, palette, today);

        let unchanged = task.original_interval() == Some((placement.start, placement.end))
            && task.color_id.as_deref() == Some(draft.color_id.as_str());
        if unchanged {
            trace.push(format!("'{}' already in place", task.summary));
            continue;
        }

        let kind = if task.event_id.is_some() {
            ActionKind::Update
        } else {
            ActionKind::Create
        };
        actions.push(ActionRecord {
            position: placement.position,
            kind,
            event_id: task.event_id.clone(),
            draft,
            outcome: ActionOutcome::Planned,
        });
    }

    let kept = schedule
        .frozen
        .iter()
        .map(|f| (f.position, &f.task))
        .chain(schedule.unschedulable.iter().map(|u| (u.position, &u.task)));

    for (position, task) in kept {
        let (Some(event_id), Some((start, end))) = (&task.event_id, task.original_interval())
        else {
            continue;
        };
        let draft = draft_for(task, start, end, palette, today);
        if task.color_id.as_deref() == Some(draft.color_id.as_str()) {
            continue;
        }
        actions.push(ActionRecord {
            position,
            kind: ActionKind::RefreshColor,
            event_id: Some(event_id.clone()),
            draft,
            outcome: ActionOutcome::Planned,
        });
    }

    actions
}

fn draft_for(
    task: &Task,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    palette: &ColorPalette,
    today: NaiveDate,
) -> EventDraft {
    EventDraft {
        summary: task.summary.clone(),
        description: task.description.clone(),
        start,
        end,
        color_id: palette.color_for(task, today).to_string(),
    }
}

async fn execute(
    writer: &dyn CalendarWrite,
    calendar_id: &str,
    actions: &mut [ActionRecord],
    trace: &mut Vec<String>,
) {
    for action in actions.iter_mut() {
        let result = match (&action.kind, &action.event_id) {
            (ActionKind::Create, _) | (_, None) => {
                writer.create_event(calendar_id, &action.draft).await
            }
            (_, Some(event_id)) => {
                writer
                    .update_event_time(calendar_id, event_id, &action.draft)
                    .await
            }
        };

        action.outcome = match result {
            Ok(event) => {
                trace.push(format!("{:?} '{}' ok", action.kind, action.draft.summary));
                ActionOutcome::Applied { event_id: event.id }
            }
            Err(e) => {
                warn!(task = %action.draft.summary, error = %e, "write failed");
                trace.push(format!(
                    "{:?} '{}' failed: {}",
                    action.kind, action.draft.summary, e
                ));
                ActionOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
    }
}

/// Calendar state after the applied actions. Planned and failed ones
/// change nothing.
fn apply_to_snapshot(before: &[TaskSnapshot], actions: &[ActionRecord]) -> Vec<TaskSnapshot> {
    let mut after = before.to_vec();
    for action in actions {
        let ActionOutcome::Applied { event_id } = &action.outcome else {
            continue;
        };
        let updated = TaskSnapshot {
            event_id: Some(event_id.clone()),
            summary: action.draft.summary.clone(),
            start: Some(action.draft.start),
            end: Some(action.draft.end),
            color_id: Some(action.draft.color_id.clone()),
        };
        match after.get_mut(action.position) {
            Some(slot) => *slot = updated,
            None => warn!(position = action.position, "action refers to no task"),
        }
    }
    after
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VendoError;
    use crate::event::EventTime;
    use chrono::TimeZone;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCalendar {
        events: HashMap<String, Vec<Event>>,
        broken_calendars: HashSet<String>,
        broken_events: HashSet<String>,
        writes: Mutex<Vec<String>>,
    }

    impl FakeCalendar {
        fn with(mut self, calendar: &str, events: Vec<Event>) -> Self {
            self.events.insert(calendar.to_string(), events);
            self
        }

        fn writes(&self) -> Vec<String> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CalendarRead for FakeCalendar {
        async fn list_events(&self, calendar_id: &str, _range: &DateRange) -> VendoResult<Vec<Event>> {
            if self.broken_calendars.contains(calendar_id) {
                return Err(VendoError::Provider(format!("{calendar_id} unavailable")));
            }
            Ok(self.events.get(calendar_id).cloned().unwrap_or_default())
        }
    }

    #[async_trait]
    impl CalendarWrite for FakeCalendar {
        async fn create_event(&self, calendar_id: &str, draft: &EventDraft) -> VendoResult<Event> {
            self.writes
                .lock()
                .unwrap()
                .push(format!("create {calendar_id} {}", draft.summary));
            Ok(draft.to_event("new-id"))
        }

        async fn update_event_time(
            &self,
            calendar_id: &str,
            event_id: &str,
            draft: &EventDraft,
        ) -> VendoResult<Event> {
            if self.broken_events.contains(event_id) {
                return Err(VendoError::Provider("rate limited".into()));
            }
            self.writes.lock().unwrap().push(format!(
                "update {calendar_id} {event_id} {} {}",
                draft.start.format("%H:%M"),
                draft.color_id
            ));
            Ok(draft.to_event(event_id))
        }
    }

    struct BrokenSink;

    impl RunLogSink for BrokenSink {
        fn record(&self, _result: &RunResult) -> VendoResult<()> {
            Err(VendoError::RunLog("disk full".into()))
        }
    }

    #[derive(Default)]
    struct MemorySink(Mutex<Vec<String>>);

    impl RunLogSink for MemorySink {
        fn record(&self, result: &RunResult) -> VendoResult<()> {
            self.0.lock().unwrap().push(result.run_id.clone());
            Ok(())
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, h, m, 0).unwrap()
    }

    fn event(id: &str, description: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event {
            id: id.to_string(),
            summary: format!("task {id}"),
            description: Some(description.to_string()),
            start: EventTime::DateTime(start),
            end: EventTime::DateTime(end),
            color_id: Some("5".into()),
        }
    }

    fn options() -> RunOptions {
        RunOptions {
            timezone: Tz::UTC,
            freeze_days: 0,
            lookback_days: 1,
            lookahead_days: 3,
            ..RunOptions::default()
        }
    }

    // 07:00 on the fixture day, before working hours start.
    fn now() -> DateTime<Utc> {
        at(7, 0)
    }

    #[tokio::test]
    async fn moves_tasks_into_free_time() {
        let calendar = FakeCalendar::default().with(
            "primary",
            vec![
                event("b", "#vendo #priority2", at(14, 0), at(15, 0)),
                event("a", "#vendo #priority1", at(12, 0), at(13, 0)),
                event("m", "standup", at(8, 0), at(8, 30)),
            ],
        );

        let result = run(&calendar, &calendar, None, &options(), now()).await.unwrap();

        assert_eq!(
            calendar.writes(),
            vec!["update primary a 08:30 5", "update primary b 09:30 5"]
        );
        assert_eq!(result.applied(), 2);
        assert_eq!(result.snapshot_before[0].start, Some(at(14, 0)));
        assert_eq!(result.snapshot_after[0].start, Some(at(9, 30)));
        assert_eq!(result.run_id.len(), 8);
        assert!(result.trace[0].starts_with("run "));
    }

    #[tokio::test]
    async fn dry_run_plans_without_writing() {
        let calendar =
            FakeCalendar::default().with("primary", vec![event("a", "#vendo", at(12, 0), at(13, 0))]);
        let opts = RunOptions {
            dry_run: true,
            ..options()
        };

        let result = run(&calendar, &calendar, None, &opts, now()).await.unwrap();

        assert!(calendar.writes().is_empty());
        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions[0].outcome, ActionOutcome::Planned);
        assert_eq!(result.snapshot_after, result.snapshot_before);
        assert_eq!(result.plan.placed[0].start, Some(at(8, 0)));
    }

    #[tokio::test]
    async fn task_already_in_place_needs_no_write() {
        let calendar =
            FakeCalendar::default().with("primary", vec![event("a", "#vendo", at(8, 0), at(9, 0))]);

        let result = run(&calendar, &calendar, None, &options(), now()).await.unwrap();

        assert!(result.actions.is_empty());
        assert!(calendar.writes().is_empty());
        assert!(result.trace.iter().any(|t| t.contains("already in place")));
    }

    #[tokio::test]
    async fn frozen_task_only_gets_its_color_refreshed() {
        let opts = RunOptions {
            freeze_days: 1,
            ..options()
        };
        let calendar = FakeCalendar::default()
            .with("primary", vec![event("d", "#vendo #done", at(10, 0), at(11, 0))]);

        let result = run(&calendar, &calendar, None, &opts, now()).await.unwrap();

        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions[0].kind, ActionKind::RefreshColor);
        assert_eq!(calendar.writes(), vec!["update primary d 10:00 8"]);
        assert_eq!(result.colors[0].color, TaskColor::Done);
    }

    #[tokio::test]
    async fn task_without_id_is_created() {
        let calendar =
            FakeCalendar::default().with("primary", vec![event("", "#vendo", at(12, 0), at(13, 0))]);

        let result = run(&calendar, &calendar, None, &options(), now()).await.unwrap();

        assert_eq!(result.actions[0].kind, ActionKind::Create);
        assert_eq!(calendar.writes(), vec!["create primary task "]);
        assert_eq!(
            result.actions[0].outcome,
            ActionOutcome::Applied {
                event_id: "new-id".into()
            }
        );
        assert_eq!(result.snapshot_after.len(), result.snapshot_before.len());
        assert_eq!(result.snapshot_after[0].event_id.as_deref(), Some("new-id"));
        assert_eq!(result.snapshot_after[0].start, Some(at(8, 0)));
    }

    #[tokio::test]
    async fn created_task_replaces_its_own_snapshot_entry() {
        let calendar = FakeCalendar::default().with(
            "primary",
            vec![
                event("a", "#vendo #priority1", at(8, 0), at(9, 0)),
                event("", "#vendo #priority2", at(12, 0), at(13, 0)),
            ],
        );

        let result = run(&calendar, &calendar, None, &options(), now()).await.unwrap();

        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions[0].position, 1);
        assert_eq!(result.snapshot_after.len(), 2);
        assert_eq!(result.snapshot_after[0], result.snapshot_before[0]);
        assert_eq!(result.snapshot_after[1].event_id.as_deref(), Some("new-id"));
        assert_eq!(result.snapshot_after[1].start, Some(at(9, 0)));
    }

    #[tokio::test]
    async fn unschedulable_task_gets_its_color_refreshed() {
        let calendar = FakeCalendar::default().with(
            "primary",
            vec![event("u", "#vendo #time 10h #due2025-03-01", at(12, 0), at(13, 0))],
        );

        let result = run(&calendar, &calendar, None, &options(), now()).await.unwrap();

        assert_eq!(result.plan.unschedulable.len(), 1);
        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions[0].kind, ActionKind::RefreshColor);
        assert_eq!((result.actions[0].draft.start, result.actions[0].draft.end), (at(12, 0), at(13, 0)));
        assert_eq!(calendar.writes(), vec!["update primary u 12:00 11"]);
        assert_eq!(result.snapshot_after[0].color_id.as_deref(), Some("11"));
    }

    #[tokio::test]
    async fn failed_write_is_recorded_and_batch_continues() {
        let mut calendar = FakeCalendar::default().with(
            "primary",
            vec![
                event("a", "#vendo #priority1", at(12, 0), at(13, 0)),
                event("b", "#vendo #priority2", at(14, 0), at(15, 0)),
            ],
        );
        calendar.broken_events.insert("a".into());

        let result = run(&calendar, &calendar, None, &options(), now()).await.unwrap();

        assert_eq!(result.failed(), 1);
        assert_eq!(result.applied(), 1);
        assert_eq!(calendar.writes(), vec!["update primary b 09:00 5"]);
        assert!(result.trace.iter().any(|t| t.contains("failed: Provider error: rate limited")));
        // The failed task stays where it was.
        assert_eq!(result.snapshot_after[0].start, Some(at(12, 0)));
    }

    #[tokio::test]
    async fn unreadable_busy_calendar_is_skipped() {
        let mut calendar = FakeCalendar::default()
            .with("primary", vec![event("a", "#vendo", at(12, 0), at(13, 0))]);
        calendar.broken_calendars.insert("team".into());
        let opts = RunOptions {
            busy_calendars: vec!["team".into(), "primary".into()],
            ..options()
        };

        let result = run(&calendar, &calendar, None, &opts, now()).await.unwrap();

        assert_eq!(result.applied(), 1);
        assert!(result.trace.iter().any(|t| t.starts_with("busy calendar team skipped")));
    }

    #[tokio::test]
    async fn gather_reports_skipped_calendars() {
        let mut calendar = FakeCalendar::default()
            .with("primary", vec![event("a", "#vendo", at(12, 0), at(13, 0))]);
        calendar.broken_calendars.insert("team".into());
        let opts = RunOptions {
            busy_calendars: vec!["primary".into(), "team".into()],
            ..options()
        };

        let mut trace = Vec::new();
        let inputs = gather(&calendar, &opts, now(), &mut trace).await.unwrap();

        assert_eq!(inputs.tasks.len(), 1);
        assert_eq!(inputs.skipped.len(), 1);
        assert_eq!(inputs.skipped[0].0, "team");
        assert!(inputs.skipped[0].1.contains("team unavailable"));
    }

    #[tokio::test]
    async fn unreadable_target_calendar_yields_empty_run() {
        let mut calendar = FakeCalendar::default();
        calendar.broken_calendars.insert("primary".into());

        let result = run(&calendar, &calendar, None, &options(), now()).await.unwrap();

        assert!(result.snapshot_before.is_empty());
        assert!(result.actions.is_empty());
    }

    #[tokio::test]
    async fn reversed_vendor_event_aborts_the_run() {
        let calendar =
            FakeCalendar::default().with("primary", vec![event("a", "#vendo", at(13, 0), at(12, 0))]);

        let err = run(&calendar, &calendar, None, &options(), now()).await.unwrap_err();

        assert!(matches!(err, VendoError::Invariant(_)));
    }

    #[tokio::test]
    async fn run_is_handed_to_the_sink() {
        let calendar = FakeCalendar::default();
        let sink = MemorySink::default();

        let result = run(&calendar, &calendar, Some(&sink), &options(), now()).await.unwrap();

        assert_eq!(*sink.0.lock().unwrap(), vec![result.run_id]);
    }

    #[tokio::test]
    async fn failing_sink_does_not_fail_the_run() {
        let calendar = FakeCalendar::default();
        assert!(run(&calendar, &calendar, Some(&BrokenSink), &options(), now())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn list_events_multi_keeps_calendar_order() {
        let mut calendar = FakeCalendar::default()
            .with("a", vec![event("1", "", at(9, 0), at(10, 0))])
            .with("c", vec![]);
        calendar.broken_calendars.insert("b".into());
        let range = DateRange::new(at(0, 0), at(23, 0)).unwrap();

        let listing =
            list_events_multi(&calendar, &["a".into(), "b".into(), "c".into()], &range).await;

        let ids: Vec<_> = listing.events.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(listing.failed[0].0, "b");
    }
}
