//! Greedy earliest-fit placement of vendor tasks into working hours.
//!
//! A run goes through three stages:
//!
//! 1. **Partition.** Done tasks and tasks already arranged within the freeze
//!    window around "now" are frozen. Their intervals stay exactly as they are
//!    and become obstacles for everybody else.
//! 2. **Order.** Movable tasks are sorted by priority (absent last), then due
//!    date (absent last), then their original order.
//! 3. **Walk.** A single cursor moves forward through working hours. Each
//!    task takes the earliest gap at or after the cursor that fits it whole
//!    within one working day, and the cursor moves to the end of that gap. A
//!    task that finds no gap before the horizon is reported unschedulable and
//!    the walk continues from the same cursor.
//!
//! Every task ends in exactly one of [`TaskState::Frozen`],
//! [`TaskState::Placed`] or [`TaskState::Unschedulable`]. The same input
//! always yields the same schedule.

use chrono::{
    DateTime, Datelike, Duration, DurationRound, NaiveDate, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use crate::busy::{BusyIndex, BusyInterval};
use crate::date_range::local_midnight;
use crate::error::{VendoError, VendoResult};
use crate::task::Task;

/// Granularity the walk start is rounded up to when it begins at "now".
pub const SLOT: Duration = Duration::minutes(5);

/// Daily window in which tasks may be placed, in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    #[serde(default)]
    pub skip_weekends: bool,
}

impl Default for WorkingHours {
    fn default() -> Self {
        WorkingHours {
            start: NaiveTime::MIN + Duration::hours(8),
            end: NaiveTime::MIN + Duration::hours(16),
            skip_weekends: false,
        }
    }
}

impl WorkingHours {
    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    fn is_working_day(&self, day: NaiveDate) -> bool {
        !(self.skip_weekends && matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub timezone: Tz,
    pub working_hours: WorkingHours,
    /// Arranged tasks starting within this distance of "now" are frozen.
    pub freeze_window: Duration,
    /// Local date on which the walk begins.
    pub first_day: NaiveDate,
    /// Nothing may end after this instant.
    pub horizon_end: DateTime<Utc>,
    /// The walk never starts before this instant (rounded up to [`SLOT`]).
    pub not_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Frozen,
    Placed,
    Unschedulable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezeReason {
    Done,
    RecentlyArranged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Index of the task in the scheduler input
    pub position: usize,
    pub task: Task,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenTask {
    pub position: usize,
    pub task: Task,
    pub reason: FreezeReason,
    /// Original interval, untouched. Done tasks may not have one.
    pub interval: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unschedulable {
    pub position: usize,
    pub task: Task,
    pub reason: String,
}

/// Output of one scheduling pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schedule {
    /// In placement order
    pub placed: Vec<Placement>,
    pub frozen: Vec<FrozenTask>,
    pub unschedulable: Vec<Unschedulable>,
    /// Final state of each input task, by input position
    pub states: Vec<TaskState>,
    pub trace: Vec<String>,
}

enum Step {
    Placed(Placement),
    Unschedulable(String),
}

pub struct Scheduler {
    options: SchedulerOptions,
}

impl Scheduler {
    pub fn new(options: SchedulerOptions) -> VendoResult<Self> {
        let hours = &options.working_hours;
        if hours.start >= hours.end {
            return Err(VendoError::Config(format!(
                "working day must start before it ends ({} .. {})",
                hours.start, hours.end
            )));
        }
        if options.freeze_window < Duration::zero() {
            return Err(VendoError::Config("freeze window cannot be negative".into()));
        }
        Ok(Scheduler { options })
    }

    /// Place `tasks` around the busy time in `busy`.
    pub fn schedule(&self, tasks: &[Task], busy: BusyIndex, now: DateTime<Utc>) -> Schedule {
        let mut schedule = Schedule {
            states: vec![TaskState::Pending; tasks.len()],
            ..Schedule::default()
        };
        let mut busy = busy;

        // Partition
        let mut movable = Vec::new();
        for (position, task) in tasks.iter().enumerate() {
            let Some(reason) = self.freeze_reason(task, now) else {
                movable.push(position);
                continue;
            };

            let interval = task.original_interval();
            if let Some((start, end)) = interval
                && let Ok(obstacle) = BusyInterval::new(start, end, format!("frozen:{}", task.summary))
            {
                busy = busy.with(obstacle);
            }

            schedule.trace.push(format!(
                "frozen '{}' ({}){}",
                task.summary,
                match reason {
                    FreezeReason::Done => "done",
                    FreezeReason::RecentlyArranged => "recently arranged",
                },
                interval
                    .map(|(s, e)| format!(" keeps {}", self.describe(s, e)))
                    .unwrap_or_default()
            ));
            schedule.states[position] = TaskState::Frozen;
            schedule.frozen.push(FrozenTask {
                position,
                task: task.clone(),
                reason,
                interval,
            });
        }

        // Order
        movable.sort_by(|&a, &b| placement_order(&tasks[a], &tasks[b]));

        // Walk
        let mut cursor = self.walk_start();
        for position in movable {
            let task = &tasks[position];
            let (step, next) = self.step(position, task, cursor, busy);
            busy = next;

            match step {
                Step::Placed(placement) => {
                    debug!(task = %task.summary, start = %placement.start, end = %placement.end, "placed");
                    schedule.trace.push(format!(
                        "placed '{}' at {}",
                        task.summary,
                        self.describe(placement.start, placement.end)
                    ));
                    cursor = placement.end;
                    schedule.states[position] = TaskState::Placed;
                    schedule.placed.push(placement);
                }
                Step::Unschedulable(reason) => {
                    debug!(task = %task.summary, %reason, "unschedulable");
                    schedule
                        .trace
                        .push(format!("unschedulable '{}': {}", task.summary, reason));
                    schedule.states[position] = TaskState::Unschedulable;
                    schedule.unschedulable.push(Unschedulable {
                        position,
                        task: task.clone(),
                        reason,
                    });
                }
            }
        }

        schedule
    }

    fn freeze_reason(&self, task: &Task, now: DateTime<Utc>) -> Option<FreezeReason> {
        if task.is_done {
            return Some(FreezeReason::Done);
        }
        let start = task.original_start?;
        let distance = if start >= now { start - now } else { now - start };
        (distance <= self.options.freeze_window).then_some(FreezeReason::RecentlyArranged)
    }

    /// Place one task, returning the outcome and the updated index.
    fn step(
        &self,
        position: usize,
        task: &Task,
        cursor: DateTime<Utc>,
        busy: BusyIndex,
    ) -> (Step, BusyIndex) {
        let duration = task.duration();
        let day_length = self.options.working_hours.length();

        if duration > day_length {
            let reason = format!(
                "needs {} min, longer than the {} min working day",
                duration.num_minutes(),
                day_length.num_minutes()
            );
            return (Step::Unschedulable(reason), busy);
        }

        let Some(start) = self.find_slot(&busy, cursor, duration) else {
            let reason = format!(
                "no free {} min slot before {}",
                duration.num_minutes(),
                self.local_label(self.options.horizon_end)
            );
            return (Step::Unschedulable(reason), busy);
        };

        let end = start + duration;
        let interval = match BusyInterval::new(start, end, format!("placed:{}", task.summary)) {
            Ok(interval) => interval,
            Err(e) => return (Step::Unschedulable(e.to_string()), busy),
        };
        let busy = busy.with(interval);

        let placement = Placement {
            position,
            task: task.clone(),
            start,
            end,
        };
        (Step::Placed(placement), busy)
    }

    /// Earliest start at or after `cursor` where `duration` fits inside one
    /// working day without touching busy time.
    fn find_slot(
        &self,
        busy: &BusyIndex,
        cursor: DateTime<Utc>,
        duration: Duration,
    ) -> Option<DateTime<Utc>> {
        let horizon_end = self.options.horizon_end;
        let mut day = cursor
            .with_timezone(&self.options.timezone)
            .date_naive()
            .max(self.options.first_day);

        loop {
            if self.options.working_hours.is_working_day(day)
                && let Some((day_start, day_end)) = self.day_bounds(day)
            {
                if day_start >= horizon_end {
                    return None;
                }

                let mut start = cursor.max(day_start);
                loop {
                    let end = start + duration;
                    if end > day_end || end > horizon_end {
                        break;
                    }
                    match busy.conflict_end(start, end) {
                        Some(free_at) => start = free_at,
                        None => return Some(start),
                    }
                }
            } else if local_midnight(self.options.timezone, day) >= horizon_end {
                return None;
            }

            day = day.succ_opt()?;
        }
    }

    /// Working window of a local day, as instants.
    fn day_bounds(&self, day: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let hours = &self.options.working_hours;
        let start = self.local(day, hours.start)?;
        let end = self.local(day, hours.end)?;
        (start < end).then_some((start, end))
    }

    fn local(&self, day: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        self.options
            .timezone
            .from_local_datetime(&day.and_time(time))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn walk_start(&self) -> DateTime<Utc> {
        let first_day = self.options.first_day;
        let start = self
            .local(first_day, self.options.working_hours.start)
            .unwrap_or_else(|| first_day.and_time(self.options.working_hours.start).and_utc());

        match self.options.not_before {
            Some(now) if now > start => round_up_to_slot(now),
            _ => start,
        }
    }

    fn describe(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        let tz = self.options.timezone;
        format!(
            "{}-{}",
            start.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
            end.with_timezone(&tz).format("%H:%M")
        )
    }

    fn local_label(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.options.timezone)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}

/// Priority ascending, then due date ascending; absent values sort last.
/// `sort_by` is stable, so remaining ties keep the original order.
fn placement_order(a: &Task, b: &Task) -> Ordering {
    none_last(a.priority, b.priority).then_with(|| none_last(a.due_date, b.due_date))
}

fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn round_up_to_slot(instant: DateTime<Utc>) -> DateTime<Utc> {
    match instant.duration_trunc(SLOT) {
        Ok(floor) if floor == instant => instant,
        Ok(floor) => floor + SLOT,
        Err(_) => instant,
    }
}
