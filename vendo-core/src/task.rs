//! Vendor tasks built from tagged calendar events.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{VendoError, VendoResult};
use crate::event::Event;
use crate::tags::parse_tags;

/// Estimated duration used when a task carries no `#time` tag.
pub const DEFAULT_DURATION: Duration = Duration::hours(1);

/// One vendor work item.
///
/// Tasks are snapshots: scheduling never changes them, it produces
/// placements that the orchestrator may write back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub event_id: Option<String>,
    pub summary: String,
    /// Raw description, kept verbatim so writes round-trip the tags.
    pub description: String,
    pub is_vendo: bool,
    pub is_done: bool,
    pub priority: Option<u32>,
    #[serde(default, with = "optional_minutes")]
    pub estimated_duration: Option<Duration>,
    pub due_date: Option<NaiveDate>,
    pub original_start: Option<DateTime<Utc>>,
    pub original_end: Option<DateTime<Utc>>,
    /// Color currently set on the calendar event
    pub color_id: Option<String>,
}

impl Task {
    /// Build a task from an event, or `None` when the event is not a vendor task.
    ///
    /// Fails only when the event's own timed range is reversed.
    pub fn from_event(event: &Event) -> VendoResult<Option<Task>> {
        let description = event.description_text();
        let tags = parse_tags(description);
        if !tags.vendo {
            return Ok(None);
        }

        let (original_start, original_end) = match event.timed_range() {
            Some((start, end)) if start > end => {
                return Err(VendoError::Invariant(format!(
                    "event '{}' ({}) ends at {} before it starts at {}",
                    event.summary, event.id, end, start
                )));
            }
            Some((start, end)) => (Some(start), Some(end)),
            None => (None, None),
        };

        Ok(Some(Task {
            event_id: (!event.id.is_empty()).then(|| event.id.clone()),
            summary: event.summary.clone(),
            description: description.to_string(),
            is_vendo: true,
            is_done: tags.done,
            priority: tags.priority,
            estimated_duration: tags.duration,
            due_date: tags.due,
            original_start,
            original_end,
            color_id: event.color_id.clone(),
        }))
    }

    /// Estimated duration, falling back to [`DEFAULT_DURATION`] when it is
    /// missing or not positive.
    pub fn duration(&self) -> Duration {
        self.estimated_duration
            .filter(|d| *d > Duration::zero())
            .unwrap_or(DEFAULT_DURATION)
    }

    /// The interval the task already occupies on the calendar, if any.
    pub fn original_interval(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.original_start?, self.original_end?))
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

/// Keep vendor events, in their original order, and turn them into tasks.
pub fn tasks_from_events(events: &[Event]) -> VendoResult<Vec<Task>> {
    let mut tasks = Vec::new();
    for event in events {
        if let Some(task) = Task::from_event(event)? {
            tasks.push(task);
        }
    }
    Ok(tasks)
}

mod optional_minutes {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.num_minutes()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let minutes: Option<i64> = Option::deserialize(d)?;
        Ok(minutes.and_then(Duration::try_minutes))
    }
}
