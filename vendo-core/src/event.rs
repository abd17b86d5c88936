//! Provider-neutral calendar event types.
//!
//! Providers convert their API responses into these types, and the rest of
//! vendo-core works exclusively with them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar event as read from (or written to) a calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    /// Provider color id currently set on the event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

impl Event {
    /// Description text, empty when the event has none.
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    /// Start and end as instants, if both are timed.
    pub fn timed_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.start.as_timed()?, self.end.as_timed()?))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

/// Full desired state of a vendor event, as written back by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub color_id: String,
}

impl EventDraft {
    /// The event this draft describes, under the given id.
    pub fn to_event(&self, id: &str) -> Event {
        Event {
            id: id.to_string(),
            summary: self.summary.clone(),
            description: Some(self.description.clone()),
            start: EventTime::DateTime(self.start),
            end: EventTime::DateTime(self.end),
            color_id: Some(self.color_id.clone()),
        }
    }
}

/// Either a timed instant or an all-day date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl EventTime {
    pub fn as_timed(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTime::DateTime(dt) => Some(*dt),
            EventTime::Date(_) => None,
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}
