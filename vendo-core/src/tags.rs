//! Tag grammar for vendor task descriptions.
//!
//! A description such as `"Invoice batch #vendo #priority2 #time 1.5h #due2025-03-01"`
//! is turned into [`Tags`]. Markers are matched case-insensitively anywhere in
//! the text. Valued tags are described by a small rule table; each rule is
//! optional and independent, and for every field the first occurrence (left to
//! right) whose value converts cleanly wins. Anything malformed is reported as
//! absent, never as an error.

use chrono::{Duration, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// Marks an event as a vendor task.
pub const VENDO_MARKER: &str = "#vendo";

/// Marks a vendor task as finished.
pub const DONE_MARKER: &str = "#done";

/// Attributes extracted from one description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    pub vendo: bool,
    pub done: bool,
    pub priority: Option<u32>,
    pub duration: Option<Duration>,
    pub due: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Priority,
    Time,
    Due,
}

struct TagRule {
    field: Field,
    pattern: Regex,
}

// Patterns run against the lowercased description.
static RULES: LazyLock<Vec<TagRule>> = LazyLock::new(|| {
    [
        (Field::Priority, r"#priority(\d+)"),
        (Field::Time, r"#time\s*:?\s*(\d+(?:\.\d+)?h|\d+min)"),
        (Field::Due, r"#due(\d{4}-\d{2}-\d{2})"),
    ]
    .into_iter()
    .map(|(field, pattern)| TagRule {
        field,
        pattern: Regex::new(pattern).expect("tag pattern must compile"),
    })
    .collect()
});

/// Whether the description carries the vendor marker.
pub fn has_vendo_marker(description: &str) -> bool {
    description.to_lowercase().contains(VENDO_MARKER)
}

/// Extract every tag from a description. Total: never fails.
pub fn parse_tags(description: &str) -> Tags {
    let lower = description.to_lowercase();

    let mut tags = Tags {
        vendo: lower.contains(VENDO_MARKER),
        done: lower.contains(DONE_MARKER),
        ..Tags::default()
    };

    for rule in RULES.iter() {
        let mut values = rule
            .pattern
            .captures_iter(&lower)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str());

        match rule.field {
            Field::Priority => tags.priority = values.find_map(parse_priority),
            Field::Time => tags.duration = values.find_map(parse_duration),
            Field::Due => tags.due = values.find_map(parse_due),
        }
    }

    tags
}

fn parse_priority(value: &str) -> Option<u32> {
    value.parse().ok()
}

/// `"1.5h"` or `"90min"`. Non-positive durations count as malformed.
fn parse_duration(value: &str) -> Option<Duration> {
    let minutes = if let Some(hours) = value.strip_suffix('h') {
        let hours: f64 = hours.parse().ok()?;
        let minutes = (hours * 60.0).round();
        if !minutes.is_finite() || minutes > i64::MAX as f64 {
            return None;
        }
        minutes as i64
    } else {
        value.strip_suffix("min")?.parse::<i64>().ok()?
    };

    if minutes <= 0 {
        return None;
    }
    Duration::try_minutes(minutes)
}

fn parse_due(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
