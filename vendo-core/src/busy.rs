//! Busy time collected from the monitored calendars.
//!
//! The index keeps every interval it was given (for diagnostics) and a
//! sorted list of merged, disjoint blocks that answers overlap queries with a
//! binary search. It is immutable per step: [`BusyIndex::with`] consumes the
//! index and returns the updated one, so the scheduler threads it through
//! its loop instead of sharing a mutable collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{VendoError, VendoResult};
use crate::event::Event;
use crate::tags::has_vendo_marker;

/// A half-open `[start, end)` range occupied on a source calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source: String,
}

impl BusyInterval {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source: impl Into<String>,
    ) -> VendoResult<Self> {
        let source = source.into();
        if start >= end {
            return Err(VendoError::Invariant(format!(
                "busy interval on '{}' must start before it ends ({} .. {})",
                source, start, end
            )));
        }
        Ok(BusyInterval { start, end, source })
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

#[derive(Debug, Clone, Default)]
pub struct BusyIndex {
    intervals: Vec<BusyInterval>,
    /// Merged, sorted and pairwise disjoint
    blocks: Vec<(DateTime<Utc>, DateTime<Utc>)>,
}

impl BusyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the non-vendor, timed events of one calendar.
    pub fn from_events(source: &str, events: &[Event]) -> VendoResult<Self> {
        Self::new().with_events(source, events)
    }

    /// Add the non-vendor, timed events of one calendar.
    ///
    /// Vendor tasks are placed by the scheduler, so they never count as
    /// obstacles here. All-day and zero-length events are skipped; a timed
    /// event that ends before it starts is an invariant violation.
    pub fn with_events(mut self, source: &str, events: &[Event]) -> VendoResult<Self> {
        for event in events {
            if has_vendo_marker(event.description_text()) {
                continue;
            }

            let Some((start, end)) = event.timed_range() else {
                debug!(event = %event.summary, calendar = source, "skipping all-day event");
                continue;
            };

            if start == end {
                debug!(event = %event.summary, calendar = source, "skipping zero-length event");
                continue;
            }

            self = self.with(BusyInterval::new(start, end, source)?);
        }
        Ok(self)
    }

    /// Return the index with one more interval.
    pub fn with(mut self, interval: BusyInterval) -> Self {
        let (start, end) = (interval.start, interval.end);

        // Blocks touching or overlapping [start, end] collapse into one.
        let first = self.blocks.partition_point(|b| b.1 < start);
        let last = self.blocks.partition_point(|b| b.0 <= end);

        let merged = if first < last {
            (start.min(self.blocks[first].0), end.max(self.blocks[last - 1].1))
        } else {
            (start, end)
        };
        self.blocks.splice(first..last, [merged]);
        self.intervals.push(interval);
        self
    }

    /// Every interval added so far, in insertion order.
    pub fn intervals(&self) -> &[BusyInterval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.conflict_end(start, end).is_some()
    }

    /// End of the first busy block overlapping `[start, end)`, if any.
    ///
    /// Blocks are merged, so nothing is free before the returned instant
    /// once a conflict starts at or before `start`.
    pub fn conflict_end(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let i = self.blocks.partition_point(|b| b.1 <= start);
        self.blocks
            .get(i)
            .filter(|b| b.0 < end)
            .map(|b| b.1)
    }

    /// Reference implementation of [`BusyIndex::overlaps`] by linear scan.
    pub fn overlaps_linear(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.intervals.iter().any(|i| i.overlaps(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventTime;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, h, m, 0).unwrap()
    }

    fn iv(s: DateTime<Utc>, e: DateTime<Utc>) -> BusyInterval {
        BusyInterval::new(s, e, "primary").unwrap()
    }

    fn timed(summary: &str, description: &str, s: DateTime<Utc>, e: DateTime<Utc>) -> Event {
        Event {
            id: summary.to_string(),
            summary: summary.to_string(),
            description: Some(description.to_string()),
            start: EventTime::DateTime(s),
            end: EventTime::DateTime(e),
            color_id: None,
        }
    }

    #[test]
    fn interval_requires_start_before_end() {
        assert!(BusyInterval::new(t(9, 0), t(9, 0), "x").is_err());
        assert!(BusyInterval::new(t(10, 0), t(9, 0), "x").is_err());
    }

    #[test]
    fn half_open_edges_do_not_overlap() {
        let index = BusyIndex::new().with(iv(t(9, 0), t(10, 0)));
        assert!(!index.overlaps(t(8, 0), t(9, 0)));
        assert!(!index.overlaps(t(10, 0), t(11, 0)));
        assert!(index.overlaps(t(9, 59), t(10, 30)));
        assert!(index.overlaps(t(8, 0), t(12, 0)));
    }

    #[test]
    fn conflict_end_jumps_past_merged_blocks() {
        let index = BusyIndex::new()
            .with(iv(t(9, 0), t(10, 0)))
            .with(iv(t(9, 30), t(11, 0)))
            .with(iv(t(11, 0), t(11, 15)));

        assert_eq!(index.conflict_end(t(9, 45), t(10, 45)), Some(t(11, 15)));
        assert_eq!(index.conflict_end(t(11, 15), t(12, 0)), None);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn insertion_keeps_blocks_sorted_and_disjoint() {
        let index = BusyIndex::new()
            .with(iv(t(14, 0), t(15, 0)))
            .with(iv(t(8, 0), t(9, 0)))
            .with(iv(t(11, 0), t(12, 0)))
            .with(iv(t(8, 30), t(11, 30)));

        assert_eq!(index.blocks, vec![(t(8, 0), t(12, 0)), (t(14, 0), t(15, 0))]);
    }

    #[test]
    fn binary_search_agrees_with_linear_scan() {
        let index = [(8, 0, 8, 45), (9, 10, 9, 20), (9, 15, 10, 5), (13, 0, 13, 30), (15, 55, 16, 0)]
            .into_iter()
            .fold(BusyIndex::new(), |index, (sh, sm, eh, em)| {
                index.with(iv(t(sh, sm), t(eh, em)))
            });

        let mut start = t(7, 0);
        while start < t(17, 0) {
            for minutes in [5, 20, 60, 150] {
                let end = start + Duration::minutes(minutes);
                assert_eq!(
                    index.overlaps(start, end),
                    index.overlaps_linear(start, end),
                    "mismatch for {start} .. {end}"
                );
            }
            start += Duration::minutes(5);
        }
    }

    #[test]
    fn from_events_skips_vendor_all_day_and_zero_length() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let events = vec![
            timed("meeting", "weekly sync", t(9, 0), t(10, 0)),
            timed("task", "report #Vendo", t(10, 0), t(11, 0)),
            timed("reminder", "", t(12, 0), t(12, 0)),
            Event {
                id: "holiday".into(),
                summary: "holiday".into(),
                description: None,
                start: EventTime::Date(day),
                end: EventTime::Date(day.succ_opt().unwrap()),
                color_id: None,
            },
        ];

        let index = BusyIndex::from_events("work", &events).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.intervals()[0].source, "work");
        assert!(index.overlaps(t(9, 30), t(9, 45)));
        assert!(!index.overlaps(t(10, 0), t(11, 0)));
    }

    #[test]
    fn from_events_rejects_reversed_event() {
        let events = vec![timed("broken", "", t(11, 0), t(10, 0))];
        assert!(matches!(
            BusyIndex::from_events("work", &events),
            Err(VendoError::Invariant(_))
        ));
    }
}
