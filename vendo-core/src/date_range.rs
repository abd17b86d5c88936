//! Date range used to query calendars.

use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{VendoError, VendoResult};

/// Half-open `[from, to)` query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> VendoResult<Self> {
        if from > to {
            return Err(VendoError::Invariant(format!(
                "date range starts at {from} after it ends at {to}"
            )));
        }
        Ok(DateRange { from, to })
    }

    /// Whole local days from `today - lookback` through `today + lookahead`.
    ///
    /// `from` is local midnight of the first day, `to` local midnight after
    /// the last one.
    pub fn around(tz: Tz, today: NaiveDate, lookback: u32, lookahead: u32) -> VendoResult<Self> {
        let first = today
            .checked_sub_days(Days::new(u64::from(lookback)))
            .ok_or_else(|| out_of_range("lookback_days", lookback))?;
        let after_last = today
            .checked_add_days(Days::new(u64::from(lookahead) + 1))
            .ok_or_else(|| out_of_range("lookahead_days", lookahead))?;

        DateRange::new(local_midnight(tz, first), local_midnight(tz, after_last))
    }

    /// From `now` over the next `days` days.
    pub fn upcoming(now: DateTime<Utc>, days: u32) -> VendoResult<Self> {
        let to = now
            .checked_add_signed(days_duration("days", days)?)
            .ok_or_else(|| out_of_range("days", days))?;
        Ok(DateRange { from: now, to })
    }

    /// Local date of the first day in the range.
    pub fn first_day(&self, tz: Tz) -> NaiveDate {
        self.from.with_timezone(&tz).date_naive()
    }

    pub fn from_rfc3339(&self) -> String {
        self.from.to_rfc3339()
    }

    pub fn to_rfc3339(&self) -> String {
        self.to.to_rfc3339()
    }
}

/// `days` whole days as a `Duration`, rejecting counts it cannot hold.
pub fn days_duration(key: &str, days: u32) -> VendoResult<Duration> {
    Duration::try_days(i64::from(days)).ok_or_else(|| out_of_range(key, days))
}

fn out_of_range(key: &str, days: u32) -> VendoError {
    VendoError::Config(format!("{key} = {days} reaches past the supported date range"))
}

/// Start of `day` in `tz`. Falls back to UTC midnight if the local
/// midnight does not exist.
pub fn local_midnight(tz: Tz, day: NaiveDate) -> DateTime<Utc> {
    let naive = day.and_time(chrono::NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}
