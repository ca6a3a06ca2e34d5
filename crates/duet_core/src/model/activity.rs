//! Calendar day keys and the per-month activity map.

use chrono::{Datelike, Duration, LocalResult, NaiveDate, TimeZone};
use std::collections::BTreeMap;

/// Formats a date as its `YYYY-MM-DD` day key.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a strict `YYYY-MM-DD` day key.
pub fn parse_day_key(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Local calendar day of an epoch-millisecond timestamp in `tz`.
pub fn local_day_key<Tz: TimeZone>(tz: &Tz, epoch_ms: i64) -> Option<String> {
    let utc = chrono::DateTime::from_timestamp_millis(epoch_ms)?;
    Some(day_key(utc.with_timezone(tz).date_naive()))
}

/// Inclusive millisecond bounds of one local calendar interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MillisRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl MillisRange {
    /// First to last instant of the whole month. `month_index` is 0-based.
    pub fn month<Tz: TimeZone>(tz: &Tz, year: i32, month_index: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month_index.checked_add(1)?, 1)?;
        let next = if first.month() == 12 {
            NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, first.month() + 1, 1)?
        };
        Self::between(tz, first, next)
    }

    /// First to last instant of one local day.
    pub fn day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<Self> {
        Self::between(tz, date, date.succ_opt()?)
    }

    fn between<Tz: TimeZone>(tz: &Tz, first: NaiveDate, next: NaiveDate) -> Option<Self> {
        let start_ms = local_midnight_ms(tz, first)?;
        let end_ms = local_midnight_ms(tz, next)? - 1;
        Some(Self { start_ms, end_ms })
    }

    pub fn contains(&self, epoch_ms: i64) -> bool {
        self.start_ms <= epoch_ms && epoch_ms <= self.end_ms
    }
}

/// Earliest existing instant of `date` in `tz`.
///
/// Some zones skip midnight on DST changes; the first valid instant of the
/// day is used then.
fn local_midnight_ms<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<i64> {
    let mut naive = date.and_hms_opt(0, 0, 0)?;
    for _ in 0..4 {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(instant) => return Some(instant.timestamp_millis()),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest.timestamp_millis()),
            LocalResult::None => naive += Duration::minutes(30),
        }
    }
    None
}

/// Which days of one displayed month have at least one record.
///
/// Only presence is kept; no counts or per-source breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityMap {
    days: BTreeMap<String, bool>,
}

impl ActivityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, key: impl Into<String>) {
        self.days.insert(key.into(), true);
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.days.get(key).copied().unwrap_or(false)
    }

    /// Active day keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.days.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, bool> {
        &self.days
    }
}
