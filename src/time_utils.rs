// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and calendar math.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

/// Wire format for naive local timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Wire format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a naive timestamp with second precision.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

/// Monday of the calendar week containing `date`, shifted by `week_offset` weeks.
pub fn week_start(date: NaiveDate, week_offset: i64) -> NaiveDate {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    monday + Duration::weeks(week_offset)
}

/// The seven dates Monday..Sunday beginning at `monday`.
pub fn week_dates(monday: NaiveDate) -> Vec<NaiveDate> {
    monday.iter_days().take(7).collect()
}
