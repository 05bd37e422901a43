// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Derived statistics, computed on read from the daily record history.
//!
//! Nothing here is persisted.

use chrono::NaiveDate;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One day of a weekly report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DayEntry {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    /// Hours worn, rounded to one decimal
    pub hours: f64,
    pub completed: bool,
}

/// Monday-to-Sunday summary plus lifetime streaks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WeeklyStats {
    pub week_data: Vec<DayEntry>,
    pub avg_hours: f64,
    /// Percentage of the seven days completed, one decimal
    pub completion_rate: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_completed_days: u32,
    pub suggestions: Vec<String>,
}

/// Lifetime totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Achievements {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_completed_days: u32,
    pub total_days: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_seconds: u64,
    /// Whole-number percentage of recorded days completed
    pub completion_rate: u32,
}
