// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Streaks, weekly reports, and suggestions.
//!
//! Everything here reads the daily record history and never writes it.
//! The calculations are plain functions over records so they can be tested
//! and benchmarked without a store.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::{DateRange, WearStore};
use crate::error::Result;
use crate::models::{Achievements, DailyRecord, DayEntry, WeeklyStats};
use crate::services::clock::Clock;
use crate::time_utils::{week_dates, week_start};

/// Default and maximum page size for record listings.
pub const DEFAULT_RECORD_LIMIT: u32 = 30;
pub const MAX_RECORD_LIMIT: u32 = 100;

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Round to one decimal place, ties to even.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Current and longest runs of completed days.
///
/// Records are walked newest to oldest. The first incomplete day fixes the
/// current streak at whatever run preceded it (possibly zero). Missing dates
/// between records do not break a run.
pub fn calculate_streak(records: &[DailyRecord]) -> (u32, u32) {
    let mut sorted: Vec<&DailyRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));

    let mut current: Option<u32> = None;
    let mut longest = 0;
    let mut run = 0;

    for record in sorted {
        if record.is_completed() {
            run += 1;
            longest = longest.max(run);
        } else {
            if current.is_none() {
                current = Some(run);
            }
            run = 0;
        }
    }

    (current.unwrap_or(run), longest)
}

/// Build the seven Monday..Sunday entries starting at `monday`.
///
/// Hours are left unrounded. A missing record counts as zero hours and not
/// completed; a record without a stored flag is judged against the target.
pub fn build_week(monday: NaiveDate, records: &[DailyRecord], target_hours: f64) -> Vec<DayEntry> {
    let by_date: HashMap<NaiveDate, &DailyRecord> = records.iter().map(|r| (r.date, r)).collect();

    week_dates(monday)
        .into_iter()
        .map(|date| match by_date.get(&date) {
            Some(record) => {
                let hours = record.hours();
                DayEntry {
                    date,
                    hours,
                    completed: record.completed.unwrap_or(hours >= target_hours),
                }
            }
            None => DayEntry {
                date,
                hours: 0.0,
                completed: false,
            },
        })
        .collect()
}

/// Hints for the week, evaluated in a fixed order.
pub fn generate_suggestions(week: &[DayEntry], target_hours: f64) -> Vec<String> {
    if week.is_empty() {
        return vec!["Start tracking your wear time!".to_string()];
    }

    let mut suggestions = Vec::new();

    // Worst day, first one on ties
    let worst = week
        .iter()
        .reduce(|min, day| if day.hours < min.hours { day } else { min });
    if let Some(worst) = worst {
        if worst.hours < target_hours * 0.8 {
            let name = WEEKDAY_NAMES[worst.date.weekday().num_days_from_monday() as usize];
            suggestions.push(format!(
                "{} had the shortest wear time; try to wear your aligner longer that day",
                name
            ));
        }
    }

    let incomplete = week.iter().filter(|d| !d.completed).count();
    if incomplete >= 3 {
        suggestions.push("Several days missed the target recently, keep going!".to_string());
    }

    let (weekend, weekday): (Vec<&DayEntry>, Vec<&DayEntry>) = week
        .iter()
        .partition(|d| matches!(d.date.weekday(), Weekday::Sat | Weekday::Sun));
    if !weekday.is_empty() && !weekend.is_empty() {
        let avg_weekday = weekday.iter().map(|d| d.hours).sum::<f64>() / weekday.len() as f64;
        let avg_weekend = weekend.iter().map(|d| d.hours).sum::<f64>() / weekend.len() as f64;
        if avg_weekend > avg_weekday * 1.2 {
            suggestions
                .push("Weekends are going better than weekdays, stay consistent!".to_string());
        }
    }

    if week.len() >= 7 && week.iter().all(|d| d.completed) {
        suggestions.push("Amazing! You hit your target every day this week!".to_string());
    }

    if suggestions.is_empty() {
        suggestions.push("Keep it up, you're doing great!".to_string());
    }

    suggestions
}

/// Assemble a weekly report from the week's records and the full history.
pub fn build_weekly_stats(
    monday: NaiveDate,
    week_records: &[DailyRecord],
    all_records: &[DailyRecord],
    target_hours: f64,
) -> WeeklyStats {
    let days = build_week(monday, week_records, target_hours);
    let total_hours: f64 = days.iter().map(|d| d.hours).sum();
    let completed_count = days.iter().filter(|d| d.completed).count();

    let week_data: Vec<DayEntry> = days
        .into_iter()
        .map(|d| DayEntry {
            hours: round1(d.hours),
            ..d
        })
        .collect();
    let suggestions = generate_suggestions(&week_data, target_hours);

    let (current_streak, longest_streak) = calculate_streak(all_records);
    let total_completed_days = all_records.iter().filter(|r| r.is_completed()).count() as u32;

    WeeklyStats {
        week_data,
        avg_hours: round1(total_hours / 7.0),
        completion_rate: round1(completed_count as f64 / 7.0 * 100.0),
        current_streak,
        longest_streak,
        total_completed_days,
        suggestions,
    }
}

/// Lifetime totals over the full history.
pub fn build_achievements(records: &[DailyRecord]) -> Achievements {
    let (current_streak, longest_streak) = calculate_streak(records);
    let total_completed_days = records.iter().filter(|r| r.is_completed()).count() as u32;
    let total_days = records.len() as u32;
    let total_seconds = records.iter().map(|r| r.total_seconds).sum();
    let completion_rate = if total_days > 0 {
        (total_completed_days as f64 / total_days as f64 * 100.0).round_ties_even() as u32
    } else {
        0
    };

    Achievements {
        current_streak,
        longest_streak,
        total_completed_days,
        total_days,
        total_seconds,
        completion_rate,
    }
}

/// Read-only statistics over a user's history.
#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn WearStore>,
    clock: Arc<dyn Clock>,
    default_target_hours: f64,
}

impl StatsService {
    pub fn new(store: Arc<dyn WearStore>, clock: Arc<dyn Clock>, default_target_hours: f64) -> Self {
        Self {
            store,
            clock,
            default_target_hours,
        }
    }

    pub async fn target_hours(&self, user_id: &str) -> Result<f64> {
        Ok(self
            .store
            .get_plan(user_id)
            .await?
            .map(|p| p.target_hours)
            .unwrap_or(self.default_target_hours))
    }

    /// Report for the week containing today, shifted by `week_offset` weeks.
    pub async fn weekly_report(&self, user_id: &str, week_offset: i64) -> Result<WeeklyStats> {
        let target_hours = self.target_hours(user_id).await?;
        let monday = week_start(self.clock.now().date(), week_offset);
        let sunday = monday + chrono::Duration::days(6);

        let week_records = self
            .store
            .list_daily_records(user_id, DateRange::between(monday, sunday), None)
            .await?;
        let all_records = self
            .store
            .list_daily_records(user_id, DateRange::all(), None)
            .await?;

        tracing::debug!(
            user_id,
            week_offset,
            monday = %monday,
            week_records = week_records.len(),
            all_records = all_records.len(),
            "Building weekly report"
        );

        Ok(build_weekly_stats(
            monday,
            &week_records,
            &all_records,
            target_hours,
        ))
    }

    pub async fn achievements(&self, user_id: &str) -> Result<Achievements> {
        let records = self
            .store
            .list_daily_records(user_id, DateRange::all(), None)
            .await?;
        Ok(build_achievements(&records))
    }

    /// Daily records in `range`, newest first, at most `limit` (capped at 100).
    pub async fn list_records(
        &self,
        user_id: &str,
        range: DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<DailyRecord>> {
        let limit = limit
            .unwrap_or(DEFAULT_RECORD_LIMIT)
            .min(MAX_RECORD_LIMIT);
        self.store
            .list_daily_records(user_id, range, Some(limit))
            .await
    }
}
