// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-user, per-day wear totals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Cumulative wear for one user on one calendar date.
///
/// Stored at: `daily_records/{user_id}_{date}`
///
/// `total_seconds` only grows, through atomic increments when sessions close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DailyRecord {
    pub user_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_seconds: u64,
    /// Absent until the first completion recomputation for the day
    #[serde(default)]
    pub completed: Option<bool>,
}

impl DailyRecord {
    /// An empty record, as created by the first increment for a day.
    pub fn new(user_id: &str, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            total_seconds: 0,
            completed: None,
        }
    }

    /// Document ID enforcing one record per (user, date).
    pub fn doc_id(user_id: &str, date: NaiveDate) -> String {
        format!("{}_{}", user_id, date.format("%Y-%m-%d"))
    }

    /// Stored completion flag, treating an absent flag as not completed.
    pub fn is_completed(&self) -> bool {
        self.completed.unwrap_or(false)
    }

    pub fn hours(&self) -> f64 {
        self.total_seconds as f64 / 3600.0
    }
}
