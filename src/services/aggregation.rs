// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Folds session durations into daily totals.
//!
//! The total is always exact: it only changes through the store's atomic
//! increment. The `completed` flag is recomputed from the returned total
//! afterwards, so it can lag by one write under concurrent closes and then
//! converges on the next recomputation. A failed flag write is logged and
//! does not fail the credit.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::db::WearStore;
use crate::error::Result;
use crate::models::SessionClose;

/// A day's running total after a credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTotal {
    pub total_seconds: u64,
    pub completed: bool,
}

#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn WearStore>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn WearStore>) -> Self {
        Self { store }
    }

    /// Add `duration_seconds` to the (user, date) total and recompute completion.
    pub async fn apply_duration(
        &self,
        user_id: &str,
        date: NaiveDate,
        duration_seconds: u64,
        target_seconds: u64,
    ) -> Result<DayTotal> {
        let total = self
            .store
            .increment_daily_total(user_id, date, duration_seconds)
            .await?;
        self.mark_completion(user_id, date, total, target_seconds)
            .await
    }

    /// Close a session and credit its duration in one store write, then
    /// recompute completion for the session's date.
    pub async fn credit_close(&self, close: &SessionClose, target_seconds: u64) -> Result<DayTotal> {
        let total = self.store.close_session(close).await?;
        self.mark_completion(&close.user_id, close.date, total, target_seconds)
            .await
    }

    async fn mark_completion(
        &self,
        user_id: &str,
        date: NaiveDate,
        total_seconds: u64,
        target_seconds: u64,
    ) -> Result<DayTotal> {
        let completed = total_seconds >= target_seconds;
        // The total is already durable. A failed flag write is repaired by the
        // next recomputation for this date; don't fail the credit over it.
        if let Err(e) = self.store.set_completed(user_id, date, completed).await {
            tracing::warn!(
                user_id,
                date = %date,
                completed,
                error = %e,
                "Failed to persist completed flag"
            );
        }

        tracing::debug!(
            user_id,
            date = %date,
            total_seconds,
            target_seconds,
            completed,
            "Daily total updated"
        );

        Ok(DayTotal {
            total_seconds,
            completed,
        })
    }
}
