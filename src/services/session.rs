// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wear session state machine.
//!
//! A user is either without an active session or has exactly one open
//! session. An open session is closed exactly once, either by an explicit
//! stop or by the expiry sweep, and its duration is credited to the date the
//! session started on.
//!
//! The expiry sweep runs inline before every start and status call, so a
//! forgotten session never blocks a new one.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::sync::Arc;

use crate::db::WearStore;
use crate::error::{AppError, Result};
use crate::models::plan::target_seconds;
use crate::models::{SessionClose, WearSession};
use crate::services::aggregation::Aggregator;
use crate::services::clock::Clock;

/// Longest a single session may run, in seconds.
pub const MAX_SESSION_SECONDS: i64 = 24 * 60 * 60;

/// Result of starting a session.
#[derive(Debug, Clone, PartialEq)]
pub struct StartOutcome {
    pub session_id: String,
    pub start_time: NaiveDateTime,
    /// Server time used, for client display calibration
    pub server_time: NaiveDateTime,
}

/// Result of stopping a session.
#[derive(Debug, Clone, PartialEq)]
pub struct StopOutcome {
    pub session_id: String,
    pub duration_seconds: u64,
    /// Running total for the session's date
    pub day_total: u64,
    pub completed: bool,
}

/// Current timer state for a user.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerStatus {
    pub is_wearing: bool,
    pub session_id: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    /// Today's closed-session total; the open session is not included
    pub today_total: u64,
    pub target_seconds: u64,
    pub server_time: NaiveDateTime,
}

/// Elapsed whole seconds between `start` and `end`.
///
/// Rejects negative spans and spans longer than `MAX_SESSION_SECONDS`.
pub fn validate_duration(start: NaiveDateTime, end: NaiveDateTime) -> Result<u64> {
    let seconds = end.signed_duration_since(start).num_seconds();
    if end < start {
        return Err(AppError::InvalidDuration {
            seconds: seconds.abs(),
        });
    }
    if seconds > MAX_SESSION_SECONDS {
        return Err(AppError::DurationLimitExceeded {
            seconds,
            limit: MAX_SESSION_SECONDS,
        });
    }
    Ok(seconds as u64)
}

/// Owns session lifecycle transitions for all users.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn WearStore>,
    clock: Arc<dyn Clock>,
    aggregator: Aggregator,
    default_target_hours: f64,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn WearStore>,
        clock: Arc<dyn Clock>,
        default_target_hours: f64,
    ) -> Self {
        Self {
            aggregator: Aggregator::new(store.clone()),
            store,
            clock,
            default_target_hours,
        }
    }

    /// The user's daily target in seconds, from their plan or the default.
    pub async fn target_seconds(&self, user_id: &str) -> Result<u64> {
        Ok(match self.store.get_plan(user_id).await? {
            Some(plan) => plan.target_seconds(),
            None => target_seconds(self.default_target_hours),
        })
    }

    /// Open a new session for `user_id`.
    pub async fn start(&self, user_id: &str) -> Result<StartOutcome> {
        self.auto_close_expired(user_id).await?;

        if let Some(open) = self.store.find_open_sessions(user_id).await?.first() {
            return Err(AppError::Conflict(format!(
                "User already has an open session: {}",
                open.id
            )));
        }

        let now = self.clock.now();
        let session = WearSession::open(uuid::Uuid::new_v4().to_string(), user_id, now);
        let session_id = self.store.create_session(&session).await?;

        tracing::info!(
            user_id,
            session_id = %session_id,
            date = %session.date,
            "Wear session started"
        );

        Ok(StartOutcome {
            session_id,
            start_time: now,
            server_time: now,
        })
    }

    /// Close `session_id` and credit its duration to the session's own date.
    ///
    /// A session that has run past the limit is handed to the expiry sweep
    /// (capped at `MAX_SESSION_SECONDS`) and the limit error is returned.
    pub async fn stop(&self, user_id: &str, session_id: &str) -> Result<StopOutcome> {
        let session = self
            .store
            .find_session(user_id, session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))?;

        if !session.is_open() {
            return Err(AppError::AlreadyClosed(session_id.to_string()));
        }

        let now = self.clock.now();
        let duration_seconds = match validate_duration(session.start_time, now) {
            Ok(seconds) => seconds,
            Err(err @ AppError::DurationLimitExceeded { .. }) => {
                tracing::warn!(
                    user_id,
                    session_id,
                    "Stop requested past the session limit; auto-closing"
                );
                self.auto_close_expired(user_id).await?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let target = self.target_seconds(user_id).await?;
        let close = SessionClose::for_session(&session, now, duration_seconds, false);
        let day = self.aggregator.credit_close(&close, target).await?;

        tracing::info!(
            user_id,
            session_id,
            date = %session.date,
            duration_seconds,
            day_total = day.total_seconds,
            completed = day.completed,
            "Wear session stopped"
        );

        Ok(StopOutcome {
            session_id: session_id.to_string(),
            duration_seconds,
            day_total: day.total_seconds,
            completed: day.completed,
        })
    }

    /// Report the user's timer state after sweeping expired sessions.
    pub async fn status(&self, user_id: &str) -> Result<TimerStatus> {
        self.auto_close_expired(user_id).await?;

        let now = self.clock.now();
        let open = self.store.find_open_sessions(user_id).await?.into_iter().next();
        let today_total = self.day_total(user_id, now.date()).await?;
        let target_seconds = self.target_seconds(user_id).await?;

        Ok(TimerStatus {
            is_wearing: open.is_some(),
            session_id: open.as_ref().map(|s| s.id.clone()),
            start_time: open.as_ref().map(|s| s.start_time),
            today_total,
            target_seconds,
            server_time: now,
        })
    }

    /// Close every open session of `user_id` that has exceeded the limit.
    ///
    /// Each is closed at exactly `start + MAX_SESSION_SECONDS` and credited
    /// like a normal stop. Sessions closed concurrently by someone else are
    /// skipped. Returns the number of sessions this call closed.
    pub async fn auto_close_expired(&self, user_id: &str) -> Result<usize> {
        let now = self.clock.now();
        let limit = Duration::seconds(MAX_SESSION_SECONDS);

        let expired: Vec<WearSession> = self
            .store
            .find_open_sessions(user_id)
            .await?
            .into_iter()
            .filter(|s| now.signed_duration_since(s.start_time) > limit)
            .collect();

        if expired.is_empty() {
            return Ok(0);
        }

        let target = self.target_seconds(user_id).await?;
        let mut closed = 0;

        for session in expired {
            let close = SessionClose::for_session(
                &session,
                session.start_time + limit,
                MAX_SESSION_SECONDS as u64,
                true,
            );

            match self.aggregator.credit_close(&close, target).await {
                Ok(day) => {
                    closed += 1;
                    tracing::info!(
                        user_id,
                        session_id = %session.id,
                        date = %session.date,
                        day_total = day.total_seconds,
                        "Self-healing: auto-closed expired session"
                    );
                }
                Err(AppError::AlreadyClosed(_)) | Err(AppError::NotFound(_)) => {
                    tracing::debug!(
                        user_id,
                        session_id = %session.id,
                        "Expired session already closed elsewhere"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(closed)
    }

    async fn day_total(&self, user_id: &str, date: NaiveDate) -> Result<u64> {
        Ok(self
            .store
            .find_daily_record(user_id, date)
            .await?
            .map(|r| r.total_seconds)
            .unwrap_or(0))
    }
}
