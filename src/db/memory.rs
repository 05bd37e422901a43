// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store used for tests and local development.
//!
//! Atomicity comes from DashMap shard locks: the open-session check and
//! insert happen under one entry lock, and a close holds the user's marker
//! entry and the session's write guard while crediting the day total and
//! clearing the marker.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::db::{DateRange, WearStore};
use crate::error::AppError;
use crate::models::{DailyRecord, SessionClose, UserPlan, WearSession};

/// Wear data held in concurrent maps.
#[derive(Default)]
pub struct MemoryStore {
    sessions: DashMap<String, WearSession>,
    /// user_id -> open session_id
    open_by_user: DashMap<String, String>,
    /// (user_id, date) -> record
    records: DashMap<(String, NaiveDate), DailyRecord>,
    plans: DashMap<String, UserPlan>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a user's plan (plan management lives outside this service).
    pub fn set_plan(&self, user_id: &str, plan: UserPlan) {
        self.plans.insert(user_id.to_string(), plan);
    }

    /// Seed a daily record directly, bypassing session accounting.
    pub fn insert_daily_record(&self, record: DailyRecord) {
        self.records
            .insert((record.user_id.clone(), record.date), record);
    }

    /// Seed a session directly, e.g. one left open long ago.
    pub fn insert_session(&self, session: WearSession) {
        if session.is_open() {
            self.open_by_user
                .insert(session.user_id.clone(), session.id.clone());
        }
        self.sessions.insert(session.id.clone(), session);
    }

    fn add_to_total(&self, user_id: &str, date: NaiveDate, delta: u64) -> u64 {
        let mut record = self
            .records
            .entry((user_id.to_string(), date))
            .or_insert_with(|| DailyRecord::new(user_id, date));
        record.total_seconds = record.total_seconds.saturating_add(delta);
        record.total_seconds
    }
}

#[async_trait]
impl WearStore for MemoryStore {
    async fn find_open_sessions(&self, user_id: &str) -> Result<Vec<WearSession>, AppError> {
        let mut open: Vec<WearSession> = self
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.is_open())
            .map(|s| s.value().clone())
            .collect();
        open.sort_by_key(|s| s.start_time);
        Ok(open)
    }

    async fn find_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<WearSession>, AppError> {
        Ok(self
            .sessions
            .get(session_id)
            .filter(|s| s.user_id == user_id)
            .map(|s| s.value().clone()))
    }

    async fn create_session(&self, session: &WearSession) -> Result<String, AppError> {
        match self.open_by_user.entry(session.user_id.clone()) {
            Entry::Occupied(existing) => Err(AppError::Conflict(format!(
                "User already has an open session: {}",
                existing.get()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(session.id.clone());
                self.sessions.insert(session.id.clone(), session.clone());
                Ok(session.id.clone())
            }
        }
    }

    async fn close_session(&self, close: &SessionClose) -> Result<u64, AppError> {
        // Lock order matches create_session: marker entry, then session.
        let marker = self.open_by_user.entry(close.user_id.clone());
        let mut session = self
            .sessions
            .get_mut(&close.session_id)
            .filter(|s| s.user_id == close.user_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", close.session_id)))?;

        if !session.is_open() {
            return Err(AppError::AlreadyClosed(close.session_id.clone()));
        }

        let total = self.add_to_total(&close.user_id, close.date, close.duration_seconds);
        session.apply_close(close);
        if let Entry::Occupied(marker) = marker {
            if *marker.get() == close.session_id {
                marker.remove();
            }
        }

        Ok(total)
    }

    async fn find_daily_record(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, AppError> {
        Ok(self
            .records
            .get(&(user_id.to_string(), date))
            .map(|r| r.value().clone()))
    }

    async fn increment_daily_total(
        &self,
        user_id: &str,
        date: NaiveDate,
        delta: u64,
    ) -> Result<u64, AppError> {
        Ok(self.add_to_total(user_id, date, delta))
    }

    async fn set_completed(
        &self,
        user_id: &str,
        date: NaiveDate,
        completed: bool,
    ) -> Result<(), AppError> {
        match self.records.get_mut(&(user_id.to_string(), date)) {
            Some(mut record) => {
                record.completed = Some(completed);
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Daily record {} not found",
                DailyRecord::doc_id(user_id, date)
            ))),
        }
    }

    async fn list_daily_records(
        &self,
        user_id: &str,
        range: DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<DailyRecord>, AppError> {
        let mut records: Vec<DailyRecord> = self
            .records
            .iter()
            .filter(|r| r.user_id == user_id && range.contains(r.date))
            .map(|r| r.value().clone())
            .collect();

        records.sort_by(|a, b| b.date.cmp(&a.date));
        if let Some(limit) = limit {
            records.truncate(limit as usize);
        }
        Ok(records)
    }

    async fn get_plan(&self, user_id: &str) -> Result<Option<UserPlan>, AppError> {
        Ok(self.plans.get(user_id).map(|p| p.value().clone()))
    }

    async fn list_expired_sessions(
        &self,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<WearSession>, AppError> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.is_open() && s.start_time < cutoff)
            .map(|s| s.value().clone())
            .collect())
    }
}
