//! Database layer.
//!
//! `WearStore` is the contract the session and statistics services rely on.
//! Firestore backs it in production; `MemoryStore` backs it in tests and
//! local development.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{DailyRecord, SessionClose, UserPlan, WearSession};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const WEAR_SESSIONS: &str = "wear_sessions";
    /// One marker per user while a session is open (keyed by user_id)
    pub const OPEN_SESSIONS: &str = "open_sessions";
    /// Daily totals (keyed by `{user_id}_{date}`)
    pub const DAILY_RECORDS: &str = "daily_records";
}

/// Optional inclusive date bounds for record queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Storage operations for wear sessions and daily records.
///
/// Implementations must provide two atomicity guarantees:
/// - `create_session` fails with `Conflict` if the user already has an open
///   session, even under concurrent calls.
/// - `close_session` closes the session and increments the day total as a
///   single unit, and only ever succeeds once per session.
#[async_trait]
pub trait WearStore: Send + Sync {
    /// All open sessions for a user. Normally zero or one.
    async fn find_open_sessions(&self, user_id: &str) -> Result<Vec<WearSession>, AppError>;

    /// A session by ID, only if it belongs to `user_id`.
    async fn find_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<WearSession>, AppError>;

    /// Persist a new open session and return its ID.
    async fn create_session(&self, session: &WearSession) -> Result<String, AppError>;

    /// Close an open session and credit its duration to `close.date`.
    ///
    /// Returns the day's new total. Fails with `NotFound` or `AlreadyClosed`
    /// without writing anything.
    async fn close_session(&self, close: &SessionClose) -> Result<u64, AppError>;

    async fn find_daily_record(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, AppError>;

    /// Atomically add `delta` seconds to the day's total, creating the record
    /// if needed. Returns the new total.
    async fn increment_daily_total(
        &self,
        user_id: &str,
        date: NaiveDate,
        delta: u64,
    ) -> Result<u64, AppError>;

    async fn set_completed(
        &self,
        user_id: &str,
        date: NaiveDate,
        completed: bool,
    ) -> Result<(), AppError>;

    /// Daily records in `range`, newest first.
    async fn list_daily_records(
        &self,
        user_id: &str,
        range: DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<DailyRecord>, AppError>;

    async fn get_plan(&self, user_id: &str) -> Result<Option<UserPlan>, AppError>;

    /// Open sessions across all users that started before `cutoff`.
    async fn list_expired_sessions(
        &self,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<WearSession>, AppError>;
}
