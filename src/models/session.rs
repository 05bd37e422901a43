// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Wear session model for storage and API.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One continuous attempt to wear the aligner.
///
/// Timestamps are naive local wall-clock times assigned by the server.
/// A session is open while `end_time` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearSession {
    /// Session ID (also used as document ID)
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// When the session started (server time)
    pub start_time: NaiveDateTime,
    /// When the session ended, absent while open
    #[serde(default)]
    pub end_time: Option<NaiveDateTime>,
    /// Elapsed whole seconds, absent while open
    #[serde(default)]
    pub duration_seconds: Option<u64>,
    /// Day the session is credited to (local date of `start_time`)
    pub date: NaiveDate,
    /// Set when the expiry sweep closed the session
    #[serde(default)]
    pub auto_closed: bool,
}

impl WearSession {
    /// Build a new open session starting at `start_time`.
    pub fn open(id: String, user_id: &str, start_time: NaiveDateTime) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            start_time,
            end_time: None,
            duration_seconds: None,
            date: start_time.date(),
            auto_closed: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Apply a close to this session. `date` is never touched.
    pub fn apply_close(&mut self, close: &SessionClose) {
        self.end_time = Some(close.end_time);
        self.duration_seconds = Some(close.duration_seconds);
        self.auto_closed = close.auto_closed;
    }
}

/// A validated request to close an open session and credit its duration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClose {
    pub session_id: String,
    pub user_id: String,
    /// Day to credit (the session's stored date)
    pub date: NaiveDate,
    pub end_time: NaiveDateTime,
    pub duration_seconds: u64,
    pub auto_closed: bool,
}

impl SessionClose {
    pub fn for_session(
        session: &WearSession,
        end_time: NaiveDateTime,
        duration_seconds: u64,
        auto_closed: bool,
    ) -> Self {
        Self {
            session_id: session.id.clone(),
            user_id: session.user_id.clone(),
            date: session.date,
            end_time,
            duration_seconds,
            auto_closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn test_open_session_takes_start_date() {
        let session = WearSession::open("s1".into(), "u1", ts("2024-06-01T20:00:00"));
        assert!(session.is_open());
        assert_eq!(session.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(session.duration_seconds, None);
        assert!(!session.auto_closed);
    }

    #[test]
    fn test_apply_close_keeps_date() {
        let mut session = WearSession::open("s1".into(), "u1", ts("2024-06-01T20:00:00"));
        let close = SessionClose::for_session(&session, ts("2024-06-02T08:00:00"), 43200, false);
        session.apply_close(&close);

        assert!(!session.is_open());
        assert_eq!(session.duration_seconds, Some(43200));
        assert_eq!(session.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{
            "id": "s1",
            "user_id": "u1",
            "start_time": "2024-06-01T20:00:00",
            "date": "2024-06-01"
        }"#;
        let session: WearSession = serde_json::from_str(json).unwrap();
        assert!(session.is_open());
        assert!(!session.auto_closed);
    }
}
