// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use aligner_tracker::config::Config;
use aligner_tracker::db::{FirestoreDb, MemoryStore};
use aligner_tracker::routes::create_router;
use aligner_tracker::services::ManualClock;
use aligner_tracker::AppState;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::NaiveDateTime;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Parse a `YYYY-MM-DDTHH:MM:SS` timestamp.
#[allow(dead_code)]
pub fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, aligner_tracker::time_utils::TIMESTAMP_FORMAT)
        .expect("valid test timestamp")
}

/// Unique user ID for test isolation against a shared emulator.
#[allow(dead_code)]
pub fn unique_user_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

/// Sign an HS256 token for `user_id` expiring `exp_offset` seconds from now.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8], exp_offset: i64) -> String {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        iat: usize,
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + exp_offset) as usize,
        iat: now as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

/// Router over an in-memory store with a hand-driven clock.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new(now: &str) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), now)
    }

    pub fn with_store(store: Arc<MemoryStore>, now: &str) -> Self {
        let clock = Arc::new(ManualClock::new(ts(now)));
        let state = Arc::new(AppState::new(
            Config::test_default(),
            store.clone(),
            clock.clone(),
        ));
        Self {
            router: create_router(state.clone()),
            state,
            store,
            clock,
        }
    }

    pub fn token(&self, user_id: &str) -> String {
        create_test_jwt(user_id, &self.state.config.jwt_signing_key, 86400)
    }

    /// Send a request as `user_id` and return status plus JSON body.
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        user_id: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user_id)));

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}
