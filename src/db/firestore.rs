// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Wear sessions (plus a per-user open-session marker)
//! - Daily records (atomic increment-and-upsert)
//! - User plans (read-only)

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use firestore::{FirestoreConsistencySelector, FirestoreWritePrecondition};
use serde::{Deserialize, Serialize};

use crate::db::{collections, DateRange, WearStore};
use crate::error::AppError;
use crate::models::plan::UserDoc;
use crate::models::{DailyRecord, SessionClose, UserPlan, WearSession};
use crate::time_utils::{format_date, format_timestamp};

/// Marker document that exists exactly while a user has an open session.
///
/// Stored at: `open_sessions/{user_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenSessionMarker {
    session_id: String,
    start_time: NaiveDateTime,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator takes an unauthenticated connection
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return `StoreUnavailable`.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::StoreUnavailable("Database not connected (offline mode)".to_string())
        })
    }

    async fn get_session_doc(&self, session_id: &str) -> Result<Option<WearSession>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::WEAR_SESSIONS)
            .obj()
            .one(session_id)
            .await
            .map_err(store_err)
    }

    async fn read_total(&self, user_id: &str, date: NaiveDate) -> Result<u64, AppError> {
        Ok(self
            .find_daily_record(user_id, date)
            .await?
            .map(|r| r.total_seconds)
            .unwrap_or(0))
    }

    /// Add an increment-and-upsert of a daily record to a transaction.
    ///
    /// Only `user_id` and `date` are written from the object; `total_seconds`
    /// is changed solely by the server-side increment transform.
    fn add_increment(
        &self,
        transaction: &mut firestore::FirestoreTransaction<'_>,
        user_id: &str,
        date: NaiveDate,
        delta: u64,
    ) -> Result<(), AppError> {
        let seed = DailyRecord::new(user_id, date);
        self.get_client()?
            .fluent()
            .update()
            .fields(["user_id", "date"])
            .in_col(collections::DAILY_RECORDS)
            .document_id(DailyRecord::doc_id(user_id, date))
            .object(&seed)
            .transforms(|t| t.fields([t.field("total_seconds").increment(delta as i64)]))
            .add_to_transaction(transaction)
            .map_err(|e| {
                AppError::StoreUnavailable(format!(
                    "Failed to add increment to transaction: {}",
                    e
                ))
            })?;
        Ok(())
    }

    /// Read the session and the user's open marker within `transaction`.
    async fn read_for_close(
        client: &firestore::FirestoreDb,
        transaction: &firestore::FirestoreTransaction<'_>,
        close: &SessionClose,
    ) -> Result<(Option<WearSession>, Option<OpenSessionMarker>), AppError> {
        let tx_client = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );

        let session: Option<WearSession> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::WEAR_SESSIONS)
            .obj()
            .one(&close.session_id)
            .await
            .map_err(store_err)?;

        let marker: Option<OpenSessionMarker> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::OPEN_SESSIONS)
            .obj()
            .one(&close.user_id)
            .await
            .map_err(store_err)?;

        Ok((session, marker))
    }

    /// Validate a transactional read before closing.
    fn check_close(
        session: Option<WearSession>,
        marker: Option<OpenSessionMarker>,
        close: &SessionClose,
    ) -> Result<WearSession, AppError> {
        let session = session
            .filter(|s| s.user_id == close.user_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", close.session_id)))?;

        if !session.is_open() {
            return Err(AppError::AlreadyClosed(close.session_id.clone()));
        }

        match marker {
            Some(marker) if marker.session_id == close.session_id => Ok(session),
            other => {
                tracing::warn!(
                    user_id = %close.user_id,
                    session_id = %close.session_id,
                    marker_session = ?other.map(|m| m.session_id),
                    "Open session has no matching marker; refusing to close"
                );
                Err(AppError::Conflict(format!(
                    "Session {} is not the user's open session",
                    close.session_id
                )))
            }
        }
    }
}

fn store_err(e: impl std::fmt::Display) -> AppError {
    AppError::StoreUnavailable(e.to_string())
}

/// New `total_seconds` reported by the increment transform, which is always
/// the last write in the transaction.
fn incremented_total(response: &firestore::FirestoreTransactionResponse) -> Option<u64> {
    use gcloud_sdk::google::firestore::v1::value::ValueType;

    let result = response.write_results.last()?.transform_results.first()?;
    match &result.value.value_type {
        Some(ValueType::IntegerValue(total)) => u64::try_from(*total).ok(),
        _ => None,
    }
}

#[async_trait]
impl WearStore for FirestoreDb {
    // ─── Session Operations ──────────────────────────────────────

    async fn find_open_sessions(&self, user_id: &str) -> Result<Vec<WearSession>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::WEAR_SESSIONS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("end_time").is_null(),
                ])
            })
            .order_by([("start_time", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(store_err)
    }

    async fn find_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<WearSession>, AppError> {
        Ok(self
            .get_session_doc(session_id)
            .await?
            .filter(|s| s.user_id == user_id))
    }

    /// Writes the session and the open marker in one transaction.
    ///
    /// The marker is created with an `exists = false` precondition, so a
    /// concurrent start for the same user fails the commit.
    async fn create_session(&self, session: &WearSession) -> Result<String, AppError> {
        let client = self.get_client()?;
        let marker = OpenSessionMarker {
            session_id: session.id.clone(),
            start_time: session.start_time,
        };

        let mut transaction = client.begin_transaction().await.map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to begin transaction: {}", e))
        })?;

        client
            .fluent()
            .update()
            .in_col(collections::OPEN_SESSIONS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&session.user_id)
            .object(&marker)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::StoreUnavailable(format!("Failed to add marker to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::WEAR_SESSIONS)
            .document_id(&session.id)
            .object(session)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::StoreUnavailable(format!("Failed to add session to transaction: {}", e))
            })?;

        if let Err(e) = transaction.commit().await {
            // Distinguish a lost race from a store outage
            let existing: Option<OpenSessionMarker> = client
                .fluent()
                .select()
                .by_id_in(collections::OPEN_SESSIONS)
                .obj()
                .one(&session.user_id)
                .await
                .map_err(store_err)?;

            return match existing {
                Some(marker) => Err(AppError::Conflict(format!(
                    "User already has an open session: {}",
                    marker.session_id
                ))),
                None => Err(AppError::StoreUnavailable(format!(
                    "Session create commit failed: {}",
                    e
                ))),
            };
        }

        tracing::debug!(
            user_id = %session.user_id,
            session_id = %session.id,
            start_time = %format_timestamp(session.start_time),
            "Session created"
        );

        Ok(session.id.clone())
    }

    /// Closes the session, removes the marker, and credits the day in one
    /// transaction.
    ///
    /// The session and the user's marker are read inside the transaction, and
    /// the marker must name this session. A closer working from a stale read
    /// either fails these checks or fails the commit, so it can never credit
    /// the session again or remove the marker of a newer session.
    async fn close_session(&self, close: &SessionClose) -> Result<u64, AppError> {
        let client = self.get_client()?;

        let mut transaction = client.begin_transaction().await.map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to begin transaction: {}", e))
        })?;

        let (session, marker) =
            match Self::read_for_close(client, &transaction, close).await {
                Ok(read) => read,
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            };

        let mut session = match Self::check_close(session, marker, close) {
            Ok(session) => session,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        };
        session.apply_close(close);

        client
            .fluent()
            .update()
            .in_col(collections::WEAR_SESSIONS)
            .document_id(&session.id)
            .object(&session)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::StoreUnavailable(format!("Failed to add session to transaction: {}", e))
            })?;

        client
            .fluent()
            .delete()
            .from(collections::OPEN_SESSIONS)
            .document_id(&close.user_id)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::StoreUnavailable(format!("Failed to add marker delete to transaction: {}", e))
            })?;

        self.add_increment(
            &mut transaction,
            &close.user_id,
            close.date,
            close.duration_seconds,
        )?;

        let response = match transaction.commit().await {
            Ok(response) => response,
            Err(e) => {
                // If someone else closed it first, report that instead of an outage
                let current = self.get_session_doc(&close.session_id).await?;
                if current.is_some_and(|s| !s.is_open()) {
                    return Err(AppError::AlreadyClosed(close.session_id.clone()));
                }
                return Err(AppError::StoreUnavailable(format!(
                    "Session close commit failed: {}",
                    e
                )));
            }
        };

        tracing::debug!(
            user_id = %close.user_id,
            session_id = %close.session_id,
            date = %format_date(close.date),
            duration_seconds = close.duration_seconds,
            auto_closed = close.auto_closed,
            "Session closed and credited"
        );

        // The close is durable from here on; never report it as failed
        match incremented_total(&response) {
            Some(total) => Ok(total),
            None => Ok(self
                .read_total(&close.user_id, close.date)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(
                        user_id = %close.user_id,
                        date = %format_date(close.date),
                        error = %e,
                        "Could not read day total after close"
                    );
                    close.duration_seconds
                })),
        }
    }

    // ─── Daily Record Operations ─────────────────────────────────

    async fn find_daily_record(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::DAILY_RECORDS)
            .obj()
            .one(&DailyRecord::doc_id(user_id, date))
            .await
            .map_err(store_err)
    }

    async fn increment_daily_total(
        &self,
        user_id: &str,
        date: NaiveDate,
        delta: u64,
    ) -> Result<u64, AppError> {
        let client = self.get_client()?;
        let mut transaction = client.begin_transaction().await.map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to begin transaction: {}", e))
        })?;

        self.add_increment(&mut transaction, user_id, date, delta)?;

        let response = transaction.commit().await.map_err(|e| {
            AppError::StoreUnavailable(format!("Increment commit failed: {}", e))
        })?;

        match incremented_total(&response) {
            Some(total) => Ok(total),
            None => self.read_total(user_id, date).await,
        }
    }

    async fn set_completed(
        &self,
        user_id: &str,
        date: NaiveDate,
        completed: bool,
    ) -> Result<(), AppError> {
        let mut record = DailyRecord::new(user_id, date);
        record.completed = Some(completed);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["completed"])
            .in_col(collections::DAILY_RECORDS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(DailyRecord::doc_id(user_id, date))
            .object(&record)
            .execute()
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn list_daily_records(
        &self,
        user_id: &str,
        range: DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<DailyRecord>, AppError> {
        let user_id = user_id.to_string();
        let start = range.start.map(format_date);
        let end = range.end.map(format_date);

        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::DAILY_RECORDS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    start
                        .clone()
                        .and_then(|s| q.field("date").greater_than_or_equal(s)),
                    end.clone()
                        .and_then(|e| q.field("date").less_than_or_equal(e)),
                ])
            })
            .order_by([("date", firestore::FirestoreQueryDirection::Descending)]);

        let query = match limit {
            Some(limit) => query.limit(limit),
            None => query,
        };

        query.obj().query().await.map_err(store_err)
    }

    // ─── Plan Operations ─────────────────────────────────────────

    async fn get_plan(&self, user_id: &str) -> Result<Option<UserPlan>, AppError> {
        let doc: Option<UserDoc> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(store_err)?;
        Ok(doc.and_then(|d| d.plan))
    }

    // ─── Sweeper Support ─────────────────────────────────────────

    async fn list_expired_sessions(
        &self,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<WearSession>, AppError> {
        let cutoff = format_timestamp(cutoff);
        self.get_client()?
            .fluent()
            .select()
            .from(collections::WEAR_SESSIONS)
            .filter(move |q| {
                q.for_all([
                    q.field("end_time").is_null(),
                    q.field("start_time").less_than(cutoff.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(store_err)
    }
}
