// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Statistics routes.

use crate::db::DateRange;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Achievements, DailyRecord, WeeklyStats};
use crate::services::stats::MAX_RECORD_LIMIT;
use crate::time_utils::{format_date, parse_date};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/stats/weekly", get(weekly_stats))
        .route("/api/stats/records", get(list_records))
        .route("/api/stats/achievements", get(achievements))
}

fn invalid(e: validator::ValidationErrors) -> AppError {
    AppError::BadRequest(e.to_string())
}

// ─── Weekly ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
struct WeeklyQuery {
    /// 0 = current week, -1 = previous week
    #[serde(default)]
    #[validate(range(min = -520, max = 520))]
    week_offset: i64,
}

async fn weekly_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<WeeklyQuery>,
) -> Result<Json<WeeklyStats>> {
    params.validate().map_err(invalid)?;

    let stats = state
        .stats
        .weekly_report(&user.user_id, params.week_offset)
        .await?;
    Ok(Json(stats))
}

// ─── Records ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
struct RecordsQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    #[validate(range(min = 1, max = MAX_RECORD_LIMIT))]
    limit: Option<u32>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecordSummary {
    pub date: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_seconds: u64,
    pub hours: f64,
    pub completed: bool,
}

impl From<DailyRecord> for RecordSummary {
    fn from(record: DailyRecord) -> Self {
        Self {
            date: format_date(record.date),
            total_seconds: record.total_seconds,
            hours: crate::services::stats::round1(record.hours()),
            completed: record.is_completed(),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecordsResponse {
    pub records: Vec<RecordSummary>,
}

fn parse_date_param(name: &str, raw: Option<&str>) -> Result<Option<chrono::NaiveDate>> {
    raw.map(|value| {
        parse_date(value).ok_or_else(|| {
            AppError::BadRequest(format!("Invalid '{}' parameter: expected YYYY-MM-DD", name))
        })
    })
    .transpose()
}

async fn list_records(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>> {
    params.validate().map_err(invalid)?;

    let range = DateRange {
        start: parse_date_param("start_date", params.start_date.as_deref())?,
        end: parse_date_param("end_date", params.end_date.as_deref())?,
    };

    tracing::debug!(
        user_id = %user.user_id,
        start = ?range.start,
        end = ?range.end,
        limit = ?params.limit,
        "Listing daily records"
    );

    let records = state
        .stats
        .list_records(&user.user_id, range, params.limit)
        .await?;

    Ok(Json(RecordsResponse {
        records: records.into_iter().map(RecordSummary::from).collect(),
    }))
}

// ─── Achievements ────────────────────────────────────────────

async fn achievements(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Achievements>> {
    Ok(Json(state.stats.achievements(&user.user_id).await?))
}
