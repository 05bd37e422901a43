// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wear timer routes: start, stop, status.
//!
//! All times are assigned by the server. Clients only name the session to
//! stop; any client-supplied timestamps are ignored.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::{StartOutcome, StopOutcome, TimerStatus};
use crate::time_utils::format_timestamp;
use crate::AppState;
use axum::{extract::State, routing::get, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/timer/start", post(start_timer))
        .route("/api/timer/stop", post(stop_timer))
        .route("/api/timer/status", get(timer_status))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StartResponse {
    pub session_id: String,
    pub start_time: String,
    pub server_time: String,
}

impl From<StartOutcome> for StartResponse {
    fn from(outcome: StartOutcome) -> Self {
        Self {
            session_id: outcome.session_id,
            start_time: format_timestamp(outcome.start_time),
            server_time: format_timestamp(outcome.server_time),
        }
    }
}

async fn start_timer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StartResponse>> {
    let outcome = state.sessions.start(&user.user_id).await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct StopRequest {
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StopResponse {
    pub session_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_seconds: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub today_total: u64,
    pub completed: bool,
}

impl From<StopOutcome> for StopResponse {
    fn from(outcome: StopOutcome) -> Self {
        Self {
            session_id: outcome.session_id,
            duration_seconds: outcome.duration_seconds,
            today_total: outcome.day_total,
            completed: outcome.completed,
        }
    }
}

async fn stop_timer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<StopRequest>,
) -> Result<Json<StopResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(format!("Invalid session_id: {}", e)))?;

    let outcome = state.sessions.stop(&user.user_id, &body.session_id).await?;
    Ok(Json(outcome.into()))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatusResponse {
    pub is_wearing: bool,
    pub session_id: Option<String>,
    pub start_time: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub today_total: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub target_seconds: u64,
    pub server_time: String,
}

impl From<TimerStatus> for StatusResponse {
    fn from(status: TimerStatus) -> Self {
        Self {
            is_wearing: status.is_wearing,
            session_id: status.session_id,
            start_time: status.start_time.map(format_timestamp),
            today_total: status.today_total,
            target_seconds: status.target_seconds,
            server_time: format_timestamp(status.server_time),
        }
    }
}

async fn timer_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StatusResponse>> {
    let status = state.sessions.status(&user.user_id).await?;
    Ok(Json(status.into()))
}
