// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Protected routes accept requests with valid tokens
//! 3. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;
use common::{create_test_jwt, TestApp};

async fn get_status(app: &TestApp, auth: Option<String>) -> axum::response::Response {
    let mut builder = Request::builder().method("GET").uri("/api/timer/status");
    if let Some(value) = auth {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    app.router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = TestApp::new("2024-06-01T08:00:00");
    let response = get_status(&app, None).await;

    // Should return 401 Unauthorized without token
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let app = TestApp::new("2024-06-01T08:00:00");
    let response = get_status(&app, Some("Bearer invalid.token.here".to_string())).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_token_signed_with_wrong_key() {
    let app = TestApp::new("2024-06-01T08:00:00");
    let token = create_test_jwt("alice", b"some_other_key_entirely", 3600);
    let response = get_status(&app, Some(format!("Bearer {}", token))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = TestApp::new("2024-06-01T08:00:00");
    let key = app.state.config.jwt_signing_key.clone();
    // Well past the default validation leeway
    let token = create_test_jwt("alice", &key, -3600);
    let response = get_status(&app, Some(format!("Bearer {}", token))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_scheme_rejected() {
    let app = TestApp::new("2024-06-01T08:00:00");
    let token = app.token("alice");
    let response = get_status(&app, Some(format!("Basic {}", token))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_valid_token() {
    let app = TestApp::new("2024-06-01T08:00:00");
    let key = app.state.config.jwt_signing_key.clone();
    let token = create_test_jwt("alice", &key, 86400);
    let response = get_status(&app, Some(format!("Bearer {}", token))).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_blank_subject_rejected() {
    let app = TestApp::new("2024-06-01T08:00:00");
    let key = app.state.config.jwt_signing_key.clone();
    let token = create_test_jwt("  ", &key, 3600);
    let response = get_status(&app, Some(format!("Bearer {}", token))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = TestApp::new("2024-06-01T08:00:00");

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/timer/start")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);

    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let app = TestApp::new("2024-06-01T08:00:00");

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
}
