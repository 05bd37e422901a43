// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Statistics endpoints over seeded daily records.

use aligner_tracker::models::DailyRecord;
use aligner_tracker::time_utils::parse_date;
use axum::http::StatusCode;

mod common;
use common::TestApp;

fn seed(app: &TestApp, user_id: &str, date: &str, hours: f64, completed: bool) {
    app.store.insert_daily_record(DailyRecord {
        user_id: user_id.to_string(),
        date: parse_date(date).unwrap(),
        total_seconds: (hours * 3600.0) as u64,
        completed: Some(completed),
    });
}

#[tokio::test]
async fn test_weekly_report_empty_history() {
    // Wednesday
    let app = TestApp::new("2024-06-05T12:00:00");

    let (status, body) = app.call("GET", "/api/stats/weekly", "alice", None).await;
    assert_eq!(status, StatusCode::OK);

    let week = body["week_data"].as_array().unwrap();
    assert_eq!(week.len(), 7);
    assert_eq!(week[0]["date"], "2024-06-03");
    assert_eq!(week[6]["date"], "2024-06-09");
    assert!(week.iter().all(|d| d["hours"] == 0.0 && d["completed"] == false));
    assert_eq!(body["avg_hours"], 0.0);
    assert_eq!(body["completion_rate"], 0.0);
    assert_eq!(body["current_streak"], 0);
    assert!(!body["suggestions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_weekly_report_with_records() {
    let app = TestApp::new("2024-06-05T12:00:00");
    seed(&app, "alice", "2024-06-01", 22.0, true);
    seed(&app, "alice", "2024-06-02", 23.0, true);
    seed(&app, "alice", "2024-06-03", 22.5, true);
    seed(&app, "alice", "2024-06-04", 12.0, false);
    seed(&app, "bob", "2024-06-04", 23.0, true);

    let (_, body) = app.call("GET", "/api/stats/weekly", "alice", None).await;

    assert_eq!(body["week_data"][0]["hours"], 22.5);
    assert_eq!(body["week_data"][1]["completed"], false);
    // (22.5 + 12.0) / 7
    assert_eq!(body["avg_hours"], 4.9);
    assert_eq!(body["completion_rate"], 14.3);
    assert_eq!(body["current_streak"], 0);
    assert_eq!(body["longest_streak"], 3);
    assert_eq!(body["total_completed_days"], 3);
}

#[tokio::test]
async fn test_achievements() {
    let app = TestApp::new("2024-06-05T12:00:00");
    seed(&app, "alice", "2024-06-01", 22.0, true);
    seed(&app, "alice", "2024-06-02", 10.0, false);
    seed(&app, "alice", "2024-06-03", 22.0, true);
    seed(&app, "alice", "2024-06-04", 23.0, true);

    let (status, body) = app.call("GET", "/api/stats/achievements", "alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_streak"], 2);
    assert_eq!(body["longest_streak"], 2);
    assert_eq!(body["total_completed_days"], 3);
    assert_eq!(body["total_days"], 4);
    assert_eq!(body["completion_rate"], 75);
    assert_eq!(body["total_seconds"], 77 * 3600);

    let (_, body) = app.call("GET", "/api/stats/achievements", "nobody", None).await;
    assert_eq!(body["total_days"], 0);
    assert_eq!(body["completion_rate"], 0);
}

#[tokio::test]
async fn test_records_newest_first_with_default_limit() {
    let app = TestApp::new("2024-06-05T12:00:00");
    let start = parse_date("2024-01-01").unwrap();
    for offset in 0..40 {
        let date = start + chrono::Duration::days(offset);
        seed(&app, "alice", &date.to_string(), 20.0, false);
    }

    let (_, body) = app.call("GET", "/api/stats/records", "alice", None).await;
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 30);
    assert_eq!(records[0]["date"], "2024-02-09");
    assert_eq!(records[29]["date"], "2024-01-11");

    let (_, body) = app
        .call(
            "GET",
            "/api/stats/records?start_date=2024-01-05&end_date=2024-01-07&limit=2",
            "alice",
            None,
        )
        .await;
    let dates: Vec<&str> = body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-01-07", "2024-01-06"]);
}
