// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Concurrent start/stop races against the in-memory store.

use aligner_tracker::db::{MemoryStore, WearStore};
use aligner_tracker::error::AppError;
use aligner_tracker::services::{ManualClock, SessionService};
use aligner_tracker::time_utils::parse_date;
use std::sync::Arc;

mod common;
use common::ts;

const NUM_CONCURRENT_CALLS: usize = 16;

fn service(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> SessionService {
    SessionService::new(store, clock, 22.0)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_starts_open_exactly_one_session() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(ts("2024-06-01T08:00:00")));
    let sessions = service(store.clone(), clock);

    let mut handles = vec![];
    for _ in 0..NUM_CONCURRENT_CALLS {
        let sessions = sessions.clone();
        handles.push(tokio::spawn(async move { sessions.start("alice").await }));
    }

    let mut started = 0;
    for handle in handles {
        match handle.await.expect("Task join failed") {
            Ok(_) => started += 1,
            Err(AppError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(started, 1);
    assert_eq!(store.find_open_sessions("alice").await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stops_credit_once() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(ts("2024-06-01T08:00:00")));
    let sessions = service(store.clone(), clock.clone());

    let started = sessions.start("alice").await.unwrap();
    clock.advance(chrono::Duration::hours(2));

    let mut handles = vec![];
    for _ in 0..NUM_CONCURRENT_CALLS {
        let sessions = sessions.clone();
        let session_id = started.session_id.clone();
        handles.push(tokio::spawn(
            async move { sessions.stop("alice", &session_id).await },
        ));
    }

    let mut stopped = 0;
    for handle in handles {
        match handle.await.expect("Task join failed") {
            Ok(outcome) => {
                stopped += 1;
                assert_eq!(outcome.duration_seconds, 7200);
            }
            Err(AppError::AlreadyClosed(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(stopped, 1);
    let record = store
        .find_daily_record("alice", parse_date("2024-06-01").unwrap())
        .await
        .unwrap()
        .expect("record exists");
    assert_eq!(record.total_seconds, 7200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sequential_sessions_same_day_accumulate() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(ts("2024-06-01T08:00:00")));
    let sessions = service(store.clone(), clock.clone());

    for round in 0..5 {
        let started = sessions.start("alice").await.unwrap();
        clock.advance(chrono::Duration::minutes(30));
        let stopped = sessions.stop("alice", &started.session_id).await.unwrap();
        assert_eq!(stopped.day_total, (round + 1) * 1800);
    }
}
