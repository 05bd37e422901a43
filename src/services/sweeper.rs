// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic expiry sweep across all users.
//!
//! Start and status already sweep inline for the calling user. This task
//! closes sessions of users who never come back.

use chrono::Duration;
use futures_util::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::db::WearStore;
use crate::error::Result;
use crate::services::clock::Clock;
use crate::services::session::{SessionService, MAX_SESSION_SECONDS};

/// Maximum users swept concurrently.
const MAX_CONCURRENT_SWEEPS: usize = 16;

/// Outcome of one sweep pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepResult {
    pub users: usize,
    pub closed: usize,
    pub failed_users: Vec<String>,
}

#[derive(Clone)]
pub struct ExpirySweeper {
    store: Arc<dyn WearStore>,
    sessions: SessionService,
    clock: Arc<dyn Clock>,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn WearStore>, sessions: SessionService, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            sessions,
            clock,
        }
    }

    /// Auto-close every expired session in the store.
    ///
    /// A failure for one user is logged and does not stop the others.
    pub async fn run_once(&self) -> Result<SweepResult> {
        let cutoff = self.clock.now() - Duration::seconds(MAX_SESSION_SECONDS);
        let users: BTreeSet<String> = self
            .store
            .list_expired_sessions(cutoff)
            .await?
            .into_iter()
            .map(|s| s.user_id)
            .collect();

        if users.is_empty() {
            return Ok(SweepResult::default());
        }

        let outcomes: Vec<(String, Result<usize>)> = stream::iter(users)
            .map(|user_id| async move {
                let outcome = self.sessions.auto_close_expired(&user_id).await;
                (user_id, outcome)
            })
            .buffer_unordered(MAX_CONCURRENT_SWEEPS)
            .collect()
            .await;

        let mut result = SweepResult {
            users: outcomes.len(),
            ..SweepResult::default()
        };
        for (user_id, outcome) in outcomes {
            match outcome {
                Ok(closed) => result.closed += closed,
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Expiry sweep failed for user");
                    result.failed_users.push(user_id);
                }
            }
        }

        tracing::info!(
            users = result.users,
            closed = result.closed,
            failed = result.failed_users.len(),
            "Expiry sweep complete"
        );
        Ok(result)
    }

    /// Run `run_once` every `period` until the task is aborted.
    pub fn spawn(self, period: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    tracing::error!(error = %e, "Expiry sweep could not list sessions");
                }
            }
        })
    }
}
