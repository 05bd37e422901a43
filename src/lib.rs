// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Aligner-Tracker: wear-time tracking for clear aligner treatment
//!
//! This crate provides the backend API for timing aligner wear sessions,
//! rolling them up into daily totals, and reporting streaks and weekly stats.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::WearStore;
use services::{Clock, ExpirySweeper, SessionService, StatsService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn WearStore>,
    pub clock: Arc<dyn Clock>,
    pub sessions: SessionService,
    pub stats: StatsService,
}

impl AppState {
    /// Wire the services over one store and clock.
    pub fn new(config: Config, store: Arc<dyn WearStore>, clock: Arc<dyn Clock>) -> Self {
        let sessions =
            SessionService::new(store.clone(), clock.clone(), config.default_target_hours);
        let stats = StatsService::new(store.clone(), clock.clone(), config.default_target_hours);
        Self {
            config,
            store,
            clock,
            sessions,
            stats,
        }
    }

    pub fn sweeper(&self) -> ExpirySweeper {
        ExpirySweeper::new(self.store.clone(), self.sessions.clone(), self.clock.clone())
    }
}
