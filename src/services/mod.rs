// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregation;
pub mod clock;
pub mod session;
pub mod stats;
pub mod sweeper;

pub use aggregation::{Aggregator, DayTotal};
pub use clock::{Clock, ManualClock, SystemClock};
pub use session::{SessionService, StartOutcome, StopOutcome, TimerStatus, MAX_SESSION_SECONDS};
pub use stats::StatsService;
pub use sweeper::{ExpirySweeper, SweepResult};
