// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod plan;
pub mod record;
pub mod session;
pub mod stats;

pub use plan::UserPlan;
pub use record::DailyRecord;
pub use session::{SessionClose, WearSession};
pub use stats::{Achievements, DayEntry, WeeklyStats};
