// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Treatment plan settings, read-only from this service's point of view.

use serde::{Deserialize, Serialize};

/// Daily wear target used when a user has no plan.
pub const DEFAULT_TARGET_HOURS: f64 = 22.0;

/// The subset of a user's plan that drives completion.
///
/// Stored under `users/{user_id}` as the `plan` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPlan {
    #[serde(default = "default_target_hours")]
    pub target_hours: f64,
}

fn default_target_hours() -> f64 {
    DEFAULT_TARGET_HOURS
}

impl Default for UserPlan {
    fn default() -> Self {
        Self {
            target_hours: DEFAULT_TARGET_HOURS,
        }
    }
}

impl UserPlan {
    /// Target in whole seconds (fractional seconds are truncated).
    pub fn target_seconds(&self) -> u64 {
        target_seconds(self.target_hours)
    }
}

/// Convert a target in hours to whole seconds. Negative or NaN targets clamp to zero.
pub fn target_seconds(target_hours: f64) -> u64 {
    if target_hours.is_finite() && target_hours > 0.0 {
        (target_hours * 3600.0) as u64
    } else {
        0
    }
}

/// Wrapper matching the user document layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDoc {
    #[serde(default)]
    pub plan: Option<UserPlan>,
}
