//! Refresh cadence.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sw_cache_core::AppConfig;

/// What asked for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTrigger {
    /// Scheduler tick.
    Timer,
    /// A client became visible again.
    Visible,
    /// Explicit request; ignores the interval.
    Manual,
}

/// Decides whether a refresh is due from the last recorded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    interval: Duration,
}

impl RefreshSchedule {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.refresh_interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// A refresh that never ran is always due. A last run in the future
    /// (clock moved backwards) counts as not due.
    pub fn is_due(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(last) = last else {
            return true;
        };
        match (now - last).to_std() {
            Ok(elapsed) => elapsed >= self.interval,
            Err(_) => false,
        }
    }

    /// Whether `trigger` should start a refresh given the last run.
    pub fn should_run(&self, trigger: RefreshTrigger, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        trigger == RefreshTrigger::Manual || self.is_due(last, now)
    }
}
