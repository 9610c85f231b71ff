//! Worker lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sw_cache_core::Error;

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Constructed, install not started.
    #[default]
    Parsed,
    /// Install running.
    Installing,
    /// Installed and waiting to activate.
    Installed,
    /// Activation running.
    Activating,
    /// Active and intercepting requests.
    Activated,
    /// Install failed or replaced. Terminal.
    Redundant,
}

impl WorkerState {
    /// Only an active worker intercepts requests.
    pub fn can_intercept(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }

    fn can_move_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Activated)
                | (Parsed | Installing | Installed | Activating | Activated, Redundant)
        )
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Current state plus the skip-waiting request flag.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: WorkerState,
    skip_waiting: bool,
    changed_at: DateTime<Utc>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::starting_at(WorkerState::Parsed)
    }

    /// A lifecycle that starts in `state`, used when resuming an already
    /// activated generation after a restart.
    pub fn starting_at(state: WorkerState) -> Self {
        Self { state, skip_waiting: false, changed_at: Utc::now() }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting
    }

    pub fn request_skip_waiting(&mut self) {
        self.skip_waiting = true;
    }

    pub fn changed_at(&self) -> DateTime<Utc> {
        self.changed_at
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: WorkerState) -> Result<(), Error> {
        if !self.state.can_move_to(next) {
            return Err(Error::InvalidState(format!("cannot move from {} to {next}", self.state)));
        }
        tracing::info!(from = %self.state, to = %next, "worker state change");
        self.state = next;
        self.changed_at = Utc::now();
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
