//! Node health state machine.
//!
//! # States
//! - Up: the load balancer may route to the node
//! - Down: the node is excluded
//!
//! # State Transitions
//! ```text
//! Up → Down:   consecutive failing cycles >= down_threshold
//! Down → Up:   consecutive passing cycles >= up_threshold
//! any → Down:  target missing from the fleet (immediate)
//! ```
//!
//! Load failures (the cycle itself could not be assessed) never move the
//! status; enough of them in a row make the reported answer `down #stale`.
//!
//! # Design Decisions
//! - Hysteresis prevents flapping
//! - State changes logged for observability
//! - Counters reset on state transition

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::config::HysteresisConfig;
use crate::health::evaluator::{FailureReason, FailureReasons};
use crate::observability::metrics;

/// Reported node status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Up,
    Down,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Up => "up",
            Status::Down => "down",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status plus the counters driving hysteresis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hysteresis {
    pub status: Status,
    pub rise: u32,
    pub fall: u32,
    pub last_failure: Option<String>,
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self {
            status: Status::Down,
            rise: 0,
            fall: 0,
            last_failure: None,
        }
    }
}

/// The answer given to an agent-check connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedStatus {
    /// Too many consecutive load failures to trust the stored status.
    Stale,
    Current {
        status: Status,
        reason: Option<String>,
    },
}

impl ReportedStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, ReportedStatus::Current { status: Status::Up, .. })
    }
}

impl fmt::Display for ReportedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportedStatus::Stale => f.write_str("down #stale"),
            ReportedStatus::Current { status, reason: None } => write!(f, "{}", status),
            ReportedStatus::Current {
                status,
                reason: Some(reason),
            } => write!(f, "{} #{}", status, reason),
        }
    }
}

/// Hysteresis over per-cycle verdicts, shared by the monitor (writer) and
/// the agent-check server (readers).
#[derive(Debug)]
pub struct HealthStateMachine {
    config: HysteresisConfig,
    state: RwLock<Hysteresis>,
    load_failures: AtomicU64,
}

impl HealthStateMachine {
    pub fn new(config: HysteresisConfig) -> Self {
        Self {
            config,
            state: RwLock::new(Hysteresis::default()),
            load_failures: AtomicU64::new(0),
        }
    }

    /// Copy of the status tuple.
    pub fn snapshot(&self) -> Hysteresis {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn load_failures(&self) -> u64 {
        self.load_failures.load(Ordering::SeqCst)
    }

    /// Target missing from the fleet: Down now, no hysteresis.
    pub fn register_down_immediate(&self, reason: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.status != Status::Down {
            tracing::warn!(reason, "Node down (immediate)");
        }
        state.status = Status::Down;
        state.rise = 0;
        state.fall = 0;
        state.last_failure = Some(reason.to_string());
        metrics::record_status(Status::Down);
    }

    /// The cycle could not be assessed.
    pub fn register_load_failure(&self, reason: &str) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.last_failure = Some(reason.to_string());
        }
        let failures = self.load_failures.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::warn!(reason, consecutive = failures, "Load failure");
        metrics::record_load_failure(reason);
    }

    /// The evaluator reported at least one failure.
    pub fn register_down(&self, reasons: &[FailureReason]) {
        let reason = FailureReasons(reasons).to_string();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.last_failure = Some(reason);
        state.rise = 0;

        let current = state.status;
        match current {
            Status::Down => state.fall = 0,
            Status::Up => {
                state.fall += 1;
                if state.fall >= self.config.down_threshold {
                    state.status = Status::Down;
                    state.fall = 0;
                    tracing::warn!(
                        reasons = %FailureReasons(reasons),
                        threshold = self.config.down_threshold,
                        "Node transitioned to down"
                    );
                    metrics::record_status(Status::Down);
                }
            }
        }
    }

    /// The evaluator reported no failures.
    pub fn register_up(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.last_failure = None;
        state.fall = 0;

        let current = state.status;
        match current {
            Status::Up => state.rise = 0,
            Status::Down => {
                state.rise += 1;
                if state.rise >= self.config.up_threshold {
                    state.status = Status::Up;
                    state.rise = 0;
                    tracing::info!(threshold = self.config.up_threshold, "Node transitioned to up");
                    metrics::record_status(Status::Up);
                }
            }
        }
    }

    /// A poll completed; whatever the verdict, the data is fresh.
    pub fn register_poll_success(&self) {
        self.load_failures.store(0, Ordering::SeqCst);
    }

    /// The answer for an agent-check connection.
    pub fn reported_status(&self) -> ReportedStatus {
        if self.load_failures() > self.config.stale_after {
            return ReportedStatus::Stale;
        }
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        ReportedStatus::Current {
            status: state.status,
            reason: state.last_failure.clone(),
        }
    }
}
