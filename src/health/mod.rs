//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (monitor.rs):
//!     → fleet.rs polls every node concurrently
//!         → snapshot.rs loads one node (per-call deadlines)
//!     → errored snapshots dropped, survivors published
//!     → evaluator.rs compares the target against the fleet baseline
//!     → state.rs applies hysteresis
//!
//! Agent-check connection (net::agent_check):
//!     → state.rs reported status
//! ```
//!
//! # Design Decisions
//! - The monitor is the only writer; readers never block a cycle
//! - State transitions require consecutive passes/failures
//! - A cycle that cannot be assessed counts towards staleness, not towards Down

pub mod error;
pub mod evaluator;
pub mod fleet;
pub mod monitor;
pub mod snapshot;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{HealthCheckError, HealthResult};
pub use evaluator::{FailureReason, FailureReasons, HealthEvaluator};
pub use fleet::{Fleet, FleetAggregator, FleetBaseline};
pub use monitor::{CycleOutcome, HealthMonitor};
pub use snapshot::{NodeSnapshot, SnapshotOptions};
pub use state::{HealthStateMachine, ReportedStatus, Status};
