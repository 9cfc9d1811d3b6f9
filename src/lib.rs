//! RPC node health-check agent.
//!
//! Polls a ledger RPC node and its reference peers, compares the node against
//! the best of the fleet, and answers load-balancer agent checks with a single
//! status line.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod rpc;

pub use config::schema::AgentConfig;
pub use health::{FleetAggregator, HealthMonitor, HealthStateMachine};
pub use lifecycle::Shutdown;
pub use net::AgentCheckServer;
