//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection from the load balancer
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (id, in-flight tracking)
//!     → agent_check.rs (write one status line, close)
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - The serving path only reads health state, never waits on a poll cycle

pub mod agent_check;
pub mod connection;
pub mod listener;

pub use agent_check::{AgentCheckServer, AgentResponse, MaintenanceGate};
pub use listener::{Listener, ListenerError};
