//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config (validated) → Announce checks → Spawn monitor → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Monitor leaves its loop, server stops accepting → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then monitor, then listener
//! - Ordered shutdown: stop accept, drain, close
//! - Draining has a deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
