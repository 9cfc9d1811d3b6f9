//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Remote call to a node:
//!     → timeouts.rs (enforce the per-call deadline)
//!     → On failure: recorded on the node snapshot, siblings keep running
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries inside a cycle; the next poll is the retry

pub mod timeouts;
