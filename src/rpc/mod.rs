//! Node RPC subsystem.
//!
//! # Data Flow
//! ```text
//! health::snapshot (one call per metric, each with its own deadline)
//!     → client.rs (TelemetryClient: named JSON-RPC calls over HTTP)
//!     → types.rs (Slot, EpochInfo, Version, RpcError)
//!     → epoch.rs (EpochSchedule: epoch ↔ slot range)
//! ```
//!
//! # Design Decisions
//! - The client is a trait so the health engine can be driven without a network
//! - Errors are tagged by cause (network, timeout, protocol, local) and carry url + method
//! - The epoch calendar is cached per client and handed out by value

pub mod client;
pub mod epoch;
pub mod types;

pub use client::{JsonRpcClient, TelemetryClient};
pub use epoch::{EpochSchedule, MINIMUM_SLOTS_PER_EPOCH};
pub use types::{Commitment, Epoch, EpochInfo, Identity, RpcError, RpcResult, Slot, Version};
