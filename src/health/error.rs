//! Health-check error definitions.

use thiserror::Error;

use crate::rpc::RpcError;

/// Errors raised while assembling the fleet view for a cycle.
///
/// None of these is fatal: the monitor turns each into a load failure or an
/// immediate Down, and the agent keeps serving the last known answer.
#[derive(Debug, Clone, Error)]
pub enum HealthCheckError {
    /// A node's snapshot is unusable this cycle.
    #[error("[{node}] health-check error, {errors} failed call(s), first: {source}")]
    SnapshotLoad {
        node: String,
        errors: usize,
        source: RpcError,
    },

    /// Too few nodes produced a usable snapshot to compare against.
    #[error("couldn't fetch enough nodes: {survived} usable, {required} required")]
    InsufficientPeers { survived: usize, required: usize },

    /// No node was configured.
    #[error("need at least one node")]
    NoNodes,

    /// The monitored node has no usable snapshot this cycle.
    #[error("[{node}] not found among usable node states")]
    TargetUnreachable { node: String },
}

/// Result type for health-check operations.
pub type HealthResult<T> = Result<T, HealthCheckError>;
