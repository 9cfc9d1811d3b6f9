//! Ledger types and error definitions shared by the RPC layer.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Ledger position counter.
pub type Slot = u64;

/// Era index; a span of slots.
pub type Epoch = u64;

/// Commitment level attached to a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Commitment {
    Max,
    Recent,
    Confirmed,
    Finalized,
    Root,
    Single,
    SingleGossip,
    Processed,
}

impl Commitment {
    /// Wire name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Max => "max",
            Commitment::Recent => "recent",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
            Commitment::Root => "root",
            Commitment::Single => "single",
            Commitment::SingleGossip => "singleGossip",
            Commitment::Processed => "processed",
        }
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of `getEpochInfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochInfo {
    pub absolute_slot: Slot,
    pub block_height: u64,
    pub epoch: Epoch,
    pub slot_index: u64,
    pub slots_in_epoch: u64,
    #[serde(default)]
    pub transaction_count: u64,
}

/// Result of `getVersion`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(rename = "feature-set", default)]
    pub feature_set: u64,
    #[serde(rename = "solana-core")]
    pub core_version: String,
}

/// Result of `getIdentity`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub identity: String,
}

/// Errors from a single remote call.
///
/// Every variant names the node and the method so a failure recorded on a
/// snapshot can be traced back without extra context.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// Transport failed: connection refused, reset, non-2xx HTTP status.
    #[error("[{url}].[{method}] network error: {message}")]
    Network {
        url: String,
        method: &'static str,
        message: String,
    },

    /// The call did not complete within its deadline.
    #[error("[{url}].[{method}] timed out after {after:?}")]
    Timeout {
        url: String,
        method: &'static str,
        after: Duration,
    },

    /// The node answered, but with an error object or an unusable payload.
    #[error("[{url}].[{method}] rpc error: {message}")]
    Protocol {
        url: String,
        method: &'static str,
        message: String,
    },

    /// Rejected before anything was sent.
    #[error("[{url}].[{method}] local error: {message}")]
    Local {
        url: String,
        method: &'static str,
        message: String,
    },
}

impl RpcError {
    /// The method the failed call targeted.
    pub fn method(&self) -> &'static str {
        match self {
            RpcError::Network { method, .. }
            | RpcError::Timeout { method, .. }
            | RpcError::Protocol { method, .. }
            | RpcError::Local { method, .. } => method,
        }
    }

    /// The node the failed call targeted.
    pub fn url(&self) -> &str {
        match self {
            RpcError::Network { url, .. }
            | RpcError::Timeout { url, .. }
            | RpcError::Protocol { url, .. }
            | RpcError::Local { url, .. } => url,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout { .. })
    }
}

/// Result type for remote calls.
pub type RpcResult<T> = Result<T, RpcError>;
