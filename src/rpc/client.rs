//! Node telemetry client.
//!
//! # Responsibilities
//! - Issue the named JSON-RPC calls a health check needs
//! - Map transport, protocol and local failures onto [`RpcError`]
//! - Cache the epoch calendar per client (it never changes for a cluster)
//!
//! Deadlines are not applied here; callers wrap each call with
//! [`crate::resilience::timeouts::with_timeout`] so every call carries its own.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;

use crate::rpc::epoch::EpochSchedule;
use crate::rpc::types::{Commitment, EpochInfo, Identity, RpcError, RpcResult, Slot, Version};

/// The remote calls a node exposes for health checking.
///
/// Method names match the node's JSON-RPC surface.
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    /// Address of the node this client talks to.
    fn url(&self) -> &str;

    /// `getSlot`
    async fn get_slot(&self, commitment: Option<Commitment>) -> RpcResult<Slot>;

    /// `getEpochInfo`
    async fn get_epoch_info(&self, commitment: Option<Commitment>) -> RpcResult<EpochInfo>;

    /// `getEpochSchedule`
    async fn get_epoch_schedule(&self) -> RpcResult<EpochSchedule>;

    /// `minimumLedgerSlot`
    async fn minimum_ledger_slot(&self) -> RpcResult<Slot>;

    /// `getConfirmedBlocks`. `start_slot > end_slot` fails locally.
    async fn get_confirmed_blocks(&self, start_slot: Slot, end_slot: Slot) -> RpcResult<Vec<u64>>;

    /// `getMaxRetransmitSlot`
    async fn get_max_retransmit_slot(&self) -> RpcResult<Slot>;

    /// `getVersion`
    async fn get_version(&self) -> RpcResult<Version>;

    /// `getIdentity`
    async fn get_identity(&self) -> RpcResult<Identity>;

    /// `getGenesisHash`
    async fn get_genesis_hash(&self) -> RpcResult<String>;
}

/// Reject an inverted block range before anything goes on the wire.
pub fn check_block_range(url: &str, start_slot: Slot, end_slot: Slot) -> RpcResult<()> {
    if start_slot > end_slot {
        return Err(RpcError::Local {
            url: url.to_string(),
            method: "getConfirmedBlocks",
            message: format!(
                "start slot {} is greater than end slot {}",
                start_slot, end_slot
            ),
        });
    }
    Ok(())
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC over HTTP client for one node.
pub struct JsonRpcClient {
    url: String,
    http: reqwest::Client,
    schedule: OnceCell<EpochSchedule>,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Create a client; the epoch calendar is fetched on first use.
    pub fn new(url: impl Into<String>) -> Self {
        Self::build(url.into(), OnceCell::new())
    }

    /// Create a client whose epoch calendar is already known.
    pub fn with_schedule(url: impl Into<String>, schedule: EpochSchedule) -> Self {
        Self::build(url.into(), OnceCell::from(schedule))
    }

    fn build(url: String, schedule: OnceCell<EpochSchedule>) -> Self {
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            url,
            http,
            schedule,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &'static str, params: Value) -> RpcResult<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Network {
                url: self.url.clone(),
                method,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Network {
                url: self.url.clone(),
                method,
                message: format!("http status {}", status),
            });
        }

        let envelope: RpcResponse<T> = response.json().await.map_err(|e| RpcError::Protocol {
            url: self.url.clone(),
            method,
            message: format!("malformed response: {}", e),
        })?;

        if let Some(err) = envelope.error {
            return Err(RpcError::Protocol {
                url: self.url.clone(),
                method,
                message: format!("{} (code {})", err.message, err.code),
            });
        }

        envelope.result.ok_or_else(|| RpcError::Protocol {
            url: self.url.clone(),
            method,
            message: "nil result received".to_string(),
        })
    }
}

fn commitment_params(commitment: Option<Commitment>) -> Value {
    match commitment {
        Some(c) => json!([{ "commitment": c.as_str() }]),
        None => json!([]),
    }
}

#[async_trait]
impl TelemetryClient for JsonRpcClient {
    fn url(&self) -> &str {
        &self.url
    }

    async fn get_slot(&self, commitment: Option<Commitment>) -> RpcResult<Slot> {
        self.call("getSlot", commitment_params(commitment)).await
    }

    async fn get_epoch_info(&self, commitment: Option<Commitment>) -> RpcResult<EpochInfo> {
        self.call("getEpochInfo", commitment_params(commitment)).await
    }

    async fn get_epoch_schedule(&self) -> RpcResult<EpochSchedule> {
        self.schedule
            .get_or_try_init(|| self.call("getEpochSchedule", json!([])))
            .await
            .copied()
    }

    async fn minimum_ledger_slot(&self) -> RpcResult<Slot> {
        self.call("minimumLedgerSlot", json!([])).await
    }

    async fn get_confirmed_blocks(&self, start_slot: Slot, end_slot: Slot) -> RpcResult<Vec<u64>> {
        check_block_range(&self.url, start_slot, end_slot)?;
        self.call("getConfirmedBlocks", json!([start_slot, end_slot])).await
    }

    async fn get_max_retransmit_slot(&self) -> RpcResult<Slot> {
        self.call("getMaxRetransmitSlot", json!([])).await
    }

    async fn get_version(&self) -> RpcResult<Version> {
        self.call("getVersion", json!([])).await
    }

    async fn get_identity(&self) -> RpcResult<Identity> {
        self.call("getIdentity", json!([])).await
    }

    async fn get_genesis_hash(&self) -> RpcResult<String> {
        self.call("getGenesisHash", json!([])).await
    }
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("url", &self.url)
            .field("schedule_cached", &self.schedule.initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on port 1; any request that goes out fails as a network error.
    const DEAD_NODE: &str = "http://127.0.0.1:1";

    #[tokio::test]
    async fn test_inverted_block_range_fails_locally() {
        let client = JsonRpcClient::new(DEAD_NODE);
        let err = client.get_confirmed_blocks(500, 100).await.unwrap_err();
        assert!(matches!(err, RpcError::Local { method: "getConfirmedBlocks", .. }));
        assert!(err.to_string().contains("start slot 500 is greater than end slot 100"));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_network_error() {
        let client = JsonRpcClient::new(DEAD_NODE);
        let err = client.get_slot(Some(Commitment::Confirmed)).await.unwrap_err();
        assert!(matches!(err, RpcError::Network { method: "getSlot", .. }));
        assert_eq!(err.url(), DEAD_NODE);
    }

    #[tokio::test]
    async fn test_seeded_schedule_skips_the_network() {
        let schedule = EpochSchedule::default();
        let client = JsonRpcClient::with_schedule(DEAD_NODE, schedule);
        assert_eq!(client.get_epoch_schedule().await.unwrap(), schedule);
    }

    #[test]
    fn test_commitment_params() {
        assert_eq!(commitment_params(None), json!([]));
        assert_eq!(
            commitment_params(Some(Commitment::Processed)),
            json!([{ "commitment": "processed" }])
        );
    }
}
