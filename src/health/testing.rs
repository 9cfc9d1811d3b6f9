//! In-memory telemetry client for unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::rpc::{
    Commitment, EpochInfo, EpochSchedule, Identity, RpcError, RpcResult, Slot, TelemetryClient,
    Version,
};

/// A node whose answers are fixed up front.
///
/// Every slot up to the current one holds a confirmed block. Methods listed
/// as failing answer with a network error; stalled methods never answer.
pub(crate) struct ScriptedClient {
    url: String,
    schedule: EpochSchedule,
    slot: Slot,
    minimum_slot: Slot,
    failing: Vec<&'static str>,
    stalled: Vec<&'static str>,
    calls: AtomicUsize,
    block_queries: Mutex<Vec<(Slot, Slot)>>,
}

impl ScriptedClient {
    pub(crate) fn healthy(url: &str, slot: Slot) -> Self {
        Self {
            url: url.to_string(),
            schedule: EpochSchedule::default(),
            slot,
            minimum_slot: 0,
            failing: Vec::new(),
            stalled: Vec::new(),
            calls: AtomicUsize::new(0),
            block_queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(mut self, method: &'static str) -> Self {
        self.failing.push(method);
        self
    }

    pub(crate) fn stalled(mut self, method: &'static str) -> Self {
        self.stalled.push(method);
        self
    }

    pub(crate) fn with_minimum_slot(mut self, slot: Slot) -> Self {
        self.minimum_slot = slot;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn block_queries(&self) -> Vec<(Slot, Slot)> {
        self.block_queries.lock().unwrap().clone()
    }

    async fn answer<T>(&self, method: &'static str, value: T) -> RpcResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stalled.contains(&method) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&method) {
            return Err(RpcError::Network {
                url: self.url.clone(),
                method,
                message: "connection refused".to_string(),
            });
        }
        Ok(value)
    }
}

#[async_trait]
impl TelemetryClient for ScriptedClient {
    fn url(&self) -> &str {
        &self.url
    }

    async fn get_slot(&self, commitment: Option<Commitment>) -> RpcResult<Slot> {
        let slot = match commitment {
            Some(Commitment::Processed) => self.slot + 2,
            _ => self.slot,
        };
        self.answer("getSlot", slot).await
    }

    async fn get_epoch_info(&self, _commitment: Option<Commitment>) -> RpcResult<EpochInfo> {
        let (epoch, slot_index) = self
            .schedule
            .epoch_and_offset_for_slot(self.slot)
            .unwrap_or((0, self.slot));
        let info = EpochInfo {
            absolute_slot: self.slot,
            block_height: self.slot,
            epoch,
            slot_index,
            slots_in_epoch: self.schedule.slots_in_epoch(epoch),
            transaction_count: 0,
        };
        self.answer("getEpochInfo", info).await
    }

    async fn get_epoch_schedule(&self) -> RpcResult<EpochSchedule> {
        self.answer("getEpochSchedule", self.schedule).await
    }

    async fn minimum_ledger_slot(&self) -> RpcResult<Slot> {
        self.answer("minimumLedgerSlot", self.minimum_slot).await
    }

    async fn get_confirmed_blocks(&self, start_slot: Slot, end_slot: Slot) -> RpcResult<Vec<u64>> {
        crate::rpc::client::check_block_range(&self.url, start_slot, end_slot)?;
        self.block_queries.lock().unwrap().push((start_slot, end_slot));
        let blocks = (start_slot..=end_slot.min(self.slot)).collect();
        self.answer("getConfirmedBlocks", blocks).await
    }

    async fn get_max_retransmit_slot(&self) -> RpcResult<Slot> {
        self.answer("getMaxRetransmitSlot", self.slot + 5).await
    }

    async fn get_version(&self) -> RpcResult<Version> {
        let version = Version {
            feature_set: 1_879_391_783,
            core_version: "1.14.17".to_string(),
        };
        self.answer("getVersion", version).await
    }

    async fn get_identity(&self) -> RpcResult<Identity> {
        let identity = Identity {
            identity: format!("{}-identity", self.url),
        };
        self.answer("getIdentity", identity).await
    }

    async fn get_genesis_hash(&self) -> RpcResult<String> {
        self.answer("getGenesisHash", "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdpKuc147dw2N9d".to_string())
            .await
    }
}
