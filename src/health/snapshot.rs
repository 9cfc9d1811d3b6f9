//! Per-node snapshot loading.
//!
//! # Responsibilities
//! - Gather everything one cycle needs to know about one node
//! - Wrap every remote call in its own deadline
//! - Record failed calls on the snapshot instead of aborting the cycle
//!
//! # Load Order
//! ```text
//! epoch info → epoch calendar           (failure: stop here)
//!     → current / processed / max-retransmit slot, minimum ledger slot   (concurrent)
//!     → confirmed blocks for previous and current epoch                  (concurrent, optional)
//!     → version / identity / genesis hash                                (concurrent, optional)
//! ```

use serde::{Serialize, Serializer};
use std::time::Duration;

use crate::health::error::HealthCheckError;
use crate::resilience::timeouts::with_timeout;
use crate::rpc::{
    Commitment, Epoch, EpochInfo, EpochSchedule, Identity, RpcError, RpcResult, Slot,
    TelemetryClient, Version,
};

/// What to load beyond the mandatory epoch and slot data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Deadline applied to each remote call.
    pub rpc_timeout: Duration,
    /// Load the minimum stored slot.
    pub load_ledger: bool,
    /// Load confirmed block ids for the previous and current epoch.
    pub load_blocks: bool,
    /// Load version, identity and genesis hash.
    pub load_meta: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(10),
            load_ledger: false,
            load_blocks: false,
            load_meta: false,
        }
    }
}

/// Everything known about one node for one cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeSnapshot {
    pub node: String,
    pub epoch: Option<EpochInfo>,
    pub schedule: Option<EpochSchedule>,
    pub current_slot: Slot,
    pub processed_slot: Slot,
    pub max_retransmit_slot: Slot,
    /// Lowest slot still stored; 0 when not loaded.
    pub minimum_slot: Slot,
    pub prev_epoch_blocks: Vec<u64>,
    pub cur_epoch_blocks: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genesis_hash: Option<String>,
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<RpcError>,
}

fn serialize_errors<S: Serializer>(errors: &[RpcError], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

impl NodeSnapshot {
    /// Empty snapshot for `node`.
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            ..Default::default()
        }
    }

    /// Load a snapshot from `client`. Never fails: failed calls are recorded.
    pub async fn load(client: &dyn TelemetryClient, options: &SnapshotOptions) -> Self {
        let mut snapshot = NodeSnapshot::new(client.url());

        let Some((epoch, schedule)) = snapshot.load_epoch(client, options).await else {
            return snapshot;
        };

        snapshot.load_slots(client, options).await;

        if options.load_blocks {
            snapshot.load_blocks(client, options, epoch, &schedule).await;
        }

        if options.load_meta {
            snapshot.load_meta(client, options).await;
        }

        tracing::debug!(
            node = %snapshot.node,
            slot = snapshot.current_slot,
            errors = snapshot.errors.len(),
            "Snapshot loaded"
        );
        snapshot
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// `Ok` when the snapshot may take part in aggregation.
    pub fn check(&self) -> Result<(), HealthCheckError> {
        match self.errors.first() {
            None => Ok(()),
            Some(first) => Err(HealthCheckError::SnapshotLoad {
                node: self.node.clone(),
                errors: self.errors.len(),
                source: first.clone(),
            }),
        }
    }

    pub fn prev_epoch_block_count(&self) -> usize {
        self.prev_epoch_blocks.len()
    }

    pub fn cur_epoch_block_count(&self) -> usize {
        self.cur_epoch_blocks.len()
    }

    fn record(&mut self, err: RpcError) {
        tracing::warn!(node = %self.node, method = err.method(), error = %err, "RPC call failed");
        self.errors.push(err);
    }

    fn take<T: Default>(&mut self, result: RpcResult<T>) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                self.record(e);
                T::default()
            }
        }
    }

    async fn load_epoch(
        &mut self,
        client: &dyn TelemetryClient,
        options: &SnapshotOptions,
    ) -> Option<(Epoch, EpochSchedule)> {
        let info = with_timeout(
            client.url(),
            "getEpochInfo",
            options.rpc_timeout,
            client.get_epoch_info(None),
        )
        .await;
        let info = match info {
            Ok(info) => info,
            Err(e) => {
                self.record(e);
                return None;
            }
        };
        self.epoch = Some(info);

        let schedule = with_timeout(
            client.url(),
            "getEpochSchedule",
            options.rpc_timeout,
            client.get_epoch_schedule(),
        )
        .await;
        match schedule {
            Ok(schedule) => {
                self.schedule = Some(schedule);
                Some((info.epoch, schedule))
            }
            Err(e) => {
                self.record(e);
                None
            }
        }
    }

    async fn load_slots(&mut self, client: &dyn TelemetryClient, options: &SnapshotOptions) {
        let url = client.url();
        let deadline = options.rpc_timeout;

        let (current, processed, retransmit, minimum) = tokio::join!(
            with_timeout(url, "getSlot", deadline, client.get_slot(Some(Commitment::Confirmed))),
            with_timeout(url, "getSlot", deadline, client.get_slot(Some(Commitment::Processed))),
            with_timeout(url, "getMaxRetransmitSlot", deadline, client.get_max_retransmit_slot()),
            async {
                if options.load_ledger {
                    Some(with_timeout(url, "minimumLedgerSlot", deadline, client.minimum_ledger_slot()).await)
                } else {
                    None
                }
            },
        );

        self.current_slot = self.take(current);
        self.processed_slot = self.take(processed);
        self.max_retransmit_slot = self.take(retransmit);
        if let Some(minimum) = minimum {
            self.minimum_slot = self.take(minimum);
        }
    }

    /// Slot range to query for `epoch`, clipped to what the node still stores.
    fn block_range(&self, schedule: &EpochSchedule, epoch: Epoch) -> Option<(Slot, Slot)> {
        let first = schedule.first_slot_in_epoch(epoch);
        let last = schedule.last_slot_in_epoch(epoch);

        if self.minimum_slot == 0 {
            return Some((first, last));
        }
        if last < self.minimum_slot {
            tracing::debug!(
                node = %self.node,
                epoch,
                minimum_slot = self.minimum_slot,
                "Epoch already pruned, skipping block query"
            );
            return None;
        }
        Some((first.max(self.minimum_slot), last))
    }

    async fn load_blocks(
        &mut self,
        client: &dyn TelemetryClient,
        options: &SnapshotOptions,
        epoch: Epoch,
        schedule: &EpochSchedule,
    ) {
        let prev_range = epoch
            .checked_sub(1)
            .and_then(|prev| self.block_range(schedule, prev));
        let cur_range = self.block_range(schedule, epoch);

        let fetch = move |range: Option<(Slot, Slot)>| async move {
            match range {
                Some((start, end)) => Some(
                    with_timeout(
                        client.url(),
                        "getConfirmedBlocks",
                        options.rpc_timeout,
                        client.get_confirmed_blocks(start, end),
                    )
                    .await,
                ),
                None => None,
            }
        };

        let (prev, cur) = tokio::join!(fetch(prev_range), fetch(cur_range));

        if let Some(prev) = prev {
            self.prev_epoch_blocks = self.take(prev);
        }
        if let Some(cur) = cur {
            self.cur_epoch_blocks = self.take(cur);
        }
    }

    async fn load_meta(&mut self, client: &dyn TelemetryClient, options: &SnapshotOptions) {
        let url = client.url();
        let deadline = options.rpc_timeout;

        let (version, identity, genesis) = tokio::join!(
            with_timeout(url, "getVersion", deadline, client.get_version()),
            with_timeout(url, "getIdentity", deadline, client.get_identity()),
            with_timeout(url, "getGenesisHash", deadline, client.get_genesis_hash()),
        );

        match version {
            Ok(v) => self.version = Some(v),
            Err(e) => self.record(e),
        }
        match identity {
            Ok(i) => self.identity = Some(i),
            Err(e) => self.record(e),
        }
        match genesis {
            Ok(g) => self.genesis_hash = Some(g),
            Err(e) => self.record(e),
        }
    }
}
