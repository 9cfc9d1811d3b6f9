//! Fleet-wide snapshot aggregation.
//!
//! # Responsibilities
//! - Poll every configured node concurrently, one task per node
//! - Discard errored snapshots
//! - Publish the surviving set atomically for readers
//! - Derive the baseline the target is compared against
//!
//! # Design Decisions
//! - A failed poll keeps the previous fleet in place
//! - The baseline takes maxima, not averages: the fleet's best node sets the bar

use arc_swap::ArcSwap;
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::health::error::{HealthCheckError, HealthResult};
use crate::health::snapshot::{NodeSnapshot, SnapshotOptions};
use crate::observability::metrics;
use crate::rpc::{JsonRpcClient, Slot, TelemetryClient};

/// Best-known state across the surviving nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetBaseline {
    pub max_current_slot: Slot,
    pub max_prev_epoch_blocks: usize,
    pub max_cur_epoch_blocks: usize,
}

/// The usable snapshots from one poll cycle.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    snapshots: Vec<NodeSnapshot>,
}

impl Fleet {
    pub fn new(snapshots: Vec<NodeSnapshot>) -> Self {
        Self { snapshots }
    }

    pub fn snapshots(&self) -> &[NodeSnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Snapshot of `node`, if it survived.
    pub fn get(&self, node: &str) -> Option<&NodeSnapshot> {
        self.snapshots.iter().find(|s| s.node == node)
    }

    /// Like [`Fleet::get`], but absence is an error.
    pub fn target(&self, node: &str) -> HealthResult<&NodeSnapshot> {
        self.get(node).ok_or_else(|| HealthCheckError::TargetUnreachable {
            node: node.to_string(),
        })
    }

    /// Number of survivors other than `node`.
    pub fn peers_of(&self, node: &str) -> usize {
        self.snapshots.iter().filter(|s| s.node != node).count()
    }

    /// Maxima over all survivors. Block counts stay 0 unless `include_blocks`.
    pub fn baseline(&self, include_blocks: bool) -> Option<FleetBaseline> {
        if self.snapshots.is_empty() {
            return None;
        }

        let mut baseline = FleetBaseline::default();
        for snapshot in &self.snapshots {
            baseline.max_current_slot = baseline.max_current_slot.max(snapshot.current_slot);
            if include_blocks {
                baseline.max_prev_epoch_blocks =
                    baseline.max_prev_epoch_blocks.max(snapshot.prev_epoch_block_count());
                baseline.max_cur_epoch_blocks =
                    baseline.max_cur_epoch_blocks.max(snapshot.cur_epoch_block_count());
            }
        }
        Some(baseline)
    }
}

/// Polls the configured nodes and holds the latest usable fleet.
pub struct FleetAggregator {
    clients: Vec<Arc<dyn TelemetryClient>>,
    options: SnapshotOptions,
    fleet: ArcSwap<Fleet>,
}

impl FleetAggregator {
    pub fn new(clients: Vec<Arc<dyn TelemetryClient>>, options: SnapshotOptions) -> Self {
        Self {
            clients,
            options,
            fleet: ArcSwap::from_pointee(Fleet::default()),
        }
    }

    /// One JSON-RPC client per configured server, target first.
    pub fn from_config(config: &AgentConfig) -> Self {
        let clients = config
            .servers()
            .into_iter()
            .map(|url| -> Arc<dyn TelemetryClient> {
                match config.node.epoch_schedule {
                    Some(schedule) => Arc::new(JsonRpcClient::with_schedule(url, schedule)),
                    None => Arc::new(JsonRpcClient::new(url)),
                }
            })
            .collect();

        let options = SnapshotOptions {
            rpc_timeout: config.node.rpc_timeout(),
            load_ledger: config.checks.ledger_check_enabled(),
            load_blocks: config.checks.enable_block_check,
            load_meta: false,
        };

        Self::new(clients, options)
    }

    /// Number of configured nodes.
    pub fn configured(&self) -> usize {
        self.clients.len()
    }

    pub fn options(&self) -> &SnapshotOptions {
        &self.options
    }

    /// Load a snapshot from every node and publish the survivors.
    ///
    /// Returns the number of survivors. On error the previous fleet stays.
    pub async fn poll(&self) -> HealthResult<usize> {
        if self.clients.is_empty() {
            return Err(HealthCheckError::NoNodes);
        }

        let handles: Vec<_> = self
            .clients
            .iter()
            .map(|client| {
                let client = Arc::clone(client);
                let options = self.options;
                tokio::spawn(async move { NodeSnapshot::load(client.as_ref(), &options).await })
            })
            .collect();

        let mut survivors = Vec::with_capacity(handles.len());
        for (client, joined) in self.clients.iter().zip(join_all(handles).await) {
            let snapshot = match joined {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!(node = %client.url(), error = %e, "Snapshot task failed");
                    metrics::record_node_health(client.url(), false);
                    continue;
                }
            };

            match snapshot.check() {
                Ok(()) => {
                    metrics::record_snapshot(&snapshot);
                    metrics::record_node_health(&snapshot.node, true);
                    survivors.push(snapshot);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring node state");
                    metrics::record_node_health(&snapshot.node, false);
                }
            }
        }

        // A lone target has nothing to be compared against; its own absence is the verdict.
        let required = if self.clients.len() > 1 { 2 } else { 0 };
        if survivors.len() < required {
            return Err(HealthCheckError::InsufficientPeers {
                survived: survivors.len(),
                required,
            });
        }

        let survived = survivors.len();
        self.fleet.store(Arc::new(Fleet::new(survivors)));
        tracing::debug!(survived, configured = self.clients.len(), "Fleet updated");
        Ok(survived)
    }

    /// The fleet committed by the last successful poll.
    pub fn fleet(&self) -> Arc<Fleet> {
        self.fleet.load_full()
    }

    pub fn baseline(&self) -> Option<FleetBaseline> {
        self.fleet.load().baseline(self.options.load_blocks)
    }

    pub fn snapshot_for(&self, node: &str) -> Option<NodeSnapshot> {
        self.fleet.load().get(node).cloned()
    }

    pub fn peers_of(&self, node: &str) -> usize {
        self.fleet.load().peers_of(node)
    }
}

impl std::fmt::Debug for FleetAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes: Vec<&str> = self.clients.iter().map(|c| c.url()).collect();
        f.debug_struct("FleetAggregator")
            .field("nodes", &nodes)
            .field("options", &self.options)
            .field("survivors", &self.fleet.load().len())
            .finish()
    }
}
