//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::rpc::EpochSchedule;

/// Root configuration for the health agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Monitored node, reference peers and polling cadence.
    pub node: NodeConfig,

    /// Agent-check listener.
    pub listener: ListenerConfig,

    /// Health thresholds and check toggles.
    pub checks: CheckConfig,

    /// Rise/fall hysteresis and staleness.
    pub hysteresis: HysteresisConfig,

    /// Maintenance override.
    pub maintenance: MaintenanceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl AgentConfig {
    /// Every node polled each cycle: the target first, then reference peers.
    ///
    /// A reference entry equal to the target is dropped.
    pub fn servers(&self) -> Vec<String> {
        let mut servers = vec![self.node.rpc_url.clone()];
        for peer in &self.node.reference_servers {
            if !servers.contains(peer) {
                servers.push(peer.clone());
            }
        }
        servers
    }
}

/// Monitored node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// RPC URL of the node this agent reports on.
    pub rpc_url: String,

    /// RPC URLs of the peers the node is compared against.
    pub reference_servers: Vec<String>,

    /// Deadline for each individual remote call, in seconds.
    pub rpc_timeout_secs: u64,

    /// Interval between poll cycles, in seconds.
    pub poll_interval_secs: u64,

    /// Known epoch calendar. When unset it is fetched from each node once.
    pub epoch_schedule: Option<EpochSchedule>,
}

impl NodeConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8899".to_string(),
            reference_servers: Vec::new(),
            rpc_timeout_secs: 10,
            poll_interval_secs: 10,
            epoch_schedule: None,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9999").
    pub bind_address: String,

    /// Maximum concurrent agent-check connections (backpressure).
    pub max_connections: usize,

    /// Deadline for writing the status line, in seconds.
    pub write_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9999".to_string(),
            max_connections: 1024,
            write_timeout_secs: 5,
        }
    }
}

/// Health check thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Maximum number of slots the node may trail the fleet by.
    pub max_slot_diff: u64,

    /// Maximum divergence in current-epoch confirmed block count.
    pub max_block_diff: u64,

    /// Compare confirmed block counts per epoch (expensive).
    pub enable_block_check: bool,

    /// Log the gap between the current and max-retransmit slots.
    pub enable_max_retransmit_check: bool,

    /// Minimum number of slots the node must retain; 0 disables the check.
    pub minimum_ledger_size: u64,
}

impl CheckConfig {
    /// Whether the minimum stored slot has to be loaded.
    pub fn ledger_check_enabled(&self) -> bool {
        self.minimum_ledger_size > 0
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            max_slot_diff: 200,
            max_block_diff: 300,
            enable_block_check: false,
            enable_max_retransmit_check: true,
            minimum_ledger_size: 0,
        }
    }
}

/// Hysteresis configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HysteresisConfig {
    /// Consecutive passing cycles before a Down node reports Up.
    pub up_threshold: u32,

    /// Consecutive failing cycles before an Up node reports Down.
    pub down_threshold: u32,

    /// Consecutive load failures tolerated before reporting `down #stale`.
    pub stale_after: u64,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            up_threshold: 2,
            down_threshold: 4,
            stale_after: 3,
        }
    }
}

/// Maintenance override configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// File whose existence puts the node in maintenance.
    pub sentinel_path: Option<String>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            sentinel_path: Some("/etc/haproxy/maintenance".to_string()),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
