//! RPC node health-check agent.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────────┐
//!                  │                   HEALTH-CHECK AGENT                      │
//!                  │                                                           │
//!   target node ◀──┼──┐                                                        │
//!   peer nodes  ◀──┼──┤  ┌──────────┐    ┌──────────┐    ┌───────────┐        │
//!   (JSON-RPC)     │  └──│   rpc    │◀───│  health  │───▶│  health   │        │
//!                  │     │ clients  │    │  fleet   │    │ evaluator │        │
//!                  │     └──────────┘    └────▲─────┘    └─────┬─────┘        │
//!                  │                          │ tick            ▼              │
//!                  │                    ┌─────┴─────┐    ┌───────────┐        │
//!                  │                    │  monitor  │───▶│   state   │        │
//!                  │                    └───────────┘    │  machine  │        │
//!                  │                                     └─────┬─────┘        │
//!   load balancer  │  ┌──────────┐    ┌─────────────┐          │              │
//!   agent check ───┼─▶│   net    │───▶│ agent_check │◀─────────┘              │
//!   ◀── one line ──┼──│ listener │    │ (maint/ready│                         │
//!                  │  └──────────┘    │  /status)   │                         │
//!                  │                  └─────────────┘                         │
//!                  │  config · observability · resilience · lifecycle         │
//!                  └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use rpc_health_check::config::loader::{load_config, ConfigError};
use rpc_health_check::config::validation::validate_config;
use rpc_health_check::lifecycle::{signals, startup};
use rpc_health_check::observability::{logging, metrics};
use rpc_health_check::{AgentConfig, Shutdown};

/// Agent-check health reporter for ledger RPC nodes.
#[derive(Parser, Debug)]
#[command(name = "rpc-health-check", version, about, long_about = None)]
struct Cli {
    /// TOML configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Agent-check listen address (":9999" binds all interfaces)
    #[arg(long)]
    addr: Option<String>,

    /// RPC URL of the monitored node
    #[arg(long)]
    rpc: Option<String>,

    /// Comma-separated RPC URLs of reference nodes
    #[arg(long, value_delimiter = ',')]
    reference_servers: Option<Vec<String>>,

    /// Deadline for each RPC call, in seconds
    #[arg(long)]
    rpc_timeout: Option<u64>,

    /// Seconds between poll cycles
    #[arg(long)]
    interval: Option<u64>,

    /// Maintenance sentinel file
    #[arg(long)]
    maintfile: Option<String>,

    /// Slots the node may trail the fleet by
    #[arg(long)]
    slot_diff: Option<u64>,

    /// Allowed current-epoch confirmed block divergence
    #[arg(long)]
    block_diff: Option<u64>,

    /// Passing cycles before reporting up
    #[arg(long)]
    up: Option<u32>,

    /// Failing cycles before reporting down
    #[arg(long)]
    down: Option<u32>,

    /// Compare confirmed block counts (expensive)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    enable_block_check: Option<bool>,

    /// Log the max-retransmit slot gap
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    enable_max_retransmit_check: Option<bool>,

    /// Minimum number of stored slots; 0 disables the check
    #[arg(long)]
    minimum_ledger_size: Option<u64>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    fn apply(&self, config: &mut AgentConfig) {
        if let Some(addr) = &self.addr {
            config.listener.bind_address = normalize_addr(addr);
        }
        if let Some(rpc) = &self.rpc {
            config.node.rpc_url = rpc.clone();
        }
        if let Some(servers) = &self.reference_servers {
            config.node.reference_servers = servers
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(secs) = self.rpc_timeout {
            config.node.rpc_timeout_secs = secs;
        }
        if let Some(secs) = self.interval {
            config.node.poll_interval_secs = secs;
        }
        if let Some(path) = &self.maintfile {
            config.maintenance.sentinel_path = Some(path.clone());
        }
        if let Some(diff) = self.slot_diff {
            config.checks.max_slot_diff = diff;
        }
        if let Some(diff) = self.block_diff {
            config.checks.max_block_diff = diff;
        }
        if let Some(up) = self.up {
            config.hysteresis.up_threshold = up;
        }
        if let Some(down) = self.down {
            config.hysteresis.down_threshold = down;
        }
        if let Some(enabled) = self.enable_block_check {
            config.checks.enable_block_check = enabled;
        }
        if let Some(enabled) = self.enable_max_retransmit_check {
            config.checks.enable_max_retransmit_check = enabled;
        }
        if let Some(size) = self.minimum_ledger_size {
            config.checks.minimum_ledger_size = size;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

/// `:9999` → `0.0.0.0:9999`.
fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AgentConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rpc-health-check starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    startup::run(&config, shutdown).await?;
    Ok(())
}
