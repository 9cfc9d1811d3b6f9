//! Startup orchestration.
//!
//! # Responsibilities
//! - Report which checks are enabled
//! - Build the shared health state, the fleet aggregator and the monitor
//! - Start the monitor, then the agent-check server
//!
//! # Design Decisions
//! - Fail fast: a bind error is fatal
//! - The listener starts last, after the monitor task is running
//! - Until the first cycle completes the agent answers `down`

use std::sync::Arc;
use thiserror::Error;

use crate::config::AgentConfig;
use crate::health::{FleetAggregator, HealthMonitor, HealthStateMachine};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::{AgentCheckServer, Listener, ListenerError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("agent-check listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("health monitor task failed: {0}")]
    Monitor(#[from] tokio::task::JoinError),
}

/// Names of the enabled checks, in evaluation order.
pub fn enabled_checks(config: &AgentConfig) -> Vec<&'static str> {
    let mut checks = Vec::new();
    if !config.node.reference_servers.is_empty() {
        checks.push("slot-diff");
    }
    if config.checks.enable_max_retransmit_check {
        checks.push("max-retransmit");
    }
    if config.checks.ledger_check_enabled() {
        checks.push("minimum-ledger-size");
    }
    if config.checks.enable_block_check {
        checks.push("block-check");
    }
    checks
}

/// Log the effective check set. Returns `false` when nothing is checked.
pub fn announce_checks(config: &AgentConfig) -> bool {
    let checks = enabled_checks(config);

    tracing::info!(
        rpc = %config.node.rpc_url,
        reference_servers = ?config.node.reference_servers,
        max_slot_diff = config.checks.max_slot_diff,
        max_block_diff = config.checks.max_block_diff,
        minimum_ledger_size = config.checks.minimum_ledger_size,
        up = config.hysteresis.up_threshold,
        down = config.hysteresis.down_threshold,
        checks = ?checks,
        "Health checks configured"
    );

    if checks.is_empty() {
        tracing::warn!("All checks are disabled; the node is judged on reachability alone");
        return false;
    }
    true
}

/// Bind the configured address and run until `shutdown` fires.
pub async fn run(config: &AgentConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let listener = Listener::bind(&config.listener).await?;
    run_with_listener(config, listener, shutdown).await
}

/// Run the agent on an already bound listener.
pub async fn run_with_listener(
    config: &AgentConfig,
    listener: Listener,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    announce_checks(config);

    let state = Arc::new(HealthStateMachine::new(config.hysteresis.clone()));
    let aggregator = Arc::new(FleetAggregator::from_config(config));
    let monitor = HealthMonitor::new(config, aggregator, Arc::clone(&state));
    let server = AgentCheckServer::new(config, state);

    let monitor_task = tokio::spawn(monitor.run(shutdown.subscribe()));
    let served = server.run(listener, shutdown.subscribe()).await;

    // the server may have stopped on its own; take the monitor down with it
    shutdown.trigger();
    monitor_task.await?;
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}
