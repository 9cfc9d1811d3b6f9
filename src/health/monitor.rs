//! Periodic health checking of the target node.
//!
//! # Responsibilities
//! - Run one poll cycle per tick, never overlapping
//! - Turn the cycle's outcome into exactly one state-machine input

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::AgentConfig;
use crate::health::evaluator::{FailureReason, FailureReasons, HealthEvaluator};
use crate::health::fleet::FleetAggregator;
use crate::health::state::HealthStateMachine;
use crate::observability::metrics;

/// What a single cycle concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle could not be assessed; carries the load-failure reason.
    LoadFailure(&'static str),
    /// The target has no usable snapshot.
    TargetMissing,
    Healthy,
    Unhealthy(Vec<FailureReason>),
}

impl CycleOutcome {
    fn label(&self) -> &'static str {
        match self {
            CycleOutcome::LoadFailure(_) => "load_failure",
            CycleOutcome::TargetMissing => "target_missing",
            CycleOutcome::Healthy => "healthy",
            CycleOutcome::Unhealthy(_) => "unhealthy",
        }
    }
}

pub struct HealthMonitor {
    target: String,
    aggregator: Arc<FleetAggregator>,
    evaluator: HealthEvaluator,
    state: Arc<HealthStateMachine>,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(
        config: &AgentConfig,
        aggregator: Arc<FleetAggregator>,
        state: Arc<HealthStateMachine>,
    ) -> Self {
        Self {
            target: config.node.rpc_url.clone(),
            aggregator,
            evaluator: HealthEvaluator::new(config.checks.clone()),
            state,
            interval: config.node.poll_interval(),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            target_node = %self.target,
            nodes = self.aggregator.configured(),
            interval = ?self.interval,
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Poll the fleet once and feed the result to the state machine.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let outcome = match self.aggregator.poll().await {
            Ok(survived) => {
                tracing::debug!(survived, "Fleet polled");
                self.state.register_poll_success();
                self.check_health()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Couldn't load node states");
                self.state.register_load_failure("loadinghc");
                CycleOutcome::LoadFailure("loadinghc")
            }
        };

        metrics::record_poll_cycle(outcome.label());
        tracing::debug!(
            outcome = outcome.label(),
            status = %self.state.reported_status(),
            "Cycle complete"
        );
        outcome
    }

    /// Evaluate the target against the fleet committed by the last poll.
    fn check_health(&self) -> CycleOutcome {
        let fleet = self.aggregator.fleet();
        let configured = self.aggregator.configured();

        let peers = fleet.peers_of(&self.target);
        tracing::debug!(peers, "Comparison states loaded");
        if configured > 1 && peers < 1 {
            self.state.register_load_failure("lacksstates");
            return CycleOutcome::LoadFailure("lacksstates");
        }

        let target = match fleet.target(&self.target) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(error = %e, "Target node unusable this cycle");
                self.state.register_down_immediate("notfound");
                return CycleOutcome::TargetMissing;
            }
        };

        let Some(baseline) = fleet.baseline(self.aggregator.options().load_blocks) else {
            self.state.register_load_failure("healthstate");
            return CycleOutcome::LoadFailure("healthstate");
        };

        let reasons = self.evaluator.evaluate(target, &baseline, configured);
        if reasons.is_empty() {
            self.state.register_up();
            CycleOutcome::Healthy
        } else {
            tracing::info!(reasons = %FailureReasons(&reasons), "Health check failed");
            self.state.register_down(&reasons);
            CycleOutcome::Unhealthy(reasons)
        }
    }
}
