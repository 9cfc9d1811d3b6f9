//! Fleet polling and health cycles against mock nodes.

use std::sync::Arc;

use rpc_health_check::config::AgentConfig;
use rpc_health_check::health::{
    CycleOutcome, FailureReason, FleetAggregator, HealthMonitor, HealthStateMachine,
};

mod common;
use common::{dead_address, start_mock_node, MockNode, NodeScript};

fn config_for(target: &str, peers: Vec<String>) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.node.rpc_url = target.to_string();
    config.node.reference_servers = peers;
    config.node.rpc_timeout_secs = 2;
    config
}

async fn nodes(slots: &[u64]) -> Vec<MockNode> {
    let mut nodes = Vec::new();
    for &slot in slots {
        nodes.push(start_mock_node(NodeScript::at_slot(slot)).await);
    }
    nodes
}

#[tokio::test]
async fn test_three_healthy_and_one_dead() {
    let healthy = nodes(&[12_000, 12_150, 11_900]).await;
    let dead = format!("http://{}", dead_address().await);

    let mut peers: Vec<String> = healthy[1..].iter().map(|n| n.url()).collect();
    peers.push(dead.clone());
    let config = config_for(&healthy[0].url(), peers);

    let aggregator = FleetAggregator::from_config(&config);
    assert_eq!(aggregator.configured(), 4);
    assert_eq!(aggregator.poll().await.unwrap(), 3);

    assert!(aggregator.snapshot_for(&dead).is_none());
    assert_eq!(aggregator.baseline().unwrap().max_current_slot, 12_150);
    assert_eq!(aggregator.peers_of(&healthy[0].url()), 2);
}

#[tokio::test]
async fn test_block_check_over_the_wire() {
    let fleet = nodes(&[12_500, 12_520]).await;
    let mut config = config_for(&fleet[0].url(), vec![fleet[1].url()]);
    config.checks.enable_block_check = true;
    config.checks.minimum_ledger_size = 400;
    fleet[0].update(|s| s.minimum_slot = 11_800);
    fleet[1].update(|s| s.minimum_slot = 12_100);

    let aggregator = Arc::new(FleetAggregator::from_config(&config));
    aggregator.poll().await.unwrap();

    let target = aggregator.snapshot_for(&fleet[0].url()).unwrap();
    assert_eq!(target.prev_epoch_block_count(), 200);
    assert_eq!(target.cur_epoch_block_count(), 501);

    // the peer pruned everything before slot 12_100, including the previous epoch
    let peer = aggregator.snapshot_for(&fleet[1].url()).unwrap();
    assert_eq!(peer.prev_epoch_block_count(), 0);
    assert_eq!(peer.cur_epoch_block_count(), 421);

    let baseline = aggregator.baseline().unwrap();
    assert_eq!(baseline.max_cur_epoch_blocks, 501);
    assert_eq!(baseline.max_prev_epoch_blocks, 200);
}

#[tokio::test]
async fn test_monitor_cycles() {
    let fleet = nodes(&[20_000, 20_010, 20_005]).await;
    let config = config_for(&fleet[0].url(), vec![fleet[1].url(), fleet[2].url()]);

    let aggregator = Arc::new(FleetAggregator::from_config(&config));
    let state = Arc::new(HealthStateMachine::new(config.hysteresis.clone()));
    let monitor = HealthMonitor::new(&config, aggregator, Arc::clone(&state));

    assert_eq!(monitor.run_cycle().await, CycleOutcome::Healthy);
    assert_eq!(monitor.run_cycle().await, CycleOutcome::Healthy);
    assert_eq!(state.reported_status().to_string(), "up");

    // target falls 300 slots behind
    fleet[1].update(|s| s.slot = 20_300);
    assert_eq!(
        monitor.run_cycle().await,
        CycleOutcome::Unhealthy(vec![FailureReason::Behind])
    );
    assert_eq!(state.reported_status().to_string(), "up #behind");

    // target stops answering
    fleet[0].update(|s| s.unavailable = true);
    assert_eq!(monitor.run_cycle().await, CycleOutcome::TargetMissing);
    assert_eq!(state.reported_status().to_string(), "down #notfound");

    // fleet collapses: nothing to compare against
    fleet[1].update(|s| s.unavailable = true);
    fleet[2].update(|s| s.unavailable = true);
    for _ in 0..4 {
        assert_eq!(monitor.run_cycle().await, CycleOutcome::LoadFailure("loadinghc"));
    }
    assert_eq!(state.reported_status().to_string(), "down #stale");
}
