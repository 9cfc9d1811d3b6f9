//! JSON-RPC client against a mock node over real HTTP.

use rpc_health_check::rpc::{Commitment, JsonRpcClient, RpcError, TelemetryClient};

mod common;
use common::{start_mock_node, NodeScript, SLOTS_PER_EPOCH};

#[tokio::test]
async fn test_commitment_reaches_the_node() {
    let node = start_mock_node(NodeScript::at_slot(4_200)).await;
    let client = JsonRpcClient::new(node.url());

    assert_eq!(client.get_slot(Some(Commitment::Confirmed)).await.unwrap(), 4_200);
    assert_eq!(client.get_slot(Some(Commitment::Processed)).await.unwrap(), 4_202);
    assert_eq!(client.get_slot(None).await.unwrap(), 4_200);
}

#[tokio::test]
async fn test_typed_results() {
    let node = start_mock_node(NodeScript::at_slot(4_200)).await;
    let client = JsonRpcClient::new(node.url());

    let info = client.get_epoch_info(None).await.unwrap();
    assert_eq!(info.epoch, 4);
    assert_eq!(info.slot_index, 200);

    let version = client.get_version().await.unwrap();
    assert_eq!(version.core_version, "1.14.17");

    let blocks = client.get_confirmed_blocks(4_100, 4_999).await.unwrap();
    assert_eq!(blocks.len(), 101);
}

#[tokio::test]
async fn test_error_object_is_protocol_error() {
    let mut script = NodeScript::at_slot(10);
    script.failing.insert("getMaxRetransmitSlot".to_string());
    let node = start_mock_node(script).await;
    let client = JsonRpcClient::new(node.url());

    let err = client.get_max_retransmit_slot().await.unwrap_err();
    assert!(matches!(err, RpcError::Protocol { method: "getMaxRetransmitSlot", .. }));
    assert!(err.to_string().contains("scripted failure"));
}

#[tokio::test]
async fn test_http_failure_is_network_error() {
    let mut script = NodeScript::at_slot(10);
    script.unavailable = true;
    let node = start_mock_node(script).await;
    let client = JsonRpcClient::new(node.url());

    let err = client.get_identity().await.unwrap_err();
    assert!(matches!(err, RpcError::Network { method: "getIdentity", .. }));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_epoch_schedule_fetched_once() {
    let node = start_mock_node(NodeScript::at_slot(10)).await;
    let client = JsonRpcClient::new(node.url());

    let first = client.get_epoch_schedule().await.unwrap();
    let second = client.get_epoch_schedule().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.slots_per_epoch, SLOTS_PER_EPOCH);
    assert_eq!(node.request_count("getEpochSchedule"), 1);
}

#[tokio::test]
async fn test_inverted_range_never_sent() {
    let node = start_mock_node(NodeScript::at_slot(10)).await;
    let client = JsonRpcClient::new(node.url());

    let err = client.get_confirmed_blocks(500, 100).await.unwrap_err();
    assert!(matches!(err, RpcError::Local { .. }));
    assert_eq!(node.request_count("getConfirmedBlocks"), 0);
}
