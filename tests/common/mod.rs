//! Shared utilities for integration testing.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Slot length used by mock nodes; small so block queries stay cheap.
pub const SLOTS_PER_EPOCH: u64 = 1_000;

/// What a mock node answers. Mutable while the node runs.
#[derive(Debug, Clone)]
pub struct NodeScript {
    pub slot: u64,
    pub minimum_slot: u64,
    /// Methods answered with a JSON-RPC error object.
    pub failing: HashSet<String>,
    /// Answer every request with HTTP 503.
    pub unavailable: bool,
}

impl NodeScript {
    pub fn at_slot(slot: u64) -> Self {
        Self {
            slot,
            minimum_slot: 0,
            failing: HashSet::new(),
            unavailable: false,
        }
    }
}

/// A JSON-RPC node on a real TCP socket.
#[derive(Clone)]
pub struct MockNode {
    pub addr: SocketAddr,
    script: Arc<Mutex<NodeScript>>,
    requests: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
}

impl MockNode {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn update(&self, f: impl FnOnce(&mut NodeScript)) {
        f(&mut self.script.lock().unwrap());
    }

    /// Methods received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, method: &str) -> usize {
        self.requests().iter().filter(|m| m.as_str() == method).count()
    }
}

/// Start a mock node on an ephemeral port.
pub async fn start_mock_node(script: NodeScript) -> MockNode {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let node = MockNode {
        addr: listener.local_addr().unwrap(),
        script: Arc::new(Mutex::new(script)),
        requests: Arc::new(Mutex::new(Vec::new())),
        connections: Arc::new(AtomicUsize::new(0)),
    };

    let server = node.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    server.connections.fetch_add(1, Ordering::SeqCst);
                    let server = server.clone();
                    tokio::spawn(async move {
                        let _ = serve_connection(socket, server).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    node
}

/// An address with nothing listening on it.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn serve_connection(mut socket: TcpStream, node: MockNode) -> std::io::Result<()> {
    let body = match read_request_body(&mut socket).await? {
        Some(body) => body,
        None => return Ok(()),
    };

    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let id = request["id"].clone();
    node.requests.lock().unwrap().push(method.clone());

    let script = node.script.lock().unwrap().clone();
    let (status, payload) = if script.unavailable {
        ("503 Service Unavailable", String::new())
    } else if script.failing.contains(&method) {
        let err = json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32000, "message": "scripted failure"}});
        ("200 OK", err.to_string())
    } else {
        let result = answer(&script, &method, &request["params"]);
        ("200 OK", json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string())
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// Read one HTTP request and return its body.
async fn read_request_body(socket: &mut TcpStream) -> std::io::Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Ok(Some(buf[header_end..].to_vec()))
}

fn answer(script: &NodeScript, method: &str, params: &Value) -> Value {
    let epoch = script.slot / SLOTS_PER_EPOCH;
    match method {
        "getSlot" => {
            let processed = params[0]["commitment"].as_str() == Some("processed");
            json!(if processed { script.slot + 2 } else { script.slot })
        }
        "getEpochInfo" => json!({
            "absoluteSlot": script.slot,
            "blockHeight": script.slot,
            "epoch": epoch,
            "slotIndex": script.slot % SLOTS_PER_EPOCH,
            "slotsInEpoch": SLOTS_PER_EPOCH,
            "transactionCount": 0,
        }),
        "getEpochSchedule" => json!({
            "firstNormalEpoch": 0,
            "firstNormalSlot": 0,
            "leaderScheduleSlotOffset": SLOTS_PER_EPOCH,
            "slotsPerEpoch": SLOTS_PER_EPOCH,
            "warmup": false,
        }),
        "minimumLedgerSlot" => json!(script.minimum_slot),
        "getConfirmedBlocks" => {
            let start = params[0].as_u64().unwrap_or(0);
            let end = params[1].as_u64().unwrap_or(0).min(script.slot);
            json!((start..=end).collect::<Vec<u64>>())
        }
        "getMaxRetransmitSlot" => json!(script.slot + 5),
        "getVersion" => json!({"solana-core": "1.14.17", "feature-set": 1_879_391_783u64}),
        "getIdentity" => json!({"identity": "MockNode1111111111111111111111111111111111"}),
        "getGenesisHash" => json!("5eykt4UsFv8P8NJdTREpY1vzqKqZKvdpKuc147dw2N9d"),
        _ => Value::Null,
    }
}

/// Read the single line an agent-check connection returns.
pub async fn agent_check(addr: SocketAddr) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut line = String::new();
    stream.read_to_string(&mut line).await.unwrap();
    line
}
