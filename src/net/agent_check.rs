//! Agent-check responder.
//!
//! The load balancer opens a TCP connection and reads one line; nothing is
//! read from the peer. The line is chosen in this order:
//!
//! ```text
//! sentinel file exists      → "maint"   (remember it)
//! remembered maintenance    → "ready"   (forget it)
//! otherwise                 → reported status ("up", "down #behind", "down #stale", ...)
//! ```
//!
//! The maintenance flag is one process-wide atomic. Reading and clearing it
//! are separate steps, so concurrent checks racing the sentinel's removal may
//! each answer `ready`.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::config::{AgentConfig, MaintenanceConfig};
use crate::health::state::{HealthStateMachine, ReportedStatus};
use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::net::listener::{Listener, ListenerError};
use crate::observability::metrics;

/// How long shutdown waits for in-flight answers.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Operator-controlled maintenance override.
#[derive(Debug, Default)]
pub struct MaintenanceGate {
    sentinel: Option<PathBuf>,
    flagged: AtomicBool,
}

impl MaintenanceGate {
    pub fn new(sentinel: Option<PathBuf>) -> Self {
        Self {
            sentinel,
            flagged: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &MaintenanceConfig) -> Self {
        Self::new(config.sentinel_path.as_ref().map(PathBuf::from))
    }

    pub fn sentinel(&self) -> Option<&PathBuf> {
        self.sentinel.as_ref()
    }

    async fn sentinel_exists(&self) -> bool {
        match &self.sentinel {
            Some(path) => tokio::fs::metadata(path).await.is_ok(),
            None => false,
        }
    }

    /// `Some` when maintenance decides the answer.
    pub async fn check(&self) -> Option<AgentResponse> {
        if self.sentinel_exists().await {
            self.flagged.store(true, Ordering::SeqCst);
            return Some(AgentResponse::Maintenance);
        }
        if self.flagged.load(Ordering::SeqCst) {
            self.flagged.store(false, Ordering::SeqCst);
            return Some(AgentResponse::Ready);
        }
        None
    }
}

/// One agent-check answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentResponse {
    Maintenance,
    Ready,
    Status(ReportedStatus),
}

impl AgentResponse {
    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentResponse::Maintenance => "maint",
            AgentResponse::Ready => "ready",
            AgentResponse::Status(ReportedStatus::Stale) => "stale",
            AgentResponse::Status(status) if status.is_up() => "up",
            AgentResponse::Status(_) => "down",
        }
    }
}

impl fmt::Display for AgentResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentResponse::Maintenance => f.write_str("maint"),
            AgentResponse::Ready => f.write_str("ready"),
            AgentResponse::Status(status) => write!(f, "{}", status),
        }
    }
}

/// Serves the node's status to the load balancer.
pub struct AgentCheckServer {
    state: Arc<HealthStateMachine>,
    maintenance: MaintenanceGate,
    write_timeout: Duration,
    tracker: ConnectionTracker,
}

impl AgentCheckServer {
    pub fn new(config: &AgentConfig, state: Arc<HealthStateMachine>) -> Self {
        Self {
            state,
            maintenance: MaintenanceGate::from_config(&config.maintenance),
            write_timeout: Duration::from_secs(config.listener.write_timeout_secs),
            tracker: ConnectionTracker::new(),
        }
    }

    /// The answer a connection arriving now would get.
    pub async fn respond(&self) -> AgentResponse {
        match self.maintenance.check().await {
            Some(response) => response,
            None => AgentResponse::Status(self.state.reported_status()),
        }
    }

    /// Accept connections until shutdown, then drain in-flight answers.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        tracing::info!(
            address = ?listener.local_addr().ok(),
            maintenance_file = ?self.maintenance.sentinel(),
            "Agent-check server starting"
        );
        let server = Arc::new(self);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer, permit)) => {
                            let guard = server.tracker.track();
                            let server = Arc::clone(&server);
                            tokio::spawn(async move {
                                server.handle(stream, peer, guard).await;
                                drop(permit);
                            });
                        }
                        Err(ListenerError::Closed) => return Err(ListenerError::Closed),
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept failed");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Agent-check server received shutdown signal");
                    break;
                }
            }
        }

        if !server.tracker.drain(DRAIN_TIMEOUT).await {
            tracing::warn!(
                active = server.tracker.active_count(),
                "Shutdown with agent-check connections still open"
            );
        }
        Ok(())
    }

    async fn handle(&self, mut stream: TcpStream, peer: SocketAddr, guard: ConnectionGuard) {
        let response = self.respond().await;
        metrics::record_agent_response(response.kind());
        let line = format!("{}\n", response);

        let write = async {
            stream.write_all(line.as_bytes()).await?;
            stream.shutdown().await
        };

        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(())) => {
                tracing::debug!(connection_id = %guard.id(), peer = %peer, response = %response, "Answered agent check");
            }
            Ok(Err(e)) => {
                tracing::debug!(connection_id = %guard.id(), peer = %peer, error = %e, "Agent-check write failed");
            }
            Err(_) => {
                tracing::warn!(connection_id = %guard.id(), peer = %peer, "Agent-check write timed out");
            }
        }
    }
}
