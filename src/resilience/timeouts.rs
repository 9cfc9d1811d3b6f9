//! Timeout enforcement for remote calls.
//!
//! Every call to a node carries its own deadline. An elapsed deadline is
//! reported as [`RpcError::Timeout`] and is indistinguishable, to the caller,
//! from any other failed call on that node.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::rpc::types::{RpcError, RpcResult};

/// Run `call` with a deadline, naming the node and method on expiry.
pub async fn with_timeout<T, F>(
    url: &str,
    method: &'static str,
    deadline: Duration,
    call: F,
) -> RpcResult<T>
where
    F: Future<Output = RpcResult<T>>,
{
    match timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(node = %url, method, timeout = ?deadline, "RPC timeout");
            Err(RpcError::Timeout {
                url: url.to_string(),
                method,
                after: deadline,
            })
        }
    }
}
