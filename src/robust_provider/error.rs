use std::sync::Arc;

use alloy::transports::{RpcError, TransportErrorKind};
use thiserror::Error;
use tokio::time::error::Elapsed;

/// Errors returned by [`RobustProvider`](super::RobustProvider) calls.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The call, including all of its retries, exceeded the configured call timeout.
    #[error("Operation timed out")]
    Timeout,

    /// The last attempt failed with an RPC error.
    #[error("RPC error: {0}")]
    RpcError(Arc<RpcError<TransportErrorKind>>),
}

impl From<RpcError<TransportErrorKind>> for Error {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        Error::RpcError(Arc::new(err))
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::Timeout
    }
}

/// JSON-RPC error code geth (and most clients following it) use for an unknown filter id.
pub const FILTER_NOT_FOUND_CODE: i64 = -32000;

/// Returns `true` if `err` is a node response saying the requested filter does not exist.
///
/// Nodes disagree on the exact shape: geth answers `-32000 "filter not found"`, others keep the
/// message but use a different code. Either signal is accepted.
#[must_use]
pub fn is_filter_not_found(err: &RpcError<TransportErrorKind>) -> bool {
    match err.as_error_resp() {
        Some(payload) => {
            payload.code == FILTER_NOT_FOUND_CODE
                || payload.message.to_ascii_lowercase().contains("filter not found")
        }
        None => false,
    }
}
