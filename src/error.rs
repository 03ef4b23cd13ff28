use std::{mem::discriminant, sync::Arc};

use alloy::{
    primitives::U256,
    transports::{RpcError, TransportErrorKind},
};
use thiserror::Error;

use crate::robust_provider::Error as RobustProviderError;

/// Errors produced while watching for logs.
///
/// RPC-side variants ([`WatchError::RpcError`], [`WatchError::Timeout`],
/// [`WatchError::FilterNotFound`]) are handed to the watcher's error handler and never stop the
/// watcher. The remaining variants are returned from [`EventWatcher::watch`] before any polling
/// starts.
///
/// [`EventWatcher::watch`]: crate::EventWatcher::watch
#[derive(Error, Debug, Clone)]
pub enum WatchError {
    /// The underlying RPC transport returned an error.
    #[error("RPC error: {0}")]
    RpcError(Arc<RpcError<TransportErrorKind>>),

    /// A timeout elapsed while waiting for an RPC response.
    #[error("Operation timed out")]
    Timeout,

    /// The node no longer knows the filter, usually because it expired or the node restarted.
    #[error("Filter {0} not found")]
    FilterNotFound(U256),

    /// The match criteria can never be satisfied.
    #[error("Invalid match criteria: {0}")]
    Criteria(#[from] CriteriaError),

    /// The configured polling interval is invalid (must be greater than zero).
    #[error("Polling interval must be greater than 0")]
    InvalidPollingInterval,
}

impl WatchError {
    /// Returns `true` if the error means the node evicted the watcher's filter.
    #[must_use]
    pub fn is_filter_not_found(&self) -> bool {
        matches!(self, WatchError::FilterNotFound(_))
    }
}

impl From<RobustProviderError> for WatchError {
    fn from(error: RobustProviderError) -> WatchError {
        match error {
            RobustProviderError::Timeout => WatchError::Timeout,
            RobustProviderError::RpcError(err) => WatchError::RpcError(err),
        }
    }
}

impl From<RpcError<TransportErrorKind>> for WatchError {
    fn from(error: RpcError<TransportErrorKind>) -> Self {
        WatchError::RpcError(Arc::new(error))
    }
}

impl PartialEq for WatchError {
    /// Errors compare by variant; the wrapped transport error is not compared.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (WatchError::FilterNotFound(a), WatchError::FilterNotFound(b)) => a == b,
            (WatchError::Criteria(a), WatchError::Criteria(b)) => a == b,
            _ => discriminant(self) == discriminant(other),
        }
    }
}

/// Reasons a set of match criteria is rejected at construction time.
///
/// These can never succeed on retry, so they are reported before a watcher starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    /// Argument constraints were given without exactly one event to resolve them against.
    #[error("Argument constraints require exactly one event, got {0}")]
    ConstraintsRequireSingleEvent(usize),

    /// The ABI has no event with the requested name.
    #[error("Event `{0}` not found in ABI")]
    UnknownEvent(String),

    /// A constraint names an argument the event does not have.
    #[error("Event `{event}` has no argument {argument}")]
    UnknownArgument { event: String, argument: String },

    /// A constraint targets a non-indexed argument, which cannot be filtered on.
    #[error("Argument {argument} of event `{event}` is not indexed")]
    ArgumentNotIndexed { event: String, argument: String },

    /// A constraint accepts no values at all.
    #[error("Constraint on argument {argument} of event `{event}` has no accepted values")]
    EmptyConstraint { event: String, argument: String },

    /// An accepted value does not have the argument's ABI type.
    #[error("Value for argument {argument} of event `{event}` does not match type `{expected}`")]
    TypeMismatch { event: String, argument: String, expected: String },

    /// An event parameter type could not be resolved.
    #[error("Event `{event}` has an unresolvable parameter type: {reason}")]
    InvalidParameterType { event: String, reason: String },

    /// The same argument was constrained more than once.
    #[error("Argument {argument} of event `{event}` is constrained more than once")]
    DuplicateConstraint { event: String, argument: String },

    /// A constrained argument would land past the fourth topic, which logs cannot carry.
    #[error("Argument {argument} of event `{event}` maps to topic {position}, logs have 4 topics")]
    TopicOutOfRange { event: String, argument: String, position: usize },
}
