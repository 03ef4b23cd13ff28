//! Event-Watcher is a library for watching EVM event logs by polling a node.
//!
//! The main entry point is [`EventWatcher`]. Describe what to look for with [`MatchCriteria`],
//! then call [`EventWatcher::watch`] with a [`WatchConfig`] holding the handler that receives
//! new logs. The returned [`WatchHandle`] stops the watch.
//!
//! # Filters and block ranges
//!
//! A watch first tries to install a log filter (`eth_newFilter`) and polls it with
//! `eth_getFilterChanges`. Nodes drop filters that are not polled often enough, and some refuse
//! to create them at all:
//!
//! - If the node refuses the filter, the watch falls back to `eth_getLogs` over every block mined
//!   since the previous poll, so blocks mined faster than the polling interval are not missed.
//! - If an installed filter disappears, it is reinstalled on the poll that notices it.
//!
//! Both paths use the same [`alloy::rpc::types::Filter`], derived once from the criteria.
//!
//! # Delivery
//!
//! Logs of one poll are delivered in `(block_number, log_index)` order, either as one batch or
//! one log at a time (see [`WatchConfig::batch`]). Polls never overlap, and a handler runs to
//! completion before the next poll starts.
//!
//! # Errors
//!
//! Invalid criteria and configuration are rejected by [`EventWatcher::watch`]. RPC errors never
//! stop a watch: they are passed to [`WatchConfig::on_error`] and the next poll tries again.
//!
//! # Reorgs
//!
//! Event-Watcher does not detect chain reorganizations. Logs delivered from blocks that are later
//! reorganized away are not retracted.
//!
//! # Robust providers
//!
//! The [`robust_provider`] module provides [`robust_provider::RobustProvider`], a wrapper that
//! retries, enforces timeouts, and fails over across RPC endpoints. It is the [`LogSource`] used
//! by [`EventWatcher::connect`]. Any other [`LogSource`] works with [`EventWatcher::new`].

#[macro_use]
mod logging;

pub mod robust_provider;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod criteria;
mod decoder;
mod error;
mod log_source;
mod watcher;

pub use criteria::{ArgKey, IntoMatchCriteria, MatchCriteria, MatchCriteriaBuilder};
pub use decoder::{AbiDecoder, DecodedLog, EventArgs, EventDecoder, RawLogDecoder};
pub use error::{CriteriaError, WatchError};
pub use log_source::{FilterId, LogSource};
pub use watcher::{
    DEFAULT_POLLING_INTERVAL, ErrorHandler, EventWatcher, LogHandler, WatchConfig, WatchHandle,
};
