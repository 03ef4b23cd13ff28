//! Polling watcher built on top of a [`LogSource`].

use alloy::network::Network;

use crate::{
    WatchError,
    criteria::IntoMatchCriteria,
    decoder::{AbiDecoder, DecodedLog, EventDecoder},
    log_source::LogSource,
    robust_provider::{IntoRobustProvider, RobustProvider},
};

mod config;
mod engine;
mod handle;
mod scheduler;
mod state;

pub use config::{DEFAULT_POLLING_INTERVAL, ErrorHandler, LogHandler, WatchConfig};
pub use handle::WatchHandle;

use engine::WatcherEngine;

/// Starts watches against one [`LogSource`].
///
/// Each call to [`watch`](Self::watch) spawns an independent task on the current Tokio runtime.
/// The watch installs a log filter on its first cycle and polls it every `polling_interval`. If
/// the node refuses the filter, it queries block ranges instead. An evicted filter is reinstalled
/// on the cycle that notices it.
///
/// # Example
///
/// ```no_run
/// use alloy::primitives::address;
/// use event_watcher::{
///     DecodedLog, EventWatcher, MatchCriteria, WatchConfig, robust_provider::RobustProvider,
/// };
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let watcher: EventWatcher<RobustProvider> = EventWatcher::connect("http://localhost:8545").await?;
///
/// let criteria = MatchCriteria::builder()
///     .address(address!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"))
///     .event_signature("Transfer(address indexed from, address indexed to, uint256 value)");
///
/// let handle = watcher.watch(
///     criteria,
///     WatchConfig::new(|logs: Vec<DecodedLog>| {
///         for log in logs {
///             println!("{:?} {:?}", log.event_name, log.args);
///         }
///     }),
/// )?;
///
/// tokio::signal::ctrl_c().await?;
/// handle.cancel();
/// handle.stopped().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct EventWatcher<S: LogSource> {
    source: S,
}

impl<S: LogSource> EventWatcher<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Watch for logs matching `criteria`, decoded against the watched events' ABI.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// * [`WatchError::Criteria`] if the criteria are invalid.
    /// * [`WatchError::InvalidPollingInterval`] if the polling interval is zero.
    pub fn watch(
        &self,
        criteria: impl IntoMatchCriteria,
        config: WatchConfig<DecodedLog>,
    ) -> Result<WatchHandle, WatchError> {
        let decoder = AbiDecoder::new(config.strict);
        self.watch_with_decoder(criteria, decoder, config)
    }

    /// Watch for logs matching `criteria`, transformed by `decoder`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Same as [`watch`](Self::watch).
    pub fn watch_with_decoder<D: EventDecoder>(
        &self,
        criteria: impl IntoMatchCriteria,
        decoder: D,
        config: WatchConfig<D::Output>,
    ) -> Result<WatchHandle, WatchError> {
        if config.polling_interval.is_zero() {
            return Err(WatchError::InvalidPollingInterval);
        }
        let criteria = criteria.into_match_criteria()?;

        debug!(
            addresses = criteria.addresses().len(),
            events = criteria.events().len(),
            polling_interval_ms = config.polling_interval.as_millis(),
            batch = config.batch,
            "Starting watch"
        );

        let polling_interval = config.polling_interval;
        let handle = WatchHandle::new();
        let engine =
            WatcherEngine::new(self.source.clone(), criteria, decoder, config, handle.token());
        scheduler::spawn(engine, polling_interval, &handle);

        Ok(handle)
    }
}

impl<N: Network> EventWatcher<RobustProvider<N>> {
    /// Connect to a node with default retry settings.
    ///
    /// Accepts anything [`IntoRobustProvider`] does: a URL, an Alloy provider, or a configured
    /// [`RobustProvider`].
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to connect.
    pub async fn connect(provider: impl IntoRobustProvider<N>) -> Result<Self, WatchError> {
        Ok(Self::new(provider.into_robust_provider().await?))
    }
}
