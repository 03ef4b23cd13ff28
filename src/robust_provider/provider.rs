use std::{fmt::Debug, time::Duration};

use alloy::{
    network::{Ethereum, Network},
    primitives::U256,
    providers::{Provider, RootProvider},
    rpc::types::{Filter, Log},
    transports::{RpcError, TransportErrorKind},
};
use backon::{ExponentialBuilder, Retryable};
use tokio::time::timeout;

use crate::{
    WatchError,
    log_source::{FilterId, LogSource},
    robust_provider::{Error, is_filter_not_found},
};

/// Provider wrapper with built-in retry and timeout mechanisms.
///
/// Every call is bounded by `call_timeout` and retried with exponential backoff. Stateless calls
/// (`eth_blockNumber`, `eth_getLogs`) fail over to the fallback providers in order; filter calls
/// stay on the primary provider because filter ids only mean something to the node that issued
/// them.
#[derive(Clone, Debug)]
pub struct RobustProvider<N: Network = Ethereum> {
    pub(crate) primary_provider: RootProvider<N>,
    pub(crate) fallback_providers: Vec<RootProvider<N>>,
    pub(crate) call_timeout: Duration,
    pub(crate) max_retries: usize,
    pub(crate) min_delay: Duration,
}

impl<N: Network> RobustProvider<N> {
    /// Get a reference to the primary provider
    #[must_use]
    pub fn primary(&self) -> &RootProvider<N> {
        &self.primary_provider
    }

    /// Fetch the latest block number with retry and timeout.
    ///
    /// # Errors
    ///
    /// See [retry errors](#retry-errors).
    pub async fn get_block_number(&self) -> Result<u64, Error> {
        trace!("eth_blockNumber called");
        let result = self
            .try_operation_with_failover(move |provider| async move {
                provider.get_block_number().await
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_blockNumber failed");
        }
        result
    }

    /// Fetch logs for the given [`Filter`] with retry and timeout.
    ///
    /// # Errors
    ///
    /// See [retry errors](#retry-errors).
    pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, Error> {
        trace!("eth_getLogs called");
        let result = self
            .try_operation_with_failover(move |provider| async move {
                provider.get_logs(filter).await
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_getLogs failed");
        }
        result
    }

    /// Install a log filter on the primary provider.
    ///
    /// # Errors
    ///
    /// See [retry errors](#retry-errors).
    pub async fn new_filter(&self, filter: &Filter) -> Result<U256, Error> {
        trace!("eth_newFilter called");
        let result = self
            .try_provider_with_timeout(self.primary(), move |provider| async move {
                provider.new_filter(filter).await
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_newFilter failed");
        }
        result
    }

    /// Fetch the logs recorded by filter `id` since its last poll.
    ///
    /// # Errors
    ///
    /// See [retry errors](#retry-errors). A filter-not-found response is returned without
    /// retrying.
    pub async fn get_filter_changes(&self, id: U256) -> Result<Vec<Log>, Error> {
        trace!(filter_id = %id, "eth_getFilterChanges called");
        let result = self
            .try_provider_with_retry_predicate(
                self.primary(),
                move |provider| async move { provider.get_filter_changes::<Log>(id).await },
                |err| !is_filter_not_found(err),
            )
            .await;
        if let Err(e) = &result {
            error!(filter_id = %id, error = %e, "eth_getFilterChanges failed");
        }
        result
    }

    /// Remove filter `id` from the primary provider.
    ///
    /// # Errors
    ///
    /// See [retry errors](#retry-errors).
    pub async fn uninstall_filter(&self, id: U256) -> Result<bool, Error> {
        trace!(filter_id = %id, "eth_uninstallFilter called");
        self.try_provider_with_timeout(self.primary(), move |provider| async move {
            provider.uninstall_filter(id).await
        })
        .await
    }

    /// Execute `operation` against the primary provider, then against each fallback in order
    /// until one succeeds.
    ///
    /// # Errors
    /// <a name="retry-errors"></a>
    ///
    /// * [`Error::Timeout`] if the call, retries included, exceeds `call_timeout` on the last
    ///   provider tried.
    /// * [`Error::RpcError`] carrying the last provider's error once retries are exhausted.
    pub(crate) async fn try_operation_with_failover<T: Debug, F, Fut>(
        &self,
        operation: F,
    ) -> Result<T, Error>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let mut last_error = match self.try_provider_with_timeout(self.primary(), &operation).await
        {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let num_fallbacks = self.fallback_providers.len();
        if num_fallbacks > 0 {
            info!("Primary provider failed, trying fallback provider(s)");
        }

        for (fallback_idx, provider) in self.fallback_providers.iter().enumerate() {
            match self.try_provider_with_timeout(provider, &operation).await {
                Ok(value) => {
                    info!(provider_num = fallback_idx + 1, "Fallback provider succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(provider_num = fallback_idx + 1, error = %e, "Fallback provider failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Try executing an operation with a specific provider with retry and timeout.
    pub(crate) async fn try_provider_with_timeout<T, F, Fut>(
        &self,
        provider: &RootProvider<N>,
        operation: F,
    ) -> Result<T, Error>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        self.try_provider_with_retry_predicate(provider, operation, |_| true).await
    }

    /// Like [`try_provider_with_timeout`](Self::try_provider_with_timeout), but only errors
    /// accepted by `retryable` are retried. Any other error is returned after the first attempt.
    pub(crate) async fn try_provider_with_retry_predicate<T, F, Fut>(
        &self,
        provider: &RootProvider<N>,
        operation: F,
        retryable: fn(&RpcError<TransportErrorKind>) -> bool,
    ) -> Result<T, Error>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let retry_strategy = ExponentialBuilder::default()
            .with_max_times(self.max_retries)
            .with_min_delay(self.min_delay);

        timeout(
            self.call_timeout,
            (|| operation(provider.clone()))
                .retry(retry_strategy)
                .when(retryable)
                .notify(|err: &RpcError<TransportErrorKind>, dur: Duration| {
                    debug!(error = %err, delay_ms = dur.as_millis(), "RPC error, retrying");
                })
                .sleep(tokio::time::sleep),
        )
        .await
        .map_err(Error::from)?
        .map_err(Error::from)
    }
}

impl<N: Network> LogSource for RobustProvider<N> {
    async fn create_filter(&self, filter: &Filter) -> Result<FilterId, WatchError> {
        Ok(self.new_filter(filter).await?)
    }

    async fn poll_filter_changes(&self, id: FilterId) -> Result<Vec<Log>, WatchError> {
        match self.get_filter_changes(id).await {
            Ok(logs) => Ok(logs),
            Err(Error::RpcError(err)) if is_filter_not_found(&err) => {
                Err(WatchError::FilterNotFound(id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn current_block_number(&self) -> Result<u64, WatchError> {
        Ok(self.get_block_number().await?)
    }

    async fn query_logs(
        &self,
        from_block: u64,
        to_block: u64,
        filter: &Filter,
    ) -> Result<Vec<Log>, WatchError> {
        let ranged = filter.clone().from_block(from_block).to_block(to_block);
        Ok(self.get_logs(&ranged).await?)
    }

    async fn uninstall_filter(&self, id: FilterId) -> Result<bool, WatchError> {
        Ok(RobustProvider::uninstall_filter(self, id).await?)
    }
}
