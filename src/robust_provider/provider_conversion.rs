use alloy::{
    network::{Ethereum, Network},
    providers::{
        Provider, RootProvider,
        fillers::{FillProvider, TxFiller},
    },
};

use crate::robust_provider::{Error, RobustProvider, RobustProviderBuilder};

/// A node connection the watcher can read logs through.
///
/// Implemented for endpoint URLs, a bare [`RootProvider`], and the filled provider returned by
/// `ProviderBuilder::new().connect(..)`. The watcher only reads, so fillers are stripped and the
/// root transport is kept.
pub trait IntoRootProvider<N: Network = Ethereum> {
    /// Resolve to a [`RootProvider`], connecting first if `self` is an endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting to the endpoint fails.
    fn into_root_provider(self) -> impl Future<Output = Result<RootProvider<N>, Error>> + Send;
}

impl<N: Network> IntoRootProvider<N> for RootProvider<N> {
    async fn into_root_provider(self) -> Result<RootProvider<N>, Error> {
        Ok(self)
    }
}

impl<N: Network> IntoRootProvider<N> for &str {
    async fn into_root_provider(self) -> Result<RootProvider<N>, Error> {
        Ok(RootProvider::connect(self).await?)
    }
}

impl<F, P, N> IntoRootProvider<N> for FillProvider<F, P, N>
where
    F: TxFiller<N>,
    P: Provider<N>,
    N: Network,
{
    async fn into_root_provider(self) -> Result<RootProvider<N>, Error> {
        Ok(self.root().clone())
    }
}

/// Anything [`EventWatcher::connect`](crate::EventWatcher::connect) accepts.
///
/// A [`RobustProvider`] is used as configured. Endpoint URLs and Alloy providers are wrapped with
/// the default timeout and retry settings.
pub trait IntoRobustProvider<N: Network = Ethereum> {
    /// Resolve to a [`RobustProvider`].
    ///
    /// # Errors
    ///
    /// Returns an error if connecting to the endpoint fails.
    fn into_robust_provider(self) -> impl Future<Output = Result<RobustProvider<N>, Error>> + Send;
}

impl<N: Network> IntoRobustProvider<N> for RobustProvider<N> {
    async fn into_robust_provider(self) -> Result<RobustProvider<N>, Error> {
        Ok(self)
    }
}

impl<N: Network> IntoRobustProvider<N> for RootProvider<N> {
    async fn into_robust_provider(self) -> Result<RobustProvider<N>, Error> {
        RobustProviderBuilder::new(self).build().await
    }
}

impl<N: Network> IntoRobustProvider<N> for &str {
    async fn into_robust_provider(self) -> Result<RobustProvider<N>, Error> {
        RobustProviderBuilder::new(self).build().await
    }
}

impl<F, P, N> IntoRobustProvider<N> for FillProvider<F, P, N>
where
    F: TxFiller<N> + 'static,
    P: Provider<N> + 'static,
    N: Network,
{
    async fn into_robust_provider(self) -> Result<RobustProvider<N>, Error> {
        RobustProviderBuilder::new(self).build().await
    }
}
