//! Retrying, failover-aware wrapper around Alloy providers.
//!
//! [`RobustProvider`] is the crate's production [`LogSource`](crate::LogSource). It wraps an
//! Alloy [`RootProvider`](alloy::providers::RootProvider) and adds:
//! * a total timeout per call, retries included
//! * exponential backoff retries
//! * failover to fallback providers for stateless calls
//!
//! Filter calls are pinned to the primary provider since a filter id only exists on the node
//! that created it. When the primary is unreachable, filter creation fails and the watcher
//! switches to `eth_getLogs`, which does fail over.
//!
//! # Examples
//!
//! ```rust,no_run
//! use alloy::providers::ProviderBuilder;
//! use event_watcher::robust_provider::RobustProviderBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let primary = ProviderBuilder::new().connect("http://localhost:8545").await?;
//! let backup = ProviderBuilder::new().connect("http://localhost:8546").await?;
//!
//! let robust = RobustProviderBuilder::new(primary)
//!     .fallback(backup)
//!     .call_timeout(Duration::from_secs(10))
//!     .max_retries(5)
//!     .build()
//!     .await?;
//!
//! let head = robust.get_block_number().await?;
//! println!("Current block: {head}");
//! # Ok(()) }
//! ```

pub mod builder;
mod error;
pub mod provider;
pub mod provider_conversion;

pub use builder::*;
pub use error::{Error, FILTER_NOT_FOUND_CODE, is_filter_not_found};
pub use provider::RobustProvider;
pub use provider_conversion::{IntoRobustProvider, IntoRootProvider};
