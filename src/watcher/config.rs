use std::{fmt, time::Duration};

use crate::WatchError;

/// Default time between two poll cycles.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(4);

/// Receives each delivery of logs. Never called with an empty vector.
pub type LogHandler<T> = Box<dyn FnMut(Vec<T>) + Send + 'static>;

/// Receives every RPC error the watcher could not recover from on its own.
pub type ErrorHandler = Box<dyn FnMut(WatchError) + Send + 'static>;

/// Configuration of a single watch.
///
/// `T` is the item type handed to `on_logs`: [`DecodedLog`](crate::DecodedLog) for
/// [`EventWatcher::watch`](crate::EventWatcher::watch), or the decoder's output for
/// [`EventWatcher::watch_with_decoder`](crate::EventWatcher::watch_with_decoder).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use event_watcher::{DecodedLog, WatchConfig};
///
/// let config = WatchConfig::<DecodedLog>::new(|logs| println!("{} new logs", logs.len()))
///     .polling_interval(Duration::from_secs(1))
///     .batch(false)
///     .on_error(|err| eprintln!("watch error: {err}"));
/// ```
pub struct WatchConfig<T> {
    pub(crate) on_logs: LogHandler<T>,
    pub(crate) on_error: Option<ErrorHandler>,
    pub(crate) polling_interval: Duration,
    pub(crate) batch: bool,
    pub(crate) strict: bool,
    pub(crate) from_block: Option<u64>,
    pub(crate) reacquire_filter_after: Option<Duration>,
}

impl<T> WatchConfig<T> {
    #[must_use]
    pub fn new(on_logs: impl FnMut(Vec<T>) + Send + 'static) -> Self {
        Self {
            on_logs: Box::new(on_logs),
            on_error: None,
            polling_interval: DEFAULT_POLLING_INTERVAL,
            batch: true,
            strict: false,
            from_block: None,
            reacquire_filter_after: None,
        }
    }

    /// Register a handler for RPC errors. Without one, errors are only logged.
    #[must_use]
    pub fn on_error(mut self, on_error: impl FnMut(WatchError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Set the time between poll cycles. Must be greater than zero.
    #[must_use]
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    /// Deliver all logs of a cycle in one call (`true`, the default) or one call per log.
    #[must_use]
    pub fn batch(mut self, batch: bool) -> Self {
        self.batch = batch;
        self
    }

    /// Drop logs whose data does not decode against the event ABI instead of delivering them
    /// without arguments.
    ///
    /// Only used by [`EventWatcher::watch`](crate::EventWatcher::watch); a custom decoder decides
    /// for itself.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Deliver logs starting at `block` instead of the chain head at start-up.
    #[must_use]
    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    /// While on block range queries, try installing a log filter again every `after`.
    #[must_use]
    pub fn reacquire_filter_after(mut self, after: Duration) -> Self {
        self.reacquire_filter_after = Some(after);
        self
    }
}

impl<T> fmt::Debug for WatchConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchConfig")
            .field("polling_interval", &self.polling_interval)
            .field("batch", &self.batch)
            .field("strict", &self.strict)
            .field("from_block", &self.from_block)
            .field("reacquire_filter_after", &self.reacquire_filter_after)
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}
