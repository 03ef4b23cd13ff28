use tokio_util::sync::CancellationToken;

/// Control over a running watch.
///
/// Handles are cheap to clone and every clone controls the same watch. Dropping handles does not
/// stop the watch; call [`cancel`](Self::cancel).
///
/// # Example
///
/// ```ignore
/// let handle = watcher.watch(criteria, WatchConfig::new(|logs| println!("{logs:?}")))?;
///
/// // later, from anywhere (including inside `on_logs`)
/// handle.cancel();
/// handle.stopped().await;
/// ```
#[derive(Clone, Debug)]
pub struct WatchHandle {
    token: CancellationToken,
    finished: CancellationToken,
}

impl WatchHandle {
    pub(crate) fn new() -> Self {
        Self { token: CancellationToken::new(), finished: CancellationToken::new() }
    }

    /// Stop the watch. No new poll cycle starts and no further logs are delivered.
    ///
    /// Idempotent, and safe to call from within a handler. A request already sent to the node
    /// is allowed to complete, but its result is discarded.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!("Watch cancelled");
        }
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the watch task has exited and its filter was uninstalled.
    ///
    /// Also resolves if the task ended because a handler panicked.
    pub async fn stopped(&self) {
        self.finished.cancelled().await;
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.finished.is_cancelled()
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub(crate) fn finished(&self) -> CancellationToken {
        self.finished.clone()
    }
}
