use std::time::Duration;

use alloy::rpc::types::{Filter, Log};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    MatchCriteria, WatchError,
    decoder::EventDecoder,
    log_source::{FilterId, LogSource},
    watcher::{
        config::{ErrorHandler, LogHandler, WatchConfig},
        state::{PollMode, PollState},
    },
};

/// Runs poll cycles for one watch.
///
/// The engine prefers an installed log filter and falls back to block range queries when the
/// node will not give it one. Cycles never overlap: the scheduler awaits [`tick`](Self::tick)
/// before waiting for the next interval.
pub(crate) struct WatcherEngine<S: LogSource, D: EventDecoder> {
    source: S,
    criteria: MatchCriteria,
    decoder: D,
    /// Filter for the first installation, carrying the configured start block.
    initial_filter: Filter,
    on_logs: LogHandler<D::Output>,
    on_error: Option<ErrorHandler>,
    batch: bool,
    from_block: Option<u64>,
    reacquire_after: Option<Duration>,
    state: PollState,
}

impl<S: LogSource, D: EventDecoder> WatcherEngine<S, D> {
    pub(crate) fn new(
        source: S,
        criteria: MatchCriteria,
        decoder: D,
        config: WatchConfig<D::Output>,
        active: CancellationToken,
    ) -> Self {
        let initial_filter = match config.from_block {
            Some(block) => criteria.filter().clone().from_block(block),
            None => criteria.filter().clone(),
        };

        Self {
            source,
            criteria,
            decoder,
            initial_filter,
            on_logs: config.on_logs,
            on_error: config.on_error,
            batch: config.batch,
            from_block: config.from_block,
            reacquire_after: config.reacquire_filter_after,
            state: PollState::new(active),
        }
    }

    #[cfg(test)]
    pub(crate) fn mode(&self) -> PollMode {
        self.state.mode()
    }

    /// Run one poll cycle.
    pub(crate) async fn tick(&mut self) {
        if !self.state.is_active() {
            return;
        }

        match self.state.mode() {
            PollMode::Uninitialized => self.initialize().await,
            PollMode::Filter { id, delivered_through } => {
                self.poll_filter(id, delivered_through).await;
            }
            PollMode::AwaitingCursor => self.bootstrap_range().await,
            PollMode::Range { last_seen_block, reacquire_at } => {
                if reacquire_at.is_some_and(|at| Instant::now() >= at) {
                    self.reacquire_filter(last_seen_block).await;
                } else {
                    self.poll_range(last_seen_block).await;
                }
            }
            PollMode::Stopped => {}
        }
    }

    /// Uninstall the filter, if any, and stop.
    pub(crate) async fn shutdown(&mut self) {
        if let PollMode::Filter { id, .. } = self.state.mode() {
            self.uninstall(id).await;
        }
        self.state.transition(PollMode::Stopped);
        debug!("Watcher stopped");
    }

    async fn initialize(&mut self) {
        debug!(from_block = ?self.from_block, "Installing log filter");

        match self.source.create_filter(&self.initial_filter).await {
            Ok(id) => match self.from_block {
                Some(from_block) => self.adopt_filter(id, from_block.saturating_sub(1)).await,
                None => {
                    info!(filter_id = %id, "Watching with log filter");
                    self.state.transition(PollMode::Filter { id, delivered_through: None });
                }
            },
            Err(err) => {
                warn!(error = %err, "Log filter unavailable, falling back to block range queries");
                match self.from_block {
                    Some(from_block) => self.enter_range(from_block.saturating_sub(1)),
                    None => self.bootstrap_range().await,
                }
            }
        }
    }

    async fn poll_filter(&mut self, id: FilterId, delivered_through: Option<u64>) {
        trace!(filter_id = %id, "Polling filter changes");

        match self.source.poll_filter_changes(id).await {
            Ok(mut logs) => {
                if let Some(through) = delivered_through {
                    logs.retain(|log| log.block_number.is_none_or(|number| number > through));
                }
                self.deliver(logs);
            }
            Err(err) if err.is_filter_not_found() => {
                warn!(filter_id = %id, "Log filter no longer exists, reinstalling");
                self.recover_filter().await;
            }
            Err(err) => {
                warn!(filter_id = %id, error = %err, "Filter poll failed");
                self.report(err);
            }
        }
    }

    /// Replace an evicted filter. Nothing is delivered in the cycle that does this.
    async fn recover_filter(&mut self) {
        if !self.state.is_active() {
            return;
        }

        match self.source.create_filter(self.criteria.filter()).await {
            Ok(id) => {
                info!(filter_id = %id, "Log filter reinstalled");
                self.state.transition(PollMode::Filter { id, delivered_through: None });
            }
            Err(err) => {
                warn!(error = %err, "Could not reinstall log filter, falling back to block range queries");
                self.report(err);
                self.bootstrap_range().await;
            }
        }
    }

    /// Start range mode at the current head.
    async fn bootstrap_range(&mut self) {
        if !self.state.is_active() {
            return;
        }

        match self.source.current_block_number().await {
            Ok(head) => self.enter_range(head),
            Err(err) => {
                warn!(error = %err, "Could not fetch starting block");
                self.state.transition(PollMode::AwaitingCursor);
                self.report(err);
            }
        }
    }

    fn enter_range(&mut self, last_seen_block: u64) {
        info!(last_seen_block = last_seen_block, "Watching with block range queries");
        // An interval too large to represent means never.
        let reacquire_at = self.reacquire_after.and_then(|after| Instant::now().checked_add(after));
        self.state.transition(PollMode::Range { last_seen_block, reacquire_at });
    }

    async fn poll_range(&mut self, last_seen_block: u64) {
        if let Some(to) = self.sync_range(last_seen_block).await {
            self.state.advance_cursor(to);
        }
    }

    /// Deliver every matching log in `last_seen_block + 1..=head` with a single query.
    ///
    /// Returns the new cursor, or `None` if the range must be retried.
    async fn sync_range(&mut self, last_seen_block: u64) -> Option<u64> {
        if !self.state.is_active() {
            return None;
        }

        let head = match self.source.current_block_number().await {
            Ok(head) => head,
            Err(err) => {
                warn!(error = %err, "Could not fetch block number");
                self.report(err);
                return None;
            }
        };

        if head <= last_seen_block {
            trace!(head = head, "No new blocks");
            return Some(last_seen_block);
        }

        if !self.state.is_active() {
            return None;
        }

        let from_block = last_seen_block + 1;
        match self.source.query_logs(from_block, head, self.criteria.filter()).await {
            Ok(logs) => {
                debug!(
                    from_block = from_block,
                    to_block = head,
                    log_count = logs.len(),
                    "Queried block range"
                );
                self.deliver(logs);
                Some(head)
            }
            Err(err) => {
                warn!(from_block = from_block, to_block = head, error = %err, "Log query failed");
                self.report(err);
                None
            }
        }
    }

    /// Try to leave range mode for a freshly installed filter.
    async fn reacquire_filter(&mut self, last_seen_block: u64) {
        debug!(last_seen_block = last_seen_block, "Trying to reinstall log filter");

        match self.source.create_filter(self.criteria.filter()).await {
            Ok(id) => self.adopt_filter(id, last_seen_block).await,
            Err(err) => {
                self.report(err);
                self.enter_range(last_seen_block);
                self.poll_range(last_seen_block).await;
            }
        }
    }

    /// Catch up from `cursor` with a range query, then switch to filter `id`.
    ///
    /// Filter results at or below the caught-up head are dropped later since the range query
    /// already delivered them. If catching up fails the filter is discarded and range mode
    /// continues from `cursor`.
    async fn adopt_filter(&mut self, id: FilterId, cursor: u64) {
        match self.sync_range(cursor).await {
            Some(through) => {
                info!(filter_id = %id, delivered_through = through, "Watching with log filter");
                self.state.transition(PollMode::Filter { id, delivered_through: Some(through) });
            }
            None => {
                self.uninstall(id).await;
                self.enter_range(cursor);
            }
        }
    }

    async fn uninstall(&mut self, id: FilterId) {
        match self.source.uninstall_filter(id).await {
            Ok(true) => debug!(filter_id = %id, "Log filter uninstalled"),
            Ok(false) => debug!(filter_id = %id, "Log filter was already gone"),
            Err(err) => warn!(filter_id = %id, error = %err, "Failed to uninstall log filter"),
        }
    }

    fn deliver(&mut self, mut logs: Vec<Log>) {
        logs.sort_by_key(|log| {
            (log.block_number.unwrap_or(u64::MAX), log.log_index.unwrap_or(u64::MAX))
        });

        let items: Vec<D::Output> =
            logs.into_iter().filter_map(|log| self.decoder.decode(log, &self.criteria)).collect();

        if items.is_empty() || !self.state.is_active() {
            return;
        }

        trace!(log_count = items.len(), batch = self.batch, "Delivering logs");

        if self.batch {
            (self.on_logs)(items);
            return;
        }

        for item in items {
            if !self.state.is_active() {
                break;
            }
            (self.on_logs)(vec![item]);
        }
    }

    fn report(&mut self, err: WatchError) {
        if !self.state.is_active() {
            return;
        }
        match &mut self.on_error {
            Some(on_error) => on_error(err),
            None => error!(error = %err, "Unhandled watcher error"),
        }
    }
}
