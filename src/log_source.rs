//! The two ways a watcher can obtain logs from a node.

use alloy::{
    primitives::U256,
    rpc::types::{Filter, Log},
};

use crate::WatchError;

/// Opaque handle of a filter installed on a node.
pub type FilterId = U256;

/// Source of logs for a watcher.
///
/// A source offers a stateful path (install a filter, then poll it for changes) and a stateless
/// path (query an explicit block range). Both receive the same [`Filter`], built once from the
/// watcher's [`MatchCriteria`](crate::MatchCriteria), so they agree on what matches.
///
/// Implementations should return logs ordered by block number and log index. They must report
/// an evicted or unknown filter as [`WatchError::FilterNotFound`]; the watcher treats every other
/// error as transient.
pub trait LogSource: Clone + Send + Sync + 'static {
    /// Install a log filter and return its id.
    fn create_filter(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = Result<FilterId, WatchError>> + Send;

    /// Return the logs that matched filter `id` since it was last polled.
    fn poll_filter_changes(
        &self,
        id: FilterId,
    ) -> impl Future<Output = Result<Vec<Log>, WatchError>> + Send;

    /// Return the latest block number.
    fn current_block_number(&self) -> impl Future<Output = Result<u64, WatchError>> + Send;

    /// Return every log in `from_block..=to_block` matching `filter`.
    fn query_logs(
        &self,
        from_block: u64,
        to_block: u64,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<Log>, WatchError>> + Send;

    /// Remove filter `id`. Returns whether the node knew the filter.
    fn uninstall_filter(&self, id: FilterId)
    -> impl Future<Output = Result<bool, WatchError>> + Send;
}
