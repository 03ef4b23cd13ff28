use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use alloy::{
    primitives::{Address, B256, LogData, U256},
    rpc::types::{Filter, Log},
};

use crate::{
    WatchError,
    log_source::{FilterId, LogSource},
};

/// A [`LogSource`] method, for fault injection and call counting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Call {
    CreateFilter,
    PollFilterChanges,
    BlockNumber,
    QueryLogs,
    UninstallFilter,
}

/// In-memory chain implementing [`LogSource`].
///
/// Blocks are mined explicitly with [`mine`](Self::mine). Filters behave like a typical node's:
/// a new filter only reports logs from blocks mined after it was installed, and each poll
/// returns what was mined since the previous one. Clones share the same chain.
#[derive(Clone, Debug, Default)]
pub struct MockLogSource {
    chain: Arc<Mutex<Chain>>,
}

#[derive(Debug, Default)]
struct Chain {
    head: u64,
    logs: Vec<Log>,
    filters: HashMap<FilterId, InstalledFilter>,
    next_filter_id: u64,
    queued_faults: HashMap<Call, VecDeque<WatchError>>,
    persistent_faults: HashMap<Call, WatchError>,
    calls: HashMap<Call, usize>,
    reverse_responses: bool,
}

#[derive(Debug)]
struct InstalledFilter {
    filter: Filter,
    polled_through: u64,
}

impl MockLogSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mine one block containing `logs`, in order. Returns the new block number.
    pub fn mine(&self, logs: impl IntoIterator<Item = (Address, LogData)>) -> u64 {
        let mut chain = self.chain();
        chain.head += 1;
        let block_number = chain.head;
        let block_hash = B256::from(U256::from(block_number));

        for (log_index, (address, data)) in logs.into_iter().enumerate() {
            let log_index = log_index as u64;
            chain.logs.push(Log {
                inner: alloy::primitives::Log { address, data },
                block_hash: Some(block_hash),
                block_number: Some(block_number),
                transaction_hash: Some(B256::from(U256::from((block_number << 32) | log_index))),
                transaction_index: Some(log_index),
                log_index: Some(log_index),
                ..Default::default()
            });
        }

        block_number
    }

    /// Mine `count` blocks without logs.
    pub fn mine_empty(&self, count: u64) {
        self.chain().head += count;
    }

    #[must_use]
    pub fn head(&self) -> u64 {
        self.chain().head
    }

    /// Make the next call of `call` fail with `error`. Queued errors are consumed in order.
    pub fn fail_next(&self, call: Call, error: WatchError) {
        self.chain().queued_faults.entry(call).or_default().push_back(error);
    }

    /// Make every call of `call` fail with `error` until [`heal`](Self::heal) is called.
    pub fn fail_always(&self, call: Call, error: WatchError) {
        self.chain().persistent_faults.insert(call, error);
    }

    /// Stop failing `call`.
    pub fn heal(&self, call: Call) {
        let mut chain = self.chain();
        chain.persistent_faults.remove(&call);
        chain.queued_faults.remove(&call);
    }

    /// Forget every installed filter, as a node does when filters expire.
    pub fn evict_filters(&self) {
        self.chain().filters.clear();
    }

    /// Return logs newest first, as a misbehaving node might.
    pub fn reverse_responses(&self, reverse: bool) {
        self.chain().reverse_responses = reverse;
    }

    #[must_use]
    pub fn installed_filters(&self) -> usize {
        self.chain().filters.len()
    }

    /// Number of times `call` was made, failed attempts included.
    #[must_use]
    pub fn calls(&self, call: Call) -> usize {
        self.chain().calls.get(&call).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.chain().calls.values().sum()
    }

    fn chain(&self) -> MutexGuard<'_, Chain> {
        // A panicking test thread must not hide the original failure behind a poisoned lock.
        self.chain.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Count the call and return the injected fault, if any.
    fn enter(&self, call: Call) -> Result<MutexGuard<'_, Chain>, WatchError> {
        let mut chain = self.chain();
        *chain.calls.entry(call).or_default() += 1;

        if let Some(error) = chain.queued_faults.get_mut(&call).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        if let Some(error) = chain.persistent_faults.get(&call) {
            return Err(error.clone());
        }
        Ok(chain)
    }
}

impl Chain {
    fn matching(&self, from_block: u64, to_block: u64, filter: &Filter) -> Vec<Log> {
        let mut logs: Vec<Log> = self
            .logs
            .iter()
            .filter(|log| {
                log.block_number.is_some_and(|number| (from_block..=to_block).contains(&number))
            })
            .filter(|log| filter_matches(filter, log))
            .cloned()
            .collect();
        if self.reverse_responses {
            logs.reverse();
        }
        logs
    }
}

fn filter_matches(filter: &Filter, log: &Log) -> bool {
    if !filter.address.matches(&log.address()) {
        return false;
    }
    filter.topics.iter().enumerate().all(|(position, accepted)| {
        accepted.is_empty() || log.topics().get(position).is_some_and(|t| accepted.matches(t))
    })
}

impl LogSource for MockLogSource {
    async fn create_filter(&self, filter: &Filter) -> Result<FilterId, WatchError> {
        let mut chain = self.enter(Call::CreateFilter)?;
        chain.next_filter_id += 1;
        let id = U256::from(chain.next_filter_id);
        let polled_through = chain.head;
        chain.filters.insert(id, InstalledFilter { filter: filter.clone(), polled_through });
        Ok(id)
    }

    async fn poll_filter_changes(&self, id: FilterId) -> Result<Vec<Log>, WatchError> {
        let mut chain = self.enter(Call::PollFilterChanges)?;
        let head = chain.head;
        let Some(installed) = chain.filters.get(&id) else {
            return Err(WatchError::FilterNotFound(id));
        };
        let logs = chain.matching(installed.polled_through + 1, head, &installed.filter);
        if let Some(installed) = chain.filters.get_mut(&id) {
            installed.polled_through = head;
        }
        Ok(logs)
    }

    async fn current_block_number(&self) -> Result<u64, WatchError> {
        Ok(self.enter(Call::BlockNumber)?.head)
    }

    async fn query_logs(
        &self,
        from_block: u64,
        to_block: u64,
        filter: &Filter,
    ) -> Result<Vec<Log>, WatchError> {
        let chain = self.enter(Call::QueryLogs)?;
        Ok(chain.matching(from_block, to_block, filter))
    }

    async fn uninstall_filter(&self, id: FilterId) -> Result<bool, WatchError> {
        let mut chain = self.enter(Call::UninstallFilter)?;
        Ok(chain.filters.remove(&id).is_some())
    }
}
