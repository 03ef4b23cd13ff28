use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::log_source::FilterId;

/// How the next poll cycle obtains logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PollMode {
    /// Nothing attempted yet; the first cycle installs a filter.
    Uninitialized,
    /// Polling an installed filter.
    Filter {
        id: FilterId,
        /// Logs at or below this block were already delivered by a range query.
        delivered_through: Option<u64>,
    },
    /// Range mode without a starting block yet.
    AwaitingCursor,
    /// Querying `last_seen_block + 1..=head` every cycle.
    Range {
        last_seen_block: u64,
        /// When to try installing a filter again, if enabled.
        reacquire_at: Option<Instant>,
    },
    Stopped,
}

/// Mutable state of one watcher. Only the engine touches it, and only between cycles.
#[derive(Debug)]
pub(crate) struct PollState {
    mode: PollMode,
    active: CancellationToken,
}

impl PollState {
    pub(crate) fn new(active: CancellationToken) -> Self {
        Self { mode: PollMode::Uninitialized, active }
    }

    pub(crate) fn mode(&self) -> PollMode {
        self.mode
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.active.is_cancelled()
    }

    pub(crate) fn transition(&mut self, mode: PollMode) {
        trace!(from = ?self.mode, to = ?mode, "Poll mode transition");
        self.mode = mode;
    }

    /// Move the range cursor forward. A cursor never moves back.
    pub(crate) fn advance_cursor(&mut self, to: u64) {
        if let PollMode::Range { last_seen_block, .. } = &mut self.mode {
            *last_seen_block = (*last_seen_block).max(to);
        }
    }
}
