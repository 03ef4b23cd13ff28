use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

use crate::{
    decoder::EventDecoder,
    log_source::LogSource,
    watcher::{engine::WatcherEngine, handle::WatchHandle},
};

/// Spawn the task that drives `engine` every `polling_interval` until `handle` is cancelled.
///
/// The first tick fires immediately and initializes the engine. A cycle that outlasts the
/// interval delays the next one instead of bunching ticks up.
pub(crate) fn spawn<S: LogSource, D: EventDecoder>(
    mut engine: WatcherEngine<S, D>,
    polling_interval: Duration,
    handle: &WatchHandle,
) -> JoinHandle<()> {
    let token = handle.token();
    let finished = handle.finished();

    tokio::spawn(async move {
        // Dropped in reverse order, also when a handler panics: cancel first, then signal.
        let _finished = finished.drop_guard();
        let _cancel = token.clone().drop_guard();

        let mut ticker = interval(polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            engine.tick().await;
        }

        engine.shutdown().await;
    })
}
