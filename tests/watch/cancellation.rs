use std::sync::{Arc, Mutex};

use event_watcher::{
    DecodedLog, MatchCriteria, WatchConfig, WatchHandle, assert_delivered,
    test_utils::{Call, Recorder},
};

use crate::common::{
    ALICE, BOB, INTERVAL, TOKEN, TRANSFER_SIGNATURE, config, emit, next_poll, setup, started,
    transfer,
};

fn transfers_at_token() -> MatchCriteria {
    MatchCriteria::builder()
        .address(TOKEN)
        .event_signature(TRANSFER_SIGNATURE)
        .build()
        .expect("valid criteria")
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_polling_and_uninstalls_filter() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    let recorder = Recorder::<DecodedLog>::new();
    let handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;
    next_poll().await;

    handle.cancel();
    handle.stopped().await;
    let calls = source.calls(Call::PollFilterChanges);

    source.mine([emit(&transfer(ALICE, BOB, 1))]);
    next_poll().await;
    next_poll().await;

    assert!(recorder.batches().is_empty());
    assert_eq!(source.calls(Call::PollFilterChanges), calls);
    assert_eq!(source.calls(Call::UninstallFilter), 1);
    assert_eq!(source.installed_filters(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancel_is_idempotent() -> anyhow::Result<()> {
    let (_source, watcher) = setup();
    let recorder = Recorder::<DecodedLog>::new();
    let handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    handle.cancel();
    handle.clone().cancel();
    handle.stopped().await;
    handle.cancel();

    assert!(handle.is_cancelled());
    assert!(handle.is_stopped());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancel_from_inside_handler_stops_remaining_deliveries() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    let delivered: Arc<Mutex<Vec<Vec<DecodedLog>>>> = Arc::default();
    let slot: Arc<Mutex<Option<WatchHandle>>> = Arc::default();

    let sink = delivered.clone();
    let own_handle = slot.clone();
    let config = WatchConfig::new(move |logs: Vec<DecodedLog>| {
        sink.lock().unwrap().push(logs);
        if let Some(handle) = own_handle.lock().unwrap().as_ref() {
            handle.cancel();
        }
    })
    .polling_interval(INTERVAL)
    .batch(false);

    let handle = watcher.watch(transfers_at_token(), config)?;
    *slot.lock().unwrap() = Some(handle.clone());
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 1)), emit(&transfer(ALICE, BOB, 2))]);
    next_poll().await;
    handle.stopped().await;

    source.mine([emit(&transfer(ALICE, BOB, 3))]);
    next_poll().await;

    assert_eq!(delivered.lock().unwrap().len(), 1);
    assert!(handle.is_cancelled());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn watches_are_independent() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    let first = Recorder::<DecodedLog>::new();
    let second = Recorder::<DecodedLog>::new();
    let first_handle = watcher.watch(transfers_at_token(), config(&first))?;
    let _second_handle = watcher.watch(transfers_at_token(), config(&second))?;
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 1))]);
    next_poll().await;
    first_handle.cancel();
    first_handle.stopped().await;
    source.mine([emit(&transfer(ALICE, BOB, 2))]);
    next_poll().await;

    assert_delivered!(first, [transfer(ALICE, BOB, 1)]);
    assert_delivered!(second, [transfer(ALICE, BOB, 1), transfer(ALICE, BOB, 2)]);
    assert_eq!(source.installed_filters(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn handle_drop_does_not_stop_the_watch() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    let recorder = Recorder::<DecodedLog>::new();
    drop(watcher.watch(transfers_at_token(), config(&recorder))?);
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 1))]);
    next_poll().await;

    assert_delivered!(recorder, [transfer(ALICE, BOB, 1)]);

    Ok(())
}
