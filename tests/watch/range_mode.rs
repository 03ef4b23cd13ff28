use event_watcher::{
    DecodedLog, MatchCriteria, WatchError, assert_delivered, assert_nothing_delivered,
    test_utils::{Call, Recorder},
};

use crate::common::{
    ALICE, BOB, TOKEN, TRANSFER_SIGNATURE, config, emit, next_poll, setup, started, transfer,
};

fn transfers_at_token() -> MatchCriteria {
    MatchCriteria::builder()
        .address(TOKEN)
        .event_signature(TRANSFER_SIGNATURE)
        .build()
        .expect("valid criteria")
}

#[tokio::test(start_paused = true)]
async fn refused_filter_falls_back_to_range_queries() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    source.fail_always(Call::CreateFilter, WatchError::Timeout);
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 1))]);
    next_poll().await;
    source.mine([emit(&transfer(ALICE, BOB, 2))]);
    next_poll().await;

    assert_delivered!(recorder, [transfer(ALICE, BOB, 1), transfer(ALICE, BOB, 2)]);
    assert_eq!(source.calls(Call::PollFilterChanges), 0);
    assert_eq!(source.calls(Call::CreateFilter), 1);
    assert!(recorder.errors().is_empty());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn blocks_mined_between_polls_are_not_missed() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    source.fail_always(Call::CreateFilter, WatchError::Timeout);
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 1))]);
    source.mine_empty(4);
    source.mine([emit(&transfer(ALICE, BOB, 2)), emit(&transfer(BOB, ALICE, 3))]);
    source.mine([emit(&transfer(ALICE, BOB, 4))]);
    next_poll().await;

    assert_eq!(recorder.batches().len(), 1);
    assert_eq!(source.calls(Call::QueryLogs), 1);
    assert_delivered!(
        recorder,
        [
            transfer(ALICE, BOB, 1),
            transfer(ALICE, BOB, 2),
            transfer(BOB, ALICE, 3),
            transfer(ALICE, BOB, 4),
        ]
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_query_is_reported_and_retried_without_loss() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    source.fail_always(Call::CreateFilter, WatchError::Timeout);
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 1))]);
    source.fail_next(Call::QueryLogs, WatchError::Timeout);
    next_poll().await;

    assert_nothing_delivered!(recorder);
    assert_eq!(recorder.errors(), vec![WatchError::Timeout]);

    next_poll().await;

    assert_delivered!(recorder, [transfer(ALICE, BOB, 1)]);
    assert_eq!(recorder.errors().len(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_block_number_is_reported() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    source.fail_always(Call::CreateFilter, WatchError::Timeout);
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 1))]);
    source.fail_next(Call::BlockNumber, WatchError::Timeout);
    next_poll().await;
    next_poll().await;

    assert_eq!(recorder.errors(), vec![WatchError::Timeout]);
    assert_delivered!(recorder, [transfer(ALICE, BOB, 1)]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn filter_and_block_number_failures_report_once_then_recover() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    source.mine_empty(10);
    source.fail_always(Call::CreateFilter, WatchError::Timeout);
    source.fail_next(Call::BlockNumber, WatchError::Timeout);
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    assert_eq!(recorder.errors(), vec![WatchError::Timeout]);

    // The cursor is taken on this poll, so this block is not reported.
    source.mine([emit(&transfer(ALICE, BOB, 1))]);
    next_poll().await;
    source.mine([emit(&transfer(ALICE, BOB, 2))]);
    next_poll().await;

    assert_delivered!(recorder, [transfer(ALICE, BOB, 2)]);
    assert_eq!(recorder.errors().len(), 1);
    assert_eq!(source.calls(Call::CreateFilter), 1);

    Ok(())
}
