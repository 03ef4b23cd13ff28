use alloy::{dyn_abi::DynSolValue, primitives::U256, sol_types::SolEvent};
use event_watcher::{
    DecodedLog, MatchCriteria, assert_delivered, assert_nothing_delivered,
    test_utils::{Call, Recorder},
};

use crate::common::{
    ALICE, BOB, OTHER_TOKEN, TOKEN, TRANSFER_SIGNATURE, approval, config, emit, next_poll, setup,
    started, transfer,
};

fn transfers_at_token() -> MatchCriteria {
    MatchCriteria::builder()
        .address(TOKEN)
        .event_signature(TRANSFER_SIGNATURE)
        .build()
        .expect("valid criteria")
}

#[tokio::test(start_paused = true)]
async fn transfers_are_delivered_and_approvals_ignored() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    source.mine([
        emit(&transfer(ALICE, BOB, 1)),
        emit(&approval(ALICE, BOB, 5)),
        emit(&transfer(BOB, ALICE, 2)),
    ]);
    next_poll().await;

    let batches = recorder.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    let first = &batches[0][0];
    assert_eq!(first.event_name.as_deref(), Some("Transfer"));
    let args = first.args.as_ref().expect("decoded arguments");
    assert_eq!(args.get("from"), Some(&DynSolValue::Address(ALICE)));
    assert_eq!(args.get("value"), Some(&DynSolValue::Uint(U256::from(1), 256)));

    source.mine([emit(&approval(BOB, ALICE, 9))]);
    next_poll().await;

    assert_eq!(recorder.batches().len(), 1);
    assert_delivered!(recorder, [transfer(ALICE, BOB, 1), transfer(BOB, ALICE, 2)]);
    assert!(recorder.errors().is_empty());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn each_log_is_delivered_once() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 1))]);
    next_poll().await;
    next_poll().await;
    source.mine([emit(&transfer(ALICE, BOB, 2))]);
    next_poll().await;
    next_poll().await;

    assert_delivered!(recorder, [transfer(ALICE, BOB, 1), transfer(ALICE, BOB, 2)]);
    assert_eq!(recorder.batches().len(), 2);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn logs_mined_before_start_are_not_delivered() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    source.mine([emit(&transfer(ALICE, BOB, 1))]);
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    next_poll().await;

    assert_nothing_delivered!(recorder);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn other_addresses_are_ignored() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    source.mine([(OTHER_TOKEN, transfer(ALICE, BOB, 1).encode_log_data())]);
    source.mine([emit(&transfer(ALICE, BOB, 2))]);
    next_poll().await;

    assert_delivered!(recorder, [transfer(ALICE, BOB, 2)]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn empty_polls_deliver_nothing() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    source.mine_empty(3);
    next_poll().await;
    next_poll().await;

    assert_nothing_delivered!(recorder);
    assert_eq!(source.calls(Call::PollFilterChanges), 2);
    assert_eq!(source.calls(Call::QueryLogs), 0);

    Ok(())
}
