use alloy::{
    primitives::{Bytes, LogData},
    rpc::types::Log,
    sol_types::SolEvent,
};
use event_watcher::{
    DecodedLog, MatchCriteria, RawLogDecoder, WatchError, assert_delivered,
    test_utils::{Call, Recorder},
};

use crate::common::{
    ALICE, BOB, TOKEN, TRANSFER_SIGNATURE, Transfer, config, emit, next_poll, setup, started,
    transfer,
};

fn transfers_at_token() -> MatchCriteria {
    MatchCriteria::builder()
        .address(TOKEN)
        .event_signature(TRANSFER_SIGNATURE)
        .build()
        .expect("valid criteria")
}

/// A `Transfer` log whose data is too short to decode.
fn truncated_transfer() -> (alloy::primitives::Address, LogData) {
    let topics = transfer(ALICE, BOB, 1).encode_log_data().topics().to_vec();
    (TOKEN, LogData::new_unchecked(topics, Bytes::from_static(&[0xde, 0xad])))
}

#[tokio::test(start_paused = true)]
async fn batched_delivery_is_ordered_by_block_and_index() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    source.reverse_responses(true);
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 1)), emit(&transfer(ALICE, BOB, 2))]);
    source.mine([emit(&transfer(ALICE, BOB, 3))]);
    next_poll().await;

    assert_eq!(recorder.batches().len(), 1);
    assert_delivered!(
        recorder,
        [transfer(ALICE, BOB, 1), transfer(ALICE, BOB, 2), transfer(ALICE, BOB, 3)]
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unbatched_delivery_calls_handler_per_log() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    source.reverse_responses(true);
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder).batch(false))?;
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 1)), emit(&transfer(ALICE, BOB, 2))]);
    source.mine([emit(&transfer(ALICE, BOB, 3))]);
    next_poll().await;

    let batches = recorder.batches();
    assert_eq!(batches.len(), 3);
    assert!(batches.iter().all(|batch| batch.len() == 1));
    assert_delivered!(
        recorder,
        [transfer(ALICE, BOB, 1), transfer(ALICE, BOB, 2), transfer(ALICE, BOB, 3)]
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn range_mode_orders_across_blocks() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    source.reverse_responses(true);
    source.fail_always(Call::CreateFilter, WatchError::Timeout);
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 1))]);
    source.mine([emit(&transfer(ALICE, BOB, 2)), emit(&transfer(ALICE, BOB, 3))]);
    next_poll().await;

    assert_delivered!(
        recorder,
        [transfer(ALICE, BOB, 1), transfer(ALICE, BOB, 2), transfer(ALICE, BOB, 3)]
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn from_block_delivers_history_first() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    source.mine([emit(&transfer(ALICE, BOB, 1))]);
    source.mine([emit(&transfer(ALICE, BOB, 2))]);
    source.mine([emit(&transfer(ALICE, BOB, 3))]);
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder).from_block(2))?;
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 4))]);
    next_poll().await;
    next_poll().await;

    assert_delivered!(
        recorder,
        [transfer(ALICE, BOB, 2), transfer(ALICE, BOB, 3), transfer(ALICE, BOB, 4)]
    );
    assert_eq!(recorder.batches().len(), 2);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn lenient_decoding_keeps_undecodable_logs() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder))?;
    started().await;

    source.mine([truncated_transfer(), emit(&transfer(ALICE, BOB, 2))]);
    next_poll().await;

    let items = recorder.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].event_name.as_deref(), Some("Transfer"));
    assert!(items[0].args.is_none());
    assert!(items[1].args.is_some());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn strict_decoding_drops_undecodable_logs() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    let recorder = Recorder::<DecodedLog>::new();
    let _handle = watcher.watch(transfers_at_token(), config(&recorder).strict(true))?;
    started().await;

    source.mine([truncated_transfer(), emit(&transfer(ALICE, BOB, 2))]);
    next_poll().await;

    assert_delivered!(recorder, [transfer(ALICE, BOB, 2)]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn raw_decoder_delivers_node_logs() -> anyhow::Result<()> {
    let (source, watcher) = setup();
    let recorder = Recorder::<Log>::new();
    let _handle =
        watcher.watch_with_decoder(transfers_at_token(), RawLogDecoder, config(&recorder))?;
    started().await;

    source.mine([emit(&transfer(ALICE, BOB, 7))]);
    next_poll().await;

    let items = recorder.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].address(), TOKEN);
    assert_eq!(items[0].block_number, Some(1));
    assert_eq!(Transfer::decode_log_data(items[0].data())?, transfer(ALICE, BOB, 7));

    Ok(())
}
