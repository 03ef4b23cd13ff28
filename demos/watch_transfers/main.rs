use std::time::Duration;

use alloy::{primitives::address, providers::ProviderBuilder, sol, sol_types::SolEvent};
use event_watcher::{
    DecodedLog, EventWatcher, MatchCriteria, WatchConfig, robust_provider::RobustProviderBuilder,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();

    let rpc_url =
        std::env::var("RPC_URL").unwrap_or_else(|_| "https://ethereum-rpc.publicnode.com".into());
    let provider = ProviderBuilder::new().connect(&rpc_url).await?;

    let robust_provider = RobustProviderBuilder::new(provider)
        .call_timeout(Duration::from_secs(30))
        .max_retries(5)
        .min_delay(Duration::from_millis(500))
        .build()
        .await?;

    let watcher = EventWatcher::new(robust_provider);

    // USDC on mainnet
    let criteria = MatchCriteria::builder()
        .address(address!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"))
        .event_signature("Transfer(address indexed from, address indexed to, uint256 value)");

    let config = WatchConfig::new(|logs: Vec<DecodedLog>| {
        for log in logs {
            match Transfer::decode_log_data(log.log.data()) {
                Ok(Transfer { from, to, value }) => info!(
                    "Transfer of {value} from {from} to {to} in block {:?}",
                    log.log.block_number
                ),
                Err(e) => error!("Undecodable transfer: {e}"),
            }
        }
    })
    .polling_interval(Duration::from_secs(4))
    .reacquire_filter_after(Duration::from_secs(60))
    .on_error(|e| error!("Watch error: {e}"));

    let handle = watcher.watch(criteria, config)?;
    info!("Watching USDC transfers on {rpc_url}, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    handle.cancel();
    handle.stopped().await;

    Ok(())
}
