use anyhow::Context;
use clap::{Parser, Subcommand};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ibc_observer::chains::{ChainQuery, CosmosChain, ProtoTxDecoder};
use ibc_observer::config::{ChainConfig, ObserverConfig};
use ibc_observer::metrics::ObserverMetrics;
use ibc_observer::scanner::BlockScanner;
use ibc_observer::transfer::{
    eibc_memo, CliExecutor, IbcTimeout, TransferOptions, TransferSubmitter, TxResult, WalletAmount,
};
use ibc_observer::watch::{FinalizationWatcher, HeightWatcher};

#[derive(Parser)]
#[command(name = "observer")]
#[command(about = "Submit IBC transfers and track packets and rollapp finalization")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/observer.toml")]
    pub config: String,

    /// Log level (defaults to the configured global.log_level)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print Prometheus metrics after the command finishes
    #[arg(long)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the latest block height
    Height {
        #[arg(long)]
        chain: String,
    },
    /// Wait until the chain advances by a number of blocks
    WaitBlocks {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        delta: u64,
    },
    /// Print the transactions and events of a block
    Scan {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        height: u64,
    },
    /// Print packet acknowledgements submitted in a block
    Acks {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        height: u64,
    },
    /// Send an IBC transfer and print the committed packet
    Transfer {
        /// Source chain
        #[arg(long)]
        chain: String,
        #[arg(long)]
        channel: String,
        /// Signing key name
        #[arg(long)]
        from: String,
        #[arg(long)]
        receiver: String,
        #[arg(long)]
        amount: u128,
        /// Defaults to the source chain's native denom
        #[arg(long)]
        denom: Option<String>,
        #[arg(long)]
        fees: String,
        /// Timeout height on the destination (revision 0)
        #[arg(long)]
        timeout_height: Option<u64>,
        /// Timeout timestamp in nanoseconds, wins over --timeout-height
        #[arg(long)]
        timeout_timestamp: Option<u64>,
        #[arg(long, conflicts_with = "eibc_fee")]
        memo: Option<String>,
        /// Attach an eIBC memo offering this fee
        #[arg(long)]
        eibc_fee: Option<u128>,
    },
    /// Fulfil an eIBC demand order on the hub
    FulfillOrder {
        #[arg(long, default_value = "hub")]
        hub: String,
        #[arg(long)]
        order_id: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        fees: String,
    },
    /// Wait until a rollapp height is finalized on the hub
    WaitFinalized {
        #[arg(long, default_value = "hub")]
        hub: String,
        #[arg(long)]
        rollapp_id: String,
        #[arg(long)]
        height: u64,
        /// e.g. "10m"; defaults to watch.finalization_timeout_secs
        #[arg(long)]
        timeout: Option<humantime::Duration>,
    },
    /// Print the latest finalized rollapp height and its hub height
    FinalizedHeight {
        #[arg(long, default_value = "hub")]
        hub: String,
        #[arg(long)]
        rollapp_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ObserverConfig::load(&cli.config)?;

    // Initialize logging
    let log_level = cli.log_level.clone().unwrap_or_else(|| config.global.log_level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ibc_observer={0},observer={0}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Loaded configuration from: {}", cli.config);

    let metrics = Arc::new(ObserverMetrics::new()?);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            trigger.cancel();
        }
    });

    run(&config, cli.command, metrics.clone(), &cancel).await?;

    if cli.metrics {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metrics.registry().gather(), &mut buffer)?;
        print!("{}", String::from_utf8_lossy(&buffer));
    }

    Ok(())
}

async fn run(
    config: &ObserverConfig,
    command: Commands,
    metrics: Arc<ObserverMetrics>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    match command {
        Commands::Height { chain } => {
            let client = connect(config, &chain)?;
            println!("{}", client.latest_height().await?);
        }
        Commands::WaitBlocks { chain, delta } => {
            let watcher =
                HeightWatcher::new(connect(config, &chain)?, config.watch.height_poll_interval())
                    .with_metrics(metrics);
            let cursor = watcher.wait_for_delta(delta, cancel).await?;
            info!("{} advanced from {} to {}", chain, cursor.starting, cursor.current);
        }
        Commands::Scan { chain, height } => {
            let scanner = BlockScanner::new(connect(config, &chain)?, Arc::new(ProtoTxDecoder))
                .with_metrics(metrics);
            for tx in scanner.scan(height).await? {
                let data: serde_json::Value = serde_json::from_slice(&tx.data)
                    .unwrap_or_else(|_| json!(String::from_utf8_lossy(&tx.data)));
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "data": data, "events": tx.events }))?
                );
            }
        }
        Commands::Acks { chain, height } => {
            let scanner = BlockScanner::new(connect(config, &chain)?, Arc::new(ProtoTxDecoder))
                .with_metrics(metrics);
            let acks = scanner.acknowledgements(height).await?;
            info!("Found {} acknowledgements at height {}", acks.len(), height);
            println!("{}", serde_json::to_string_pretty(&acks)?);
        }
        Commands::Transfer {
            chain,
            channel,
            from,
            receiver,
            amount,
            denom,
            fees,
            timeout_height,
            timeout_timestamp,
            memo,
            eibc_fee,
        } => {
            let source = chain_config(config, &chain)?;
            let destination = WalletAmount {
                address: receiver,
                denom: denom.unwrap_or_else(|| source.denom.clone()),
                amount,
            };
            let has_timeout = timeout_height.is_some() || timeout_timestamp.is_some();
            let timeout = has_timeout.then(|| IbcTimeout {
                nano_seconds: timeout_timestamp.unwrap_or_default(),
                height: timeout_height.unwrap_or_default(),
            });
            let options = TransferOptions {
                timeout,
                memo: eibc_fee.map(eibc_memo).or(memo).unwrap_or_default(),
            };

            let submitter = TransferSubmitter::new(Arc::new(CliExecutor));
            let result = submitter
                .send_ibc_transfer(source, &channel, &from, &destination, &fees, &options)
                .await?;
            print_result(&result)?;

            let packet = result.packet()?;
            info!(
                "Packet {} committed on {}/{} -> {}/{}",
                packet.sequence,
                packet.source_port,
                packet.source_channel,
                packet.dest_port,
                packet.dest_channel
            );
            println!("{}", serde_json::to_string_pretty(&packet)?);
        }
        Commands::FulfillOrder { hub, order_id, from, fees } => {
            let submitter = TransferSubmitter::new(Arc::new(CliExecutor));
            let result = submitter
                .fulfill_demand_order(chain_config(config, &hub)?, &order_id, &from, &fees)
                .await?;
            print_result(&result)?;
        }
        Commands::WaitFinalized {
            hub,
            rollapp_id,
            height,
            timeout,
        } => {
            let timeout = timeout
                .map(Into::into)
                .unwrap_or_else(|| config.watch.finalization_timeout());
            let watcher = finalization_watcher(config, &hub, metrics)?;
            watcher
                .wait_for_finalized_height(&rollapp_id, height, timeout, cancel)
                .await?;
            println!("{} height {} finalized", rollapp_id, height);
        }
        Commands::FinalizedHeight { hub, rollapp_id } => {
            let watcher = finalization_watcher(config, &hub, metrics)?;
            let rollapp_height = watcher.finalized_state_height(&rollapp_id).await?;
            let hub_height = watcher.finalized_hub_height(&rollapp_id).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "rollapp_id": rollapp_id,
                    "finalized_height": rollapp_height,
                    "hub_height": hub_height,
                }))?
            );
        }
    }

    Ok(())
}

fn chain_config<'a>(config: &'a ObserverConfig, name: &str) -> anyhow::Result<&'a ChainConfig> {
    config
        .get_chain(name)
        .with_context(|| format!("Chain '{}' is not configured", name))
}

fn connect(config: &ObserverConfig, name: &str) -> anyhow::Result<Arc<dyn ChainQuery>> {
    let client = CosmosChain::new(chain_config(config, name)?)?;
    Ok(Arc::new(client))
}

fn finalization_watcher(
    config: &ObserverConfig,
    hub: &str,
    metrics: Arc<ObserverMetrics>,
) -> anyhow::Result<FinalizationWatcher> {
    let poll_interval = config.watch.finalization_poll_interval();
    Ok(FinalizationWatcher::new(connect(config, hub)?, poll_interval).with_metrics(metrics))
}

fn print_result(result: &TxResult) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "height": result.height,
            "tx_hash": result.tx_hash,
            "gas_wanted": result.gas_wanted,
        }))?
    );
    Ok(())
}
