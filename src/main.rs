//! coin-send command line tool
//!
//! Plans coin transfers against a JSON-RPC node or an offline coin snapshot
//! and prints the unsigned operation as JSON. Signing and submission belong
//! to the wallet; `confirm` waits for the digest it reports.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use coin_send::amount::{format_balance, format_smallest_unit};
use coin_send::config::Config;
use coin_send::ledger::TransactionDigest;
use coin_send::metrics;
use coin_send::rpc_client::JsonRpcLedgerClient;
use coin_send::tx_builder::{
    assemble_transfer, fetch_all_coins, resolve_intent, CoinSource, SendAmountMode, SendForm,
    TransferBuilder,
};
use coin_send::types::{total_balance, Address, CoinObject, CoinType};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "coin-send.toml")]
    config: String,

    /// Override the JSON-RPC endpoint
    #[arg(long, env = "COIN_SEND_RPC_URL")]
    rpc_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an unsigned transfer and print it as JSON
    Build {
        /// Sending address
        #[arg(long)]
        sender: String,

        /// Receiving address
        #[arg(long)]
        recipient: String,

        /// Coin type to send (defaults to the native coin)
        #[arg(long)]
        coin_type: Option<String>,

        /// Decimal precision, when the coin type is not in the config registry
        #[arg(long)]
        decimals: Option<u8>,

        /// Amount in display units, e.g. 1.5
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        amount: Option<String>,

        /// Send the entire balance
        #[arg(long)]
        all: bool,

        /// JSON file with the sender's coins, used instead of paging the ledger
        #[arg(long)]
        coins: Option<PathBuf>,

        /// Plan against the snapshot only; no network access, no gas price
        #[arg(long, requires = "coins")]
        offline: bool,
    },

    /// Print the aggregated balance of one coin type
    Balance {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        coin_type: Option<String>,
    },

    /// Wait for a transaction submitted by a wallet to reach a terminal status
    Confirm {
        /// Transaction digest reported by the wallet
        #[arg(long)]
        digest: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(url) = &args.rpc_url {
        config.network.rpc_url = url.clone();
    }
    config.validate()?;

    init_logging(args.verbose, config.monitoring.json_logs)?;
    info!("🚀 coin-send {}", env!("CARGO_PKG_VERSION"));
    info!("🌐 Network: {} ({})", config.chain_id(), config.network.rpc_url);

    match args.command {
        Command::Build {
            sender,
            recipient,
            coin_type,
            decimals,
            amount,
            all,
            coins,
            offline,
        } => {
            let coin_type = coin_type.unwrap_or_else(|| config.assets.native_coin_type.clone());
            let decimals = decimals.or_else(|| config.decimals_for(&coin_type));
            let mode = match amount {
                Some(amount) if !all => SendAmountMode::amount(amount),
                _ => SendAmountMode::All,
            };

            if let SendAmountMode::Amount { amount } = &mode {
                match format_smallest_unit(amount, decimals) {
                    Some(preview) => info!("💱 In smallest unit: {}", preview),
                    None => warn!("Amount '{}' cannot be previewed in smallest units", amount),
                }
            }

            let resolved = resolve_intent(SendForm {
                recipient,
                sender,
                coin_type,
                decimals,
                mode,
            });
            if !resolved.can_build {
                resolved.intent.validate()?;
            }
            let intent = resolved.intent;

            let source = match &coins {
                Some(path) => CoinSource::Snapshot(read_snapshot(path)?),
                None => CoinSource::Ledger,
            };

            if offline {
                let CoinSource::Snapshot(snapshot) = source else {
                    bail!("--offline requires --coins");
                };
                let plan = assemble_transfer(
                    &intent,
                    &snapshot,
                    &CoinType::new(config.assets.native_coin_type.clone()),
                )?;
                info!(
                    "📝 Planned {} of {} ({} merged)",
                    plan.summary.amount, plan.summary.total, plan.summary.merged
                );
                println!("{}", serde_json::to_string_pretty(&plan.operation)?);
            } else {
                let builder =
                    TransferBuilder::new(Arc::new(ledger_client(&config)?), config.builder_config());
                let output = builder.build(&intent, source).await?;
                info!("✅ Built transfer {}", output.digest);
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }

        Command::Balance { owner, coin_type } => {
            let coin_type = CoinType::new(
                coin_type.unwrap_or_else(|| config.assets.native_coin_type.clone()),
            );
            let ledger = ledger_client(&config)?;
            let collected = fetch_all_coins(
                &ledger,
                &Address::new(owner),
                &coin_type,
                config.builder_config().limits,
            )
            .await?;

            let total = total_balance(&collected.coins);
            let label = config.symbol_for(coin_type.as_str()).unwrap_or(coin_type.as_str());
            match config.decimals_for(coin_type.as_str()) {
                Some(decimals) => println!("{} {}", format_balance(&total, decimals), label),
                None => println!("{} (smallest units) {}", total, label),
            }
            info!(
                "💰 {} coin objects across {} pages",
                collected.coins.len(),
                collected.pages
            );
        }

        Command::Confirm { digest } => {
            let digest = TransactionDigest::new(digest);
            let builder =
                TransferBuilder::new(Arc::new(ledger_client(&config)?), config.builder_config());
            info!("⏳ Waiting for {}", digest);

            let status = builder.confirm(&digest).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            if !status.is_success() {
                bail!("transaction {} failed on ledger", digest);
            }
        }
    }

    if config.monitoring.enable_metrics {
        if let Some(m) = metrics::metrics() {
            eprintln!("{}", m.export_text()?);
        }
    }

    Ok(())
}

/// Initialize logging subsystem
///
/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "coin_send=debug,info"
    } else {
        "coin_send=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::from_file_with_env(path).with_context(|| format!("Failed to load config from {}", path))
    } else {
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

fn ledger_client(config: &Config) -> Result<JsonRpcLedgerClient> {
    Ok(
        JsonRpcLedgerClient::new(config.network.rpc_url.clone(), config.request_timeout())?
            .with_confirmation(
                config.confirmation_poll_interval(),
                config.confirmation_timeout(),
            ),
    )
}

/// Read a coin snapshot: either a bare array of coins or a `getCoins` page
fn read_snapshot(path: &Path) -> Result<Vec<CoinObject>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let coins: Vec<CoinObject> = match value.get("data") {
        Some(data) => serde_json::from_value(data.clone()),
        None => serde_json::from_value(value),
    }
    .with_context(|| format!("Invalid coin snapshot in {}", path.display()))?;
    Ok(coins)
}
