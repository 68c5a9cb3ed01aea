//! Coin-transfer transaction builder
//!
//! Turns a user's intent ("send N units of coin type T to address R", or
//! "send everything") into a single unsigned operation that merges the
//! sender's coin objects, splits off the requested amount and transfers it.
//!
//! ## Architecture
//!
//! - **errors**: Error taxonomy with retryability and metric categories
//! - **intent**: Send-form resolution and the build gate
//! - **aggregate**: Sequential, cursor-driven coin collection
//! - **operation**: Operation model, encoding and command-shape validation
//! - **plan**: Merge/split/transfer assembly
//! - **simulate**: Offline replay used for the conservation check
//! - **output**: Serialized build output and send receipt
//! - **builder**: Pipeline orchestration, signing and confirmation
//!
//! ## Guarantees
//!
//! - Amounts are exact integers in the asset's smallest unit; decimal input
//!   is never routed through floating point
//! - Sending the whole balance transfers the merged coin itself, leaving no
//!   zero-value coin behind
//! - Sent plus retained always equals the aggregated balance
//! - No command is assembled for an intent that fails validation or exceeds
//!   the balance
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use coin_send::rpc_client::JsonRpcLedgerClient;
//! use coin_send::tx_builder::{
//!     BuilderConfig, CoinSource, SendAmountMode, TransferBuilder, TransferError, TransferIntent,
//! };
//! use coin_send::types::{Address, CoinType};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), TransferError> {
//! let ledger = JsonRpcLedgerClient::new("https://api.testnet.iota.cafe", Duration::from_secs(10))?;
//! let builder = TransferBuilder::new(Arc::new(ledger), BuilderConfig::default());
//!
//! let intent = TransferIntent {
//!     coin_type: CoinType::native(),
//!     decimals: Some(9),
//!     sender: Address::new("0x796966bf3c64958eda9d69f92d4ab3a23fad2b7a8562933cbd8a092ff2886b77"),
//!     recipient: Address::new("0xfdb0c3a3cb644df65a4d549be8e870f88e7f2a145c78982d573ee98b8b077487"),
//!     mode: SendAmountMode::amount("1.25"),
//! };
//!
//! let output = builder.build(&intent, CoinSource::Ledger).await?;
//! println!("{}", output.tx_bytes_base64());
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::{TransferError, TransferResult};

pub mod aggregate;
mod builder;
pub mod intent;
pub mod operation;
mod output;
pub mod plan;
pub mod simulate;

pub use aggregate::{collect_coins, fetch_all_coins, CoinSource, CollectedCoins, PageLimits};
pub use builder::{BuilderConfig, TransferBuilder};
pub use intent::{
    clamp_amount_input, resolve_intent, sanitize_amount_input, ResolvedIntent, SendAmountMode,
    SendForm, TransferIntent,
};
pub use operation::{sanity_check_command_order, Argument, CallArg, Command, Operation};
pub use output::{SendReceipt, TransferBuildOutput};
pub use plan::{assemble_transfer, TransferPlan, TransferSummary};
pub use simulate::{simulate_transfer, SimulationReport};
