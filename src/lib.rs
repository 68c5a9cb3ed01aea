//! coin-send: coin-transfer transaction builder
//!
//! Resolves "send an amount" / "send all" intents into a single unsigned
//! merge → split → transfer operation over the sender's coin objects, and
//! optionally hands it to a signer and waits for confirmation.

pub mod address;
pub mod amount;
pub mod config;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod rpc_client;
pub mod structured_logging;
pub mod test_utils;
pub mod tx_builder;
pub mod types;

// Re-export commonly used types
pub use ledger::{LedgerClient, TransactionSigner};
pub use tx_builder::{TransferBuilder, TransferError, TransferIntent};
