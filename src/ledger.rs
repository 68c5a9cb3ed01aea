//! Ledger client and signer abstractions
//!
//! The builder never talks to the network directly. It consumes these two
//! traits:
//! - [`LedgerClient`]: paginated coin listing, reference gas price,
//!   submission of signed bytes and confirmation polling
//! - [`TransactionSigner`]: the wallet side that signs and executes an
//!   unsigned operation
//!
//! [`crate::rpc_client::JsonRpcLedgerClient`] implements the ledger side over
//! JSON-RPC; test doubles live in `test_utils`.

use crate::tx_builder::TransferBuildOutput;
use crate::types::{Address, CoinPage, CoinType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors reported by a ledger client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Network-level failure (connection, timeout, TLS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Pagination did not terminate within the configured ceiling
    #[error("Pagination exceeded {max_pages} pages without exhausting the cursor")]
    PageLimitExceeded { max_pages: usize },

    /// Confirmation did not reach a terminal state in time
    #[error("Timed out after {waited_ms}ms waiting for {digest}")]
    ConfirmationTimeout { digest: String, waited_ms: u64 },
}

impl LedgerError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::ConfirmationTimeout { .. } => true,
            // Retry on server-side JSON-RPC errors
            Self::Rpc { code, .. } => (-32099..=-32000).contains(code) || *code == -32603,
            Self::Decode(_) => false,
            Self::PageLimitExceeded { .. } => false,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Base58 transaction digest assigned by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionDigest(String);

impl TransactionDigest {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terminal execution status of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failure { error: String },
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Result handed back by the signer after signing and executing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub digest: TransactionDigest,
}

/// Read/submit access to the ledger
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fetch one page of coins of `coin_type` owned by `owner`
    ///
    /// `cursor` is the `next_cursor` of the previous page, `None` for the
    /// first page. A page with `next_cursor == None` is the last one.
    async fn list_owned_coins(
        &self,
        owner: &Address,
        coin_type: &CoinType,
        cursor: Option<&str>,
        limit: usize,
    ) -> LedgerResult<CoinPage>;

    /// Current reference gas price, recorded on the serialized operation
    async fn reference_gas_price(&self) -> LedgerResult<u64>;

    /// Submit a signed transaction
    ///
    /// `tx_bytes` must already be in the ledger's native encoding, as
    /// produced by a signer from an [`crate::tx_builder::Operation`].
    async fn submit(&self, tx_bytes: &[u8], signatures: &[String])
        -> LedgerResult<TransactionDigest>;

    /// Wait until the transaction reaches a terminal status
    async fn await_confirmation(&self, digest: &TransactionDigest) -> LedgerResult<ExecutionStatus>;
}

/// Wallet-side signer that signs and executes an unsigned operation
///
/// Errors are opaque to this crate and are surfaced to callers unchanged.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Sign and execute `output` on the chain identified by `chain`
    /// (e.g. `iota:testnet`)
    async fn sign_and_execute(
        &self,
        output: &TransferBuildOutput,
        chain: &str,
    ) -> anyhow::Result<ExecutionResult>;
}
