//! Error types for the transfer builder
//!
//! One taxonomy covers the whole build pipeline:
//! - Intent validation (recipient, amount, missing fields)
//! - Coin aggregation against the ledger
//! - Operation assembly (no funds, insufficient balance)
//! - Serialization, signing and confirmation
//!
//! Signer failures are carried through untouched so callers can show the
//! ledger-specific detail they contain.

use crate::amount::AmountError;
use crate::ledger::LedgerError;
use num_bigint::BigUint;
use thiserror::Error;

/// Error type for all transfer builder operations
#[derive(Error, Debug)]
pub enum TransferError {
    /// Recipient is empty or not a syntactically valid address
    #[error("Invalid recipient address: {0:?}")]
    InvalidRecipient(String),

    /// Amount is unparseable, negative, over-precise, or the asset's decimal
    /// precision is unknown
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Sender or coin type missing from the intent
    #[error("Transaction parameters are incomplete: {0}")]
    IncompleteParameters(String),

    /// No coin objects of the requested type are owned by the sender
    #[error("No available coins of type {coin_type}")]
    NoFunds { coin_type: String },

    /// Requested amount exceeds the aggregated balance
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: BigUint,
        available: BigUint,
    },

    /// A page fetch failed, or pagination exceeded the configured ceiling
    #[error("Ledger fetch failed at page {page}: {source}")]
    LedgerFetch {
        /// Zero-based index of the page being fetched
        page: usize,
        #[source]
        source: LedgerError,
    },

    /// A non-paginated ledger request failed (gas price, submission,
    /// confirmation polling)
    #[error("Ledger request failed: {0}")]
    Ledger(#[from] LedgerError),

    /// The assembled operation could not be encoded
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// External signer/submitter failure, surfaced verbatim
    #[error(transparent)]
    SignAndSubmit(anyhow::Error),

    /// Submitted but the ledger did not confirm success
    #[error("Confirmation failed for {digest}: {reason}")]
    Confirmation { digest: String, reason: String },

    /// Assembled commands are not in merge → split → transfer shape
    #[error("Invalid command order: {0}")]
    InvalidCommandOrder(String),

    /// Internal invariant violation (conservation)
    ///
    /// These should never surface and indicate a bug in assembly
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type TransferResult<T> = Result<T, TransferError>;

impl TransferError {
    /// Check if re-pressing "send" without changing inputs might succeed
    ///
    /// Nothing is retried internally; this only informs caller policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LedgerFetch { source, .. } => source.is_retryable(),
            Self::Ledger(source) => source.is_retryable(),
            Self::Confirmation { .. } => true,

            Self::InvalidRecipient(_) => false,
            Self::InvalidAmount(_) => false,
            Self::IncompleteParameters(_) => false,
            Self::NoFunds { .. } => false,
            Self::InsufficientBalance { .. } => false,
            Self::Serialization(_) => false,
            Self::SignAndSubmit(_) => false,
            Self::InvalidCommandOrder(_) => false,
            Self::Internal(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRecipient(_) => "recipient",
            Self::InvalidAmount(_) => "amount",
            Self::IncompleteParameters(_) => "incomplete",
            Self::NoFunds { .. } => "no_funds",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::LedgerFetch { .. } => "ledger_fetch",
            Self::Ledger(_) => "ledger",
            Self::Serialization(_) => "serialization",
            Self::SignAndSubmit(_) => "sign_and_submit",
            Self::Confirmation { .. } => "confirmation",
            Self::InvalidCommandOrder(_) => "validation",
            Self::Internal(_) => "internal",
        }
    }
}

// Convenience constructors for common error scenarios
impl TransferError {
    pub fn no_funds(coin_type: impl Into<String>) -> Self {
        Self::NoFunds {
            coin_type: coin_type.into(),
        }
    }

    pub fn unknown_decimals() -> Self {
        Self::InvalidAmount("decimal precision of the asset is unknown".to_string())
    }

    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidCommandOrder(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}

impl From<AmountError> for TransferError {
    fn from(err: AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}
