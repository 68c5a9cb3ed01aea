//! Send-form resolution into a transfer intent
//!
//! Turns the raw fields of a send form (recipient text, amount text or the
//! "max" toggle, selected coin) into a [`TransferIntent`] and decides whether
//! building is currently allowed. Everything here is pure.

use crate::address::is_valid_address;
use crate::amount::{format_units, parse_amount};
use crate::tx_builder::errors::{TransferError, TransferResult};
use crate::types::{Address, CoinType};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Send a specific amount, or everything of the selected coin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SendAmountMode {
    /// Decimal amount in display units, e.g. `"12.5"`
    Amount { amount: String },
    /// Entire aggregated balance, no remainder
    All,
}

impl SendAmountMode {
    pub fn amount(amount: impl Into<String>) -> Self {
        Self::Amount {
            amount: amount.into(),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Raw send-form state as entered by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendForm {
    pub recipient: String,
    pub sender: String,
    pub coin_type: String,
    /// `None` while coin metadata is unavailable
    pub decimals: Option<u8>,
    pub mode: SendAmountMode,
}

/// Transfer request handed to the builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferIntent {
    pub coin_type: CoinType,
    pub decimals: Option<u8>,
    pub sender: Address,
    pub recipient: Address,
    pub mode: SendAmountMode,
}

impl TransferIntent {
    /// Whether building is currently permitted
    ///
    /// True iff the recipient is a non-empty valid address, sender and coin
    /// type are non-empty, decimals are known, and an amount was entered
    /// unless sending everything.
    pub fn can_build(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check the intent and report the first problem found
    ///
    /// The amount itself is only checked for presence here; parsing happens
    /// during assembly against the aggregated balance.
    pub fn validate(&self) -> TransferResult<()> {
        if self.recipient.is_empty() || !is_valid_address(self.recipient.as_str()) {
            return Err(TransferError::InvalidRecipient(
                self.recipient.as_str().to_string(),
            ));
        }
        if self.sender.is_empty() {
            return Err(TransferError::IncompleteParameters(
                "sender address is missing".to_string(),
            ));
        }
        if self.coin_type.is_empty() {
            return Err(TransferError::IncompleteParameters(
                "coin type is missing".to_string(),
            ));
        }
        if self.decimals.is_none() {
            return Err(TransferError::unknown_decimals());
        }
        if let SendAmountMode::Amount { amount } = &self.mode {
            if amount.is_empty() {
                return Err(TransferError::InvalidAmount("amount is empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Intent plus the build gate, as shown to the send form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIntent {
    pub intent: TransferIntent,
    pub can_build: bool,
}

/// Resolve raw form fields into an intent
///
/// Recipient and amount are trimmed; nothing else is rewritten.
pub fn resolve_intent(form: SendForm) -> ResolvedIntent {
    let mode = match form.mode {
        SendAmountMode::Amount { amount } => SendAmountMode::Amount {
            amount: amount.trim().to_string(),
        },
        SendAmountMode::All => SendAmountMode::All,
    };

    let intent = TransferIntent {
        coin_type: CoinType::new(form.coin_type),
        decimals: form.decimals,
        sender: Address::new(form.sender),
        recipient: Address::new(form.recipient.trim()),
        mode,
    };
    let can_build = intent.can_build();

    ResolvedIntent { intent, can_build }
}

/// Clean free-text amount input
///
/// Drops every character other than digits and `.`, then keeps only the
/// first dot: `"1,2.3.4 IOTA"` becomes `"12.34"`.
pub fn sanitize_amount_input(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    match cleaned.split_once('.') {
        Some((head, rest)) => format!("{}.{}", head, rest.replace('.', "")),
        None => cleaned,
    }
}

/// Cap a sanitized amount at the available balance
///
/// Comparison is exact in smallest units. Input that does not parse is
/// returned unchanged so the user can keep typing (`"1."`, `"."`).
pub fn clamp_amount_input(input: &str, balance: &BigUint, decimals: u8) -> String {
    match parse_amount(input, decimals) {
        Ok(value) if value > *balance => format_units(balance, decimals),
        _ => input.to_string(),
    }
}
