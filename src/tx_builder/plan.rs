//! Transfer operation assembly
//!
//! Turns a validated intent and the sender's coins of the requested type into
//! an [`Operation`]:
//! 1. `MergeCoins` folding every other coin into the primary coin (when there
//!    is more than one coin)
//! 2. `SplitCoins` carving the requested amount off the primary coin (unless
//!    the whole balance is being sent)
//! 3. `TransferObjects` moving the split result, or the primary coin itself,
//!    to the recipient
//!
//! For the native coin the primary coin is the transaction's gas coin, backed
//! by the first coin object, so the transfer and the fee draw on the same
//! merged balance.

use crate::address::normalize_address;
use crate::amount::parse_amount;
use crate::tx_builder::errors::{TransferError, TransferResult};
use crate::tx_builder::intent::{SendAmountMode, TransferIntent};
use crate::tx_builder::operation::{Argument, CallArg, Command, Operation};
use crate::types::{biguint_string, total_balance, CoinObject, CoinType};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Coin every other coin is merged into
///
/// Resolved once per assembly; the rest of the planner only deals with the
/// resulting [`Argument`].
#[derive(Debug, Clone, Copy)]
enum PrimaryCoin<'a> {
    /// First coin object, registered as an ordinary input
    Selected(&'a CoinObject),
    /// The gas coin, backed by the first coin object
    GasHandle { backing: &'a CoinObject },
}

impl<'a> PrimaryCoin<'a> {
    fn resolve(first: &'a CoinObject, native: bool) -> Self {
        if native {
            Self::GasHandle { backing: first }
        } else {
            Self::Selected(first)
        }
    }

    fn bind(self, op: &mut Operation) -> TransferResult<Argument> {
        match self {
            Self::Selected(coin) => op.add_input(CallArg::Object(coin.coin_object_id.clone())),
            Self::GasHandle { backing } => {
                op.gas_payment = vec![backing.coin_object_id.clone()];
                Ok(Argument::GasCoin)
            }
        }
    }
}

/// What an assembled transfer will do, for display and logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub coin_type: CoinType,
    /// Aggregated balance of the coins used
    #[serde(with = "biguint_string")]
    pub total: BigUint,
    /// Amount moved to the recipient
    #[serde(with = "biguint_string")]
    pub amount: BigUint,
    /// Balance left with the sender in the primary coin
    #[serde(with = "biguint_string")]
    pub remainder: BigUint,
    /// The primary coin itself is transferred, no split
    pub whole_object: bool,
    pub coins_used: usize,
    pub merged: usize,
    pub native: bool,
}

/// Assembled operation plus its summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub operation: Operation,
    pub summary: TransferSummary,
}

/// Requested amount in smallest units
///
/// `All` resolves to the aggregated total. Otherwise the decimal string is
/// parsed with the intent's precision; excess fractional digits are an
/// error, never rounded.
pub fn requested_amount(intent: &TransferIntent, total: &BigUint) -> TransferResult<BigUint> {
    match &intent.mode {
        SendAmountMode::All => Ok(total.clone()),
        SendAmountMode::Amount { amount } => {
            let decimals = intent.decimals.ok_or_else(TransferError::unknown_decimals)?;
            Ok(parse_amount(amount, decimals)?)
        }
    }
}

/// Build the merge/split/transfer operation for `intent`
///
/// `coins` may contain other coin types; only those matching
/// `intent.coin_type` are used, in the order given. A repeated object id is
/// counted once, at its first occurrence. The first coin becomes the primary
/// coin.
///
/// # Errors
///
/// - `NoFunds` if no coin of the requested type is present
/// - `InvalidAmount` if the amount does not parse at the asset's precision
/// - `InsufficientBalance` if the amount exceeds the aggregated total
/// - `InvalidRecipient` if the recipient is not a valid address
///
/// Nothing is assembled unless every check passes.
pub fn assemble_transfer(
    intent: &TransferIntent,
    coins: &[CoinObject],
    native_coin_type: &CoinType,
) -> TransferResult<TransferPlan> {
    let mut seen = HashSet::new();
    let selected: Vec<&CoinObject> = coins
        .iter()
        .filter(|c| c.coin_type == intent.coin_type)
        .filter(|c| seen.insert(&c.coin_object_id))
        .collect();

    let Some((&first, rest)) = selected.split_first() else {
        return Err(TransferError::no_funds(intent.coin_type.as_str()));
    };

    let total = total_balance(selected.iter().copied());
    let amount = requested_amount(intent, &total)?;
    if amount > total {
        return Err(TransferError::InsufficientBalance {
            requested: amount,
            available: total,
        });
    }

    let recipient = normalize_address(intent.recipient.as_str())
        .ok_or_else(|| TransferError::InvalidRecipient(intent.recipient.as_str().to_string()))?;

    let native = intent.coin_type == *native_coin_type;
    let whole_object = amount == total;

    let mut op = Operation::new(intent.sender.clone());
    let primary = PrimaryCoin::resolve(first, native).bind(&mut op)?;

    if !rest.is_empty() {
        let mut sources = Vec::with_capacity(rest.len());
        for coin in rest {
            sources.push(op.add_input(CallArg::Object(coin.coin_object_id.clone()))?);
        }
        op.add_command(Command::MergeCoins {
            destination: primary,
            sources,
        })?;
    }

    let moved = if whole_object {
        primary
    } else {
        let amount_arg = op.add_input(CallArg::Amount(amount.clone()))?;
        let split = op.add_command(Command::SplitCoins {
            coin: primary,
            amounts: vec![amount_arg],
        })?;
        Argument::NestedResult(split, 0)
    };

    let to = op.add_input(CallArg::Recipient(recipient))?;
    op.add_command(Command::TransferObjects {
        objects: vec![moved],
        recipient: to,
    })?;

    let summary = TransferSummary {
        coin_type: intent.coin_type.clone(),
        remainder: &total - &amount,
        total,
        amount,
        whole_object,
        coins_used: selected.len(),
        merged: rest.len(),
        native,
    };

    Ok(TransferPlan {
        operation: op,
        summary,
    })
}
