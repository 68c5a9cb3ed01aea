//! Offline execution of a transfer operation against a coin snapshot
//!
//! Replays the commands of an [`Operation`] over the sender's coins with
//! exact integer arithmetic and reports where the value ended up. Gas fees
//! are not modelled: the gas coin is treated as the plain sum of its payment
//! coins.
//!
//! The builder uses this to prove conservation before handing an operation
//! to the signer; tests use it to check the no-dust guarantee.

use crate::tx_builder::errors::{TransferError, TransferResult};
use crate::tx_builder::operation::{Argument, CallArg, Command, Operation};
use crate::types::CoinObject;
use num_bigint::BigUint;
use num_traits::Zero;
use std::collections::{HashMap, HashSet};

/// Outcome of replaying an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    /// Value moved to the recipient
    pub sent: BigUint,
    /// Value still owned by the sender, including coins the operation never
    /// touched
    pub retained: BigUint,
    /// Coin objects created by `SplitCoins`
    pub created_objects: usize,
    /// Coin objects left with the sender holding a zero balance
    pub zero_value_objects: usize,
}

/// Replay `op` over `coins`
///
/// # Errors
///
/// Returns `TransferError::Internal` when the operation references coins
/// missing from the snapshot, uses a coin after it was merged away or
/// transferred, or splits more than a coin holds.
pub fn simulate_transfer(op: &Operation, coins: &[CoinObject]) -> TransferResult<SimulationReport> {
    let by_id: HashMap<_, _> = coins.iter().map(|c| (&c.coin_object_id, c)).collect();
    let mut referenced = HashSet::new();

    // Live coin balances keyed by the argument that names them
    let mut live: HashMap<Argument, BigUint> = HashMap::new();

    if !op.gas_payment.is_empty() {
        let mut gas = BigUint::zero();
        for id in &op.gas_payment {
            let coin = by_id
                .get(id)
                .ok_or_else(|| TransferError::internal(format!("gas payment {} not owned", id)))?;
            if !referenced.insert(id) {
                return Err(TransferError::internal(format!("coin {} used twice", id)));
            }
            gas += &coin.balance;
        }
        live.insert(Argument::GasCoin, gas);
    }

    for (idx, input) in op.inputs.iter().enumerate() {
        if let CallArg::Object(id) = input {
            let coin = by_id
                .get(id)
                .ok_or_else(|| TransferError::internal(format!("input coin {} not owned", id)))?;
            if !referenced.insert(id) {
                return Err(TransferError::internal(format!("coin {} used twice", id)));
            }
            live.insert(Argument::Input(idx as u16), coin.balance.clone());
        }
    }

    let mut sent = BigUint::zero();
    let mut created_objects = 0usize;

    for (cmd_idx, command) in op.commands.iter().enumerate() {
        match command {
            Command::MergeCoins {
                destination,
                sources,
            } => {
                let mut folded = BigUint::zero();
                for source in sources {
                    folded += take_coin(&mut live, source)?;
                }
                let dest = live.get_mut(destination).ok_or_else(|| {
                    TransferError::internal(format!("merge destination {:?} not live", destination))
                })?;
                *dest += folded;
            }
            Command::SplitCoins { coin, amounts } => {
                for (j, amount_arg) in amounts.iter().enumerate() {
                    let amount = match op.input(*amount_arg) {
                        Some(CallArg::Amount(value)) => value.clone(),
                        _ => {
                            return Err(TransferError::internal(
                                "split amount is not an amount input",
                            ))
                        }
                    };
                    let balance = live.get_mut(coin).ok_or_else(|| {
                        TransferError::internal(format!("split coin {:?} not live", coin))
                    })?;
                    if *balance < amount {
                        return Err(TransferError::internal(format!(
                            "split of {} exceeds coin balance {}",
                            amount, balance
                        )));
                    }
                    *balance -= &amount;
                    live.insert(Argument::NestedResult(cmd_idx as u16, j as u16), amount);
                    created_objects += 1;
                }
            }
            Command::TransferObjects { objects, recipient } => {
                if !matches!(op.input(*recipient), Some(CallArg::Recipient(_))) {
                    return Err(TransferError::internal("transfer recipient is not an address"));
                }
                for object in objects {
                    sent += take_coin(&mut live, object)?;
                }
            }
        }
    }

    let untouched = coins
        .iter()
        .filter(|c| !referenced.contains(&c.coin_object_id))
        .fold(BigUint::zero(), |acc, c| acc + &c.balance);
    let retained = live.values().fold(untouched, |acc, v| acc + v);
    let zero_value_objects = live.values().filter(|v| v.is_zero()).count();

    Ok(SimulationReport {
        sent,
        retained,
        created_objects,
        zero_value_objects,
    })
}

fn take_coin(live: &mut HashMap<Argument, BigUint>, arg: &Argument) -> TransferResult<BigUint> {
    live.remove(arg)
        .ok_or_else(|| TransferError::internal(format!("coin {:?} is not live", arg)))
}
