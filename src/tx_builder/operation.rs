//! Unsigned transfer operation and command-shape validation
//!
//! An [`Operation`] is a small programmable transaction: a list of inputs
//! (coin objects, the split amount, the recipient) and an ordered list of
//! commands that reference those inputs and each other's results.
//!
//! Transfers always have the shape
//! 1. `MergeCoins` (only when the balance spans several coin objects)
//! 2. `SplitCoins` (only when sending less than the full balance)
//! 3. `TransferObjects` (always, always last)

use crate::tx_builder::errors::{TransferError, TransferResult};
use crate::types::{biguint_string, Address, ObjectId};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Reference to a value usable as a command argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Argument {
    /// The gas coin of the transaction, backed by `Operation::gas_payment`
    GasCoin,
    /// Index into `Operation::inputs`
    Input(u16),
    /// Whole result of a command
    Result(u16),
    /// `j`-th value returned by command `i`
    NestedResult(u16, u16),
}

/// Input value of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallArg {
    /// Owned coin object
    Object(ObjectId),
    /// Amount in smallest units
    Amount(#[serde(with = "biguint_string")] BigUint),
    /// Transfer destination
    Recipient(Address),
}

/// A single command of the operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    /// Fold every source coin into `destination`
    MergeCoins {
        destination: Argument,
        sources: Vec<Argument>,
    },
    /// Carve each amount out of `coin` into a new coin object
    SplitCoins {
        coin: Argument,
        amounts: Vec<Argument>,
    },
    /// Move objects to `recipient`
    TransferObjects {
        objects: Vec<Argument>,
        recipient: Argument,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MergeCoins { .. } => "MergeCoins",
            Self::SplitCoins { .. } => "SplitCoins",
            Self::TransferObjects { .. } => "TransferObjects",
        }
    }
}

/// Assembled, not-yet-signed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub sender: Address,
    pub inputs: Vec<CallArg>,
    pub commands: Vec<Command>,
    /// Coins backing `Argument::GasCoin`; empty lets the signer pick gas
    #[serde(default)]
    pub gas_payment: Vec<ObjectId>,
    /// Reference gas price, recorded when the operation is serialized
    #[serde(default)]
    pub gas_price: Option<u64>,
}

impl Operation {
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            inputs: Vec::new(),
            commands: Vec::new(),
            gas_payment: Vec::new(),
            gas_price: None,
        }
    }

    /// Register an input and return the argument referring to it
    ///
    /// # Errors
    ///
    /// Fails once the input table outgrows the 16-bit argument index.
    pub fn add_input(&mut self, arg: CallArg) -> TransferResult<Argument> {
        let index = u16::try_from(self.inputs.len())
            .map_err(|_| TransferError::internal("too many inputs for a single operation"))?;
        self.inputs.push(arg);
        Ok(Argument::Input(index))
    }

    /// Append a command and return its index
    pub fn add_command(&mut self, command: Command) -> TransferResult<u16> {
        let index = u16::try_from(self.commands.len())
            .map_err(|_| TransferError::internal("too many commands for a single operation"))?;
        self.commands.push(command);
        Ok(index)
    }

    /// Resolve an `Input` argument to its call arg
    pub fn input(&self, arg: Argument) -> Option<&CallArg> {
        match arg {
            Argument::Input(i) => self.inputs.get(i as usize),
            _ => None,
        }
    }

    /// Whether any command splits a coin
    pub fn has_split(&self) -> bool {
        self.commands
            .iter()
            .any(|c| matches!(c, Command::SplitCoins { .. }))
    }

    /// Amounts carved out by `SplitCoins` commands, in command order
    pub fn split_amounts(&self) -> Vec<&BigUint> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::SplitCoins { amounts, .. } => Some(amounts),
                _ => None,
            })
            .flatten()
            .filter_map(|arg| match self.input(*arg) {
                Some(CallArg::Amount(value)) => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Number of coins folded in by `MergeCoins`
    pub fn merged_coin_count(&self) -> usize {
        self.commands
            .iter()
            .map(|c| match c {
                Command::MergeCoins { sources, .. } => sources.len(),
                _ => 0,
            })
            .sum()
    }

    /// Deterministic byte encoding used for digests and round-tripping
    ///
    /// This is not the ledger's wire format and is never submitted as is.
    pub fn to_bytes(&self) -> TransferResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| TransferError::Serialization(e.to_string()))
    }

    /// Decode bytes produced by [`Operation::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> TransferResult<Self> {
        bincode::deserialize(bytes).map_err(|e| TransferError::Serialization(e.to_string()))
    }

    /// Base58 SHA-256 digest of the canonical encoding
    pub fn digest(&self) -> TransferResult<String> {
        let bytes = self.to_bytes()?;
        Ok(bs58::encode(Sha256::digest(&bytes)).into_string())
    }
}

/// Validate command shape of a transfer operation (debug/test only)
///
/// Expected shape:
/// 1. at most one `MergeCoins`, only at position 0, with a non-empty source
///    list that does not contain its destination
/// 2. at most one `SplitCoins` with a single amount, splitting the coin the
///    merge folded into
/// 3. exactly one `TransferObjects`, last, moving the split result if a split
///    happened and the primary coin otherwise
///
/// Every `Input` argument must be in bounds and `GasCoin` requires a gas
/// payment.
///
/// # Errors
///
/// Returns `TransferError::InvalidCommandOrder` describing the first
/// violation found.
#[cfg(debug_assertions)]
pub fn sanity_check_command_order(op: &Operation) -> TransferResult<()> {
    let Some(Command::TransferObjects { objects, recipient }) = op.commands.last() else {
        return Err(TransferError::invalid_order(
            "operation must end with TransferObjects",
        ));
    };

    let check_arg = |arg: &Argument| -> TransferResult<()> {
        match arg {
            Argument::Input(i) if *i as usize >= op.inputs.len() => Err(
                TransferError::invalid_order(format!("input {} out of bounds", i)),
            ),
            Argument::GasCoin if op.gas_payment.is_empty() => Err(TransferError::invalid_order(
                "GasCoin used without a gas payment",
            )),
            _ => Ok(()),
        }
    };

    let mut primary: Option<Argument> = None;
    let mut split_index: Option<u16> = None;

    for (idx, command) in op.commands.iter().enumerate() {
        match command {
            Command::MergeCoins {
                destination,
                sources,
            } => {
                if idx != 0 {
                    return Err(TransferError::invalid_order(format!(
                        "MergeCoins found at position {}, only allowed at position 0",
                        idx
                    )));
                }
                if sources.is_empty() {
                    return Err(TransferError::invalid_order("MergeCoins without sources"));
                }
                if sources.contains(destination) {
                    return Err(TransferError::invalid_order(
                        "MergeCoins destination listed among its sources",
                    ));
                }
                check_arg(destination)?;
                for source in sources {
                    check_arg(source)?;
                }
                primary = Some(*destination);
            }
            Command::SplitCoins { coin, amounts } => {
                if split_index.is_some() {
                    return Err(TransferError::invalid_order(
                        "Multiple SplitCoins commands found",
                    ));
                }
                if amounts.len() != 1 {
                    return Err(TransferError::invalid_order(format!(
                        "SplitCoins must carve exactly one amount, got {}",
                        amounts.len()
                    )));
                }
                if !matches!(op.input(amounts[0]), Some(CallArg::Amount(_))) {
                    return Err(TransferError::invalid_order(
                        "SplitCoins amount must be an amount input",
                    ));
                }
                if let Some(merged) = primary {
                    if merged != *coin {
                        return Err(TransferError::invalid_order(
                            "SplitCoins does not split the merged coin",
                        ));
                    }
                }
                check_arg(coin)?;
                primary = Some(*coin);
                split_index = Some(idx as u16);
            }
            Command::TransferObjects { .. } if idx + 1 != op.commands.len() => {
                return Err(TransferError::invalid_order(format!(
                    "TransferObjects found at position {}, only allowed last",
                    idx
                )));
            }
            Command::TransferObjects { .. } => {}
        }
    }

    if !matches!(op.input(*recipient), Some(CallArg::Recipient(_))) {
        return Err(TransferError::invalid_order(
            "TransferObjects recipient must be a recipient input",
        ));
    }
    if objects.len() != 1 {
        return Err(TransferError::invalid_order(format!(
            "TransferObjects must move exactly one coin, got {}",
            objects.len()
        )));
    }

    let moved = objects[0];
    match split_index {
        Some(split) if moved != Argument::NestedResult(split, 0) => Err(
            TransferError::invalid_order("TransferObjects must move the split result"),
        ),
        Some(_) => Ok(()),
        None => {
            check_arg(&moved)?;
            match primary {
                Some(merged) if merged != moved => Err(TransferError::invalid_order(
                    "TransferObjects must move the merged coin",
                )),
                _ => Ok(()),
            }
        }
    }
}

/// No-op version of sanity_check_command_order for release builds
#[cfg(not(debug_assertions))]
#[inline]
pub fn sanity_check_command_order(_op: &Operation) -> TransferResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> Address {
        Address::new(format!("0x{}", "a".repeat(64)))
    }

    fn recipient() -> Address {
        Address::new(format!("0x{}", "b".repeat(64)))
    }

    /// merge 0x2 into 0x1, split 250, transfer the split result
    fn split_operation() -> Operation {
        let mut op = Operation::new(sender());
        let primary = op.add_input(CallArg::Object("0x1".into())).unwrap();
        let other = op.add_input(CallArg::Object("0x2".into())).unwrap();
        let amount = op.add_input(CallArg::Amount(BigUint::from(250u32))).unwrap();
        let to = op.add_input(CallArg::Recipient(recipient())).unwrap();
        op.add_command(Command::MergeCoins {
            destination: primary,
            sources: vec![other],
        })
        .unwrap();
        let split = op
            .add_command(Command::SplitCoins {
                coin: primary,
                amounts: vec![amount],
            })
            .unwrap();
        op.add_command(Command::TransferObjects {
            objects: vec![Argument::NestedResult(split, 0)],
            recipient: to,
        })
        .unwrap();
        op
    }

    #[test]
    fn test_operation_accessors() {
        let op = split_operation();
        assert!(op.has_split());
        assert_eq!(op.split_amounts(), vec![&BigUint::from(250u32)]);
        assert_eq!(op.merged_coin_count(), 1);
        assert_eq!(
            op.commands.iter().map(Command::name).collect::<Vec<_>>(),
            vec!["MergeCoins", "SplitCoins", "TransferObjects"]
        );
    }

    #[test]
    fn test_bytes_and_digest_are_stable() {
        let op = split_operation();
        let bytes = op.to_bytes().unwrap();
        assert_eq!(Operation::from_bytes(&bytes).unwrap(), op);
        assert_eq!(op.digest().unwrap(), split_operation().digest().unwrap());

        let mut other = split_operation();
        other.gas_price = Some(1000);
        assert_ne!(op.digest().unwrap(), other.digest().unwrap());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(split_operation()).unwrap();
        assert_eq!(json["inputs"][2]["amount"], "250");
        assert_eq!(json["commands"][0]["mergeCoins"]["destination"]["input"], 0);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_sanity_check_valid_split() {
        assert!(sanity_check_command_order(&split_operation()).is_ok());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_sanity_check_valid_gas_transfer() {
        let mut op = Operation::new(sender());
        op.gas_payment = vec!["0x1".into()];
        let to = op.add_input(CallArg::Recipient(recipient())).unwrap();
        op.add_command(Command::TransferObjects {
            objects: vec![Argument::GasCoin],
            recipient: to,
        })
        .unwrap();
        assert!(sanity_check_command_order(&op).is_ok());

        op.gas_payment.clear();
        let err = sanity_check_command_order(&op).unwrap_err();
        assert!(err.to_string().contains("GasCoin"));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_sanity_check_empty_operation() {
        let op = Operation::new(sender());
        assert!(matches!(
            sanity_check_command_order(&op),
            Err(TransferError::InvalidCommandOrder(_))
        ));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_sanity_check_transfer_not_last() {
        let mut op = split_operation();
        let transfer = op.commands.remove(2);
        op.commands.insert(1, transfer);
        let err = sanity_check_command_order(&op).unwrap_err();
        assert!(err.to_string().contains("must end with TransferObjects"));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_sanity_check_transfer_must_move_split_result() {
        let mut op = split_operation();
        if let Some(Command::TransferObjects { objects, .. }) = op.commands.last_mut() {
            objects[0] = Argument::Input(0);
        }
        let err = sanity_check_command_order(&op).unwrap_err();
        assert!(err.to_string().contains("split result"));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_sanity_check_merge_destination_in_sources() {
        let mut op = split_operation();
        if let Command::MergeCoins { sources, .. } = &mut op.commands[0] {
            sources.push(Argument::Input(0));
        }
        let err = sanity_check_command_order(&op).unwrap_err();
        assert!(err.to_string().contains("destination listed"));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_sanity_check_out_of_bounds_input() {
        let mut op = split_operation();
        if let Command::MergeCoins { sources, .. } = &mut op.commands[0] {
            sources[0] = Argument::Input(42);
        }
        let err = sanity_check_command_order(&op).unwrap_err();
        assert!(err.to_string().contains("out of bounds"));
    }
}
