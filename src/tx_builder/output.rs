//! Transfer build output
//!
//! [`TransferBuildOutput`] holds the unsigned operation in both structured
//! and serialized form, together with the summary shown to the user and the
//! trace context of the build. It owns all of its data and can be handed to
//! any [`crate::ledger::TransactionSigner`], which builds the ledger-native
//! transaction from `operation`.

use crate::ledger::{ExecutionStatus, TransactionDigest};
use crate::observability::TraceContext;
use crate::tx_builder::errors::TransferResult;
use crate::tx_builder::operation::Operation;
use crate::tx_builder::plan::{TransferPlan, TransferSummary};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Unsigned, serialized transfer ready for the signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferBuildOutput {
    /// Operation with the reference gas price recorded
    pub operation: Operation,

    pub summary: TransferSummary,

    /// Crate-internal encoding of `operation`, the input to `digest`
    ///
    /// Not the ledger's transaction format. Signers serialize `operation`
    /// into the chain's native bytes themselves.
    #[serde(with = "base64_bytes")]
    pub tx_bytes: Vec<u8>,

    /// Base58 SHA-256 of `tx_bytes`
    pub digest: String,

    pub trace: TraceContext,
}

impl TransferBuildOutput {
    /// Serialize `plan` with `gas_price` recorded on the operation
    ///
    /// # Errors
    ///
    /// `TransferError::Serialization` if the operation cannot be encoded.
    pub fn new(plan: TransferPlan, gas_price: u64, trace: TraceContext) -> TransferResult<Self> {
        let TransferPlan {
            mut operation,
            summary,
        } = plan;
        operation.gas_price = Some(gas_price);

        let tx_bytes = operation.to_bytes()?;
        let digest = operation.digest()?;

        Ok(Self {
            operation,
            summary,
            tx_bytes,
            digest,
            trace,
        })
    }

    /// `tx_bytes` as standard base64, as carried in the JSON output
    pub fn tx_bytes_base64(&self) -> String {
        BASE64.encode(&self.tx_bytes)
    }

    pub fn summary(&self) -> &TransferSummary {
        &self.summary
    }

    /// Consume self and extract the operation
    pub fn into_operation(self) -> Operation {
        self.operation
    }
}

/// Outcome of a confirmed send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub digest: TransactionDigest,
    pub status: ExecutionStatus,
    pub summary: TransferSummary,
    pub trace: TraceContext,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        BASE64.decode(raw.as_bytes()).map_err(de::Error::custom)
    }
}
