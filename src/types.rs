//! Core ledger data types shared across the crate
//!
//! Coin objects, coin types, addresses and the paginated response shape
//! returned by the ledger. Balances are arbitrary-precision integers and are
//! carried over the wire as decimal strings.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Native coin type of the IOTA ledger
pub const NATIVE_COIN_TYPE: &str = "0x2::iota::IOTA";

/// Decimal precision of the native coin (1 IOTA = 10^9 nanos)
pub const NATIVE_DECIMALS: u8 = 9;

/// Serde adapter that carries a `BigUint` as a base-10 string
///
/// JSON-RPC nodes return balances as strings to avoid precision loss in
/// JavaScript clients; the same representation is used for our own output.
pub mod biguint_string {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        BigUint::from_str(raw.trim()).map_err(de::Error::custom)
    }
}

/// Opaque coin type tag (e.g. `0x2::iota::IOTA`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoinType(String);

impl CoinType {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The chain's native fee-paying coin type
    pub fn native() -> Self {
        Self(NATIVE_COIN_TYPE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CoinType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CoinType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Account address as typed by the user or returned by the ledger
///
/// No validation happens on construction; see [`crate::address`] for the
/// syntactic check and normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Ledger object identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single spendable coin object owned by one address
///
/// Field names follow the ledger's JSON-RPC `getCoins` response so pages can
/// be decoded directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinObject {
    pub coin_object_id: ObjectId,
    pub coin_type: CoinType,
    #[serde(with = "biguint_string")]
    pub balance: BigUint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl CoinObject {
    pub fn new(id: impl Into<String>, coin_type: CoinType, balance: impl Into<BigUint>) -> Self {
        Self {
            coin_object_id: ObjectId::new(id),
            coin_type,
            balance: balance.into(),
            version: None,
            digest: None,
        }
    }
}

/// One page of owned coins plus the continuation cursor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinPage {
    pub data: Vec<CoinObject>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Exact sum of coin balances
pub fn total_balance<'a>(coins: impl IntoIterator<Item = &'a CoinObject>) -> BigUint {
    coins
        .into_iter()
        .fold(BigUint::default(), |acc, coin| acc + &coin.balance)
}
