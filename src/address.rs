//! Account address validation
//!
//! An address is the hex encoding of a 32-byte account identifier, with an
//! optional `0x` prefix. Validation is purely syntactic: no checksum exists
//! and no ledger lookup is performed.

use crate::types::Address;

/// Byte length of an account address
pub const ADDRESS_LENGTH: usize = 32;

/// Check whether `raw` is a syntactically valid account address
///
/// Accepts `0x`/`0X` prefixed or bare hex of exactly [`ADDRESS_LENGTH`]
/// bytes, in either case. Surrounding whitespace is rejected; callers trim
/// user input first.
pub fn is_valid_address(raw: &str) -> bool {
    let body = strip_hex_prefix(raw);
    body.len() == ADDRESS_LENGTH * 2 && hex::decode(body).is_ok()
}

/// Normalize a valid address to lowercase `0x`-prefixed form
///
/// Returns `None` if the input is not a valid address.
pub fn normalize_address(raw: &str) -> Option<Address> {
    if !is_valid_address(raw) {
        return None;
    }
    Some(Address::new(format!(
        "0x{}",
        strip_hex_prefix(raw).to_ascii_lowercase()
    )))
}

fn strip_hex_prefix(raw: &str) -> &str {
    raw.strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw)
}
