//! Exact decimal amount parsing and formatting
//!
//! Converts between human-entered decimal strings ("12.5") and the asset's
//! smallest integer unit using arbitrary-precision integers only. No binary
//! floating point is involved anywhere, so high-precision assets round-trip
//! without drift.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use thiserror::Error;

/// Reasons a decimal amount string is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount must not be negative: {0}")]
    Negative(String),

    #[error("not a decimal number: {0}")]
    NotDecimal(String),

    /// More significant fractional digits than the asset can represent
    #[error("{found} fractional digits exceed asset precision of {decimals}")]
    TooPrecise { found: usize, decimals: u8 },
}

/// `10^decimals` as a big integer
pub fn unit_scale(decimals: u8) -> BigUint {
    let mut scale = BigUint::one();
    let ten = BigUint::from(10u8);
    for _ in 0..decimals {
        scale *= &ten;
    }
    scale
}

/// Parse a decimal string into the asset's smallest unit
///
/// Accepts `"100"`, `"1.25"`, `".5"` and `"3."`. Trailing fractional zeros
/// beyond the precision are ignored (`"1.500"` at 2 decimals is `150`), but
/// any other excess fractional digit is an error rather than being rounded.
///
/// # Errors
///
/// Returns [`AmountError`] for empty, negative, non-decimal or over-precise
/// input.
///
/// # Example
///
/// ```
/// use coin_send::amount::parse_amount;
/// use num_bigint::BigUint;
///
/// assert_eq!(parse_amount("1.5", 9).unwrap(), BigUint::from(1_500_000_000u64));
/// assert!(parse_amount("abc", 9).is_err());
/// ```
pub fn parse_amount(raw: &str, decimals: u8) -> Result<BigUint, AmountError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    if trimmed.starts_with('-') {
        return Err(AmountError::Negative(trimmed.to_string()));
    }

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (trimmed, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part)
    {
        return Err(AmountError::NotDecimal(trimmed.to_string()));
    }

    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.len() > decimals as usize {
        return Err(AmountError::TooPrecise {
            found: frac_part.len(),
            decimals,
        });
    }

    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    for _ in frac_part.len()..decimals as usize {
        digits.push('0');
    }

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(BigUint::zero());
    }
    BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| AmountError::NotDecimal(trimmed.to_string()))
}

/// Format a smallest-unit value as a plain decimal string
///
/// Trailing fractional zeros are trimmed and no separators are inserted, so
/// the result parses back with [`parse_amount`] to the same value.
pub fn format_units(value: &BigUint, decimals: u8) -> String {
    let raw = value.to_string();
    if decimals == 0 {
        return raw;
    }

    let width = decimals as usize + 1;
    let padded = if raw.len() < width {
        format!("{}{}", "0".repeat(width - raw.len()), raw)
    } else {
        raw
    };

    let (int_part, frac_part) = padded.split_at(padded.len() - decimals as usize);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// Format a smallest-unit value for display, with thousands separators
///
/// `1234567891` at 6 decimals renders as `1,234.567891`.
pub fn format_balance(value: &BigUint, decimals: u8) -> String {
    let units = format_units(value, decimals);
    match units.split_once('.') {
        Some((int_part, frac_part)) => format!("{}.{}", group_thousands(int_part), frac_part),
        None => group_thousands(&units),
    }
}

/// Preview of a typed amount in smallest units, e.g. `"1,500,000,000"`
///
/// Returns `None` when the precision is unknown or the amount does not
/// parse; the caller shows a placeholder instead.
pub fn format_smallest_unit(amount: &str, decimals: Option<u8>) -> Option<String> {
    let decimals = decimals?;
    let value = parse_amount(amount, decimals).ok()?;
    Some(group_thousands(&value.to_string()))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
