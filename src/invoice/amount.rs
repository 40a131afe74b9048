//! Numeric input normalization and money formatting.
//!
//! Quantities, rates and percentages are held as [`Decimal`] so that sums over
//! many line items never pick up binary floating point error. Values are only
//! rounded when they are formatted for display.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse user-entered numeric text.
///
/// Blank or non-numeric input is treated as zero rather than rejected, the
/// same way an empty form field counts as nothing.
pub fn parse_amount(input: &str) -> Decimal {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or_else(|_| {
            tracing::debug!(input = trimmed, "non-numeric amount treated as zero");
            Decimal::ZERO
        })
}

/// Convert a float coming from a config or JSON number.
pub fn amount_from_f64(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    parse_amount(&value.to_string())
}

/// Format an amount with two decimals and thousands separators, e.g. `$1,234.50`.
pub fn format_money(value: Decimal, currency_symbol: &str) -> String {
    let rounded = value.round_dp(2);
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{currency_symbol}{grouped}.{frac}")
}

/// Format a plain number for tables (`2`, `1.5`), trimming trailing zeros.
pub fn format_quantity(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Serde adapter for decimal fields in drafts and request payloads.
///
/// Writes integers as integers and other values as a float when the float
/// reads back to the same decimal; anything longer is written as a string.
/// Reads numbers or strings, normalizing anything unparsable to zero.
pub mod lenient {
    use super::*;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(value: &Decimal, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.fract().is_zero() {
            if let Some(whole) = value.to_i64() {
                return serializer.serialize_i64(whole);
            }
        }
        match value.to_f64() {
            Some(v) if amount_from_f64(v) == *value => serializer.serialize_f64(v),
            _ => serializer.serialize_str(&value.to_string()),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = Decimal;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number or numeric string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Decimal, E> {
            Ok(amount_from_f64(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Decimal, E> {
            Ok(parse_amount(v))
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Decimal, E> {
            Ok(Decimal::ZERO)
        }
    }
}
