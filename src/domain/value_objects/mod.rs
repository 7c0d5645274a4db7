//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::StorefrontError;

/// ISO-4217 style currency code value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub const BASE: &'static str = "INR";

    pub fn new(value: impl Into<String>) -> Result<Self, StorefrontError> {
        let value = value.into().trim().to_uppercase();
        if value.len() != 3 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(StorefrontError::InvalidCurrency(value));
        }
        Ok(Self(value))
    }
    pub fn base() -> Self { Self(Self::BASE.to_string()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl Default for CurrencyCode { fn default() -> Self { Self::base() } }

impl TryFrom<String> for CurrencyCode {
    type Error = StorefrontError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self { code.0 }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Per-size piece counts for one cart line, keyed by size label (S, M, XL, ...)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeQuantities(BTreeMap<String, u32>);

impl SizeQuantities {
    pub fn new() -> Self { Self::default() }

    /// All listed sizes present with a zero count.
    pub fn zeroed<S: AsRef<str>>(sizes: &[S]) -> Self {
        Self(sizes.iter().map(|s| (s.as_ref().to_string(), 0)).collect())
    }

    pub fn with(mut self, size: impl Into<String>, count: u32) -> Self {
        self.set(size, count);
        self
    }

    pub fn get(&self, size: &str) -> u32 { self.0.get(size).copied().unwrap_or(0) }
    pub fn set(&mut self, size: impl Into<String>, count: u32) { self.0.insert(size.into(), count); }
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> { self.0.iter().map(|(k, v)| (k.as_str(), *v)) }
    pub fn total(&self) -> u32 { self.0.values().fold(0u32, |acc, n| acc.saturating_add(*n)) }
    pub fn is_empty(&self) -> bool { self.total() == 0 }

    /// Sums counts per size key; sizes only present in `other` are added.
    pub fn merge(&mut self, other: &SizeQuantities) {
        for (size, count) in &other.0 {
            let entry = self.0.entry(size.clone()).or_insert(0);
            *entry = entry.saturating_add(*count);
        }
    }
}

impl FromIterator<(String, u32)> for SizeQuantities {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self { Self(iter.into_iter().collect()) }
}

/// Money amounts are kept to two decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Display prices are whole units.
pub fn round_whole(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount * percent / 100`, `None` when it does not fit a `Decimal`.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    amount.checked_mul(percent.checked_div(Decimal::ONE_HUNDRED)?)
}

/// Reads a number or a numeric string. Anything else is `None`.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw)).ok()
}

/// Serde helper for backend amounts: numbers and numeric strings are accepted,
/// anything else reads as zero.
pub fn lenient_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(parse_decimal(&value).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code() {
        assert_eq!(CurrencyCode::new(" usd ").unwrap().as_str(), "USD");
        assert!(CurrencyCode::new("US").is_err());
        assert!(CurrencyCode::new("U5D").is_err());
    }

    #[test]
    fn test_size_merge() {
        let mut a = SizeQuantities::new().with("S", 2);
        a.merge(&SizeQuantities::new().with("S", 1).with("M", 1));
        assert_eq!(a.get("S"), 3);
        assert_eq!(a.get("M"), 1);
        assert_eq!(a.total(), 4);
    }

    #[test]
    fn test_zeroed_sizes_are_empty() {
        let sizes = SizeQuantities::zeroed(&["S", "M", "L"]);
        assert!(sizes.is_empty());
        assert_eq!(sizes.iter().count(), 3);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_whole(Decimal::new(1105, 1)), Decimal::from(111));
        assert_eq!(percent_of(Decimal::from(200), Decimal::from(9)), Some(Decimal::from(18)));
    }

    #[test]
    fn test_percent_of_overflow_is_none() {
        assert_eq!(percent_of(Decimal::MAX, Decimal::from(200)), None);
    }

    #[test]
    fn test_parse_decimal_inputs() {
        assert_eq!(parse_decimal(&serde_json::json!(12.5)), Some(Decimal::new(125, 1)));
        assert_eq!(parse_decimal(&serde_json::json!(" 40 ")), Some(Decimal::from(40)));
        assert_eq!(parse_decimal(&serde_json::json!("1e3")), Some(Decimal::from(1000)));
        assert_eq!(parse_decimal(&serde_json::json!("abc")), None);
        assert_eq!(parse_decimal(&serde_json::json!(true)), None);
    }
}
