//! Location-based display pricing
//!
//! Catalog prices are stored in the base currency. A shopper's resolved
//! location supplies a markup percentage and a conversion factor; the display
//! price is `round(base * (1 + markup / 100) * factor)`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::value_objects::{percent_of, round_whole, CurrencyCode};

/// Glyph used when a currency code has no known symbol.
pub const DEFAULT_SYMBOL: &str = "₹";

/// Pricing parameters resolved from the shopper's location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPricing {
    #[serde(default = "default_country", alias = "countryCode", alias = "country_code")]
    pub country: String,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default, alias = "markupPercentage", alias = "markup_percent", alias = "markup")]
    pub markup_percent: Decimal,
    #[serde(default = "neutral_factor", alias = "conversionRate", alias = "conversion_factor", alias = "rate")]
    pub conversion_factor: Decimal,
}

fn default_country() -> String { "IN".to_string() }
fn neutral_factor() -> Decimal { Decimal::ONE }

impl Default for LocationPricing {
    fn default() -> Self {
        Self {
            country: default_country(),
            currency: CurrencyCode::base(),
            markup_percent: Decimal::ZERO,
            conversion_factor: Decimal::ONE,
        }
    }
}

impl LocationPricing {
    pub fn quote(&self, base_price: Decimal) -> PriceQuote {
        PriceQuote {
            base_price,
            markup_percent: self.markup_percent,
            conversion_factor: self.conversion_factor,
            currency: self.currency.clone(),
        }
    }

    pub fn symbol(&self) -> &'static str { currency_symbol(self.currency.as_str()) }
}

/// Derived price, never stored.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub base_price: Decimal,
    pub markup_percent: Decimal,
    pub conversion_factor: Decimal,
    pub currency: CurrencyCode,
}

impl PriceQuote {
    pub fn final_price(&self) -> Decimal {
        display_price(self.base_price, Some(self.markup_percent), Some(self.conversion_factor))
    }
}

/// Markup is applied first, then the conversion factor (skipped when it is 1).
/// Absent inputs are neutral; an adjustment that overflows is skipped.
pub fn display_price(base_price: Decimal, markup_percent: Option<Decimal>, conversion_factor: Option<Decimal>) -> Decimal {
    let mut price = base_price;
    if let Some(markup) = markup_percent.filter(|m| !m.is_zero()) {
        match percent_of(price, markup).and_then(|m| price.checked_add(m)) {
            Some(marked_up) => price = marked_up,
            None => warn!(%base_price, %markup, "Markup overflows, skipping it"),
        }
    }
    if let Some(factor) = conversion_factor.filter(|f| *f != Decimal::ONE) {
        match price.checked_mul(factor) {
            Some(converted) => price = converted,
            None => warn!(%base_price, %factor, "Currency conversion overflows, skipping it"),
        }
    }
    round_whole(price)
}

pub fn currency_symbol(code: &str) -> &'static str {
    match code.trim().to_ascii_uppercase().as_str() {
        "INR" => "₹",
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "AUD" => "A$",
        "CAD" => "C$",
        "SGD" => "S$",
        "AED" => "د.إ",
        _ => DEFAULT_SYMBOL,
    }
}
