//! Bulk quantity tiers for the size configurator

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

use crate::domain::value_objects::{lenient_decimal, SizeQuantities};
use crate::StorefrontError;

/// Range covered by a tier label: `"7"`, `"2-5"` or `"21+"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TierRange {
    Exact(u32),
    Between(u32, u32),
    AtLeast(u32),
}

impl TierRange {
    pub fn contains(&self, qty: u32) -> bool {
        match *self {
            Self::Exact(n) => qty == n,
            Self::Between(lo, hi) => (lo..=hi).contains(&qty),
            Self::AtLeast(lo) => qty >= lo,
        }
    }

    pub fn min_qty(&self) -> u32 {
        match *self { Self::Exact(n) | Self::Between(n, _) | Self::AtLeast(n) => n }
    }

    pub fn max_qty(&self) -> Option<u32> {
        match *self { Self::Exact(n) | Self::Between(_, n) => Some(n), Self::AtLeast(_) => None }
    }
}

impl FromStr for TierRange {
    type Err = StorefrontError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let invalid = || StorefrontError::InvalidTier(label.to_string());
        let num = |s: &str| s.trim().parse::<u32>().map_err(|_| invalid());
        let label = label.trim();
        if let Some(lo) = label.strip_suffix('+') {
            return Ok(Self::AtLeast(num(lo)?));
        }
        match label.split_once('-') {
            Some((lo, hi)) => {
                let (lo, hi) = (num(lo)?, num(hi)?);
                if lo > hi { return Err(invalid()); }
                Ok(Self::Between(lo, hi))
            }
            None => Ok(Self::Exact(num(label)?)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityTier {
    #[serde(alias = "quantity", alias = "label")]
    pub range: String,
    #[serde(alias = "price", alias = "price_per_piece", deserialize_with = "lenient_decimal")]
    pub price_per_piece: Decimal,
}

impl QuantityTier {
    pub fn new(range: impl Into<String>, price_per_piece: Decimal) -> Self {
        Self { range: range.into(), price_per_piece }
    }
}

/// Tiers ordered ascending by their lower bound.
#[derive(Clone, Debug, PartialEq)]
pub struct TierSchedule {
    tiers: Vec<(TierRange, Decimal)>,
}

impl TierSchedule {
    pub fn new(tiers: &[QuantityTier]) -> Result<Self, StorefrontError> {
        let mut parsed = tiers
            .iter()
            .map(|t| -> Result<(TierRange, Decimal), StorefrontError> { Ok((t.range.parse()?, t.price_per_piece)) })
            .collect::<Result<Vec<_>, _>>()?;
        parsed.sort_by_key(|(range, _)| range.min_qty());
        Ok(Self { tiers: parsed })
    }

    pub fn is_empty(&self) -> bool { self.tiers.is_empty() }

    /// Price per piece for `total` pieces. `None` when nothing is ordered.
    /// Falls back to the last tier when no range matches.
    pub fn price_for(&self, total: u32) -> Option<Decimal> {
        if total == 0 { return None; }
        self.tiers
            .iter()
            .find(|(range, _)| range.contains(total))
            .or_else(|| self.tiers.last())
            .map(|(_, price)| *price)
    }

    pub fn quote(&self, sizes: &SizeQuantities) -> TierQuote {
        let total_quantity = sizes.total();
        let price_per_piece = self.price_for(total_quantity);
        let subtotal = price_per_piece.map_or(Decimal::ZERO, |p| {
            p.checked_mul(Decimal::from(total_quantity)).unwrap_or_else(|| {
                warn!(price_per_piece = %p, total_quantity, "Tier subtotal overflows");
                Decimal::MAX
            })
        });
        TierQuote { total_quantity, price_per_piece, subtotal }
    }
}

impl Default for TierSchedule {
    fn default() -> Self {
        let tiers = [("1", 510), ("2-5", 467), ("6-10", 408), ("11-20", 380), ("21+", 371)]
            .into_iter()
            .filter_map(|(label, price)| Some((label.parse().ok()?, Decimal::from(price))))
            .collect();
        Self { tiers }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierQuote {
    pub total_quantity: u32,
    pub price_per_piece: Option<Decimal>,
    pub subtotal: Decimal,
}

/// Size/quantity picker state; the quote is recomputed on every change.
#[derive(Clone, Debug)]
pub struct SizeConfigurator {
    schedule: TierSchedule,
    sizes: SizeQuantities,
    quote: TierQuote,
}

impl SizeConfigurator {
    pub fn new(schedule: TierSchedule, sizes: SizeQuantities) -> Self {
        let quote = schedule.quote(&sizes);
        Self { schedule, sizes, quote }
    }

    pub fn sizes(&self) -> &SizeQuantities { &self.sizes }
    pub fn quote(&self) -> &TierQuote { &self.quote }

    pub fn set_quantity(&mut self, size: impl Into<String>, count: u32) -> &TierQuote {
        self.sizes.set(size, count);
        self.quote = self.schedule.quote(&self.sizes);
        &self.quote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!("7".parse::<TierRange>().unwrap(), TierRange::Exact(7));
        assert_eq!(" 2 - 5 ".parse::<TierRange>().unwrap(), TierRange::Between(2, 5));
        assert_eq!("21+".parse::<TierRange>().unwrap(), TierRange::AtLeast(21));
        assert!("5-2".parse::<TierRange>().is_err());
        assert!("lots".parse::<TierRange>().is_err());
        assert_eq!(TierRange::AtLeast(21).max_qty(), None);
    }

    #[test]
    fn test_default_schedule_prices() {
        let schedule = TierSchedule::default();
        let cases = [(1, 510), (3, 467), (7, 408), (15, 380), (30, 371)];
        for (qty, price) in cases {
            assert_eq!(schedule.price_for(qty), Some(Decimal::from(price)), "qty {qty}");
        }
    }

    #[test]
    fn test_zero_quantity_has_no_price() {
        let quote = TierSchedule::default().quote(&SizeQuantities::zeroed(&["S", "M"]));
        assert_eq!(quote.price_per_piece, None);
        assert_eq!(quote.subtotal, Decimal::ZERO);
    }

    #[test]
    fn test_gap_falls_back_to_last_tier() {
        let schedule = TierSchedule::new(&[
            QuantityTier::new("10+", Decimal::from(90)),
            QuantityTier::new("1-3", Decimal::from(100)),
        ]).unwrap();
        assert_eq!(schedule.price_for(2), Some(Decimal::from(100)));
        assert_eq!(schedule.price_for(5), Some(Decimal::from(90)));
    }

    #[test]
    fn test_configurator_recomputes() {
        let mut configurator = SizeConfigurator::new(TierSchedule::default(), SizeQuantities::zeroed(&["S", "M", "L"]));
        assert_eq!(configurator.quote().subtotal, Decimal::ZERO);
        configurator.set_quantity("S", 1);
        assert_eq!(configurator.quote().subtotal, Decimal::from(510));
        let quote = configurator.set_quantity("M", 2);
        assert_eq!(quote.total_quantity, 3);
        assert_eq!(quote.subtotal, Decimal::from(467 * 3));
    }

    #[test]
    fn test_overflowing_subtotal_is_clamped() {
        let schedule = TierSchedule::new(&[QuantityTier::new("1+", Decimal::from_str_exact("70000000000000000000000000000").unwrap())]).unwrap();
        let quote = schedule.quote(&SizeQuantities::new().with("S", 3));
        assert_eq!(quote.subtotal, Decimal::MAX);
    }

    #[test]
    fn test_string_tier_price() {
        let tiers: Vec<QuantityTier> = serde_json::from_str(r#"[{"range":"1+","price":"405.50"}]"#).unwrap();
        assert_eq!(tiers[0].price_per_piece, Decimal::new(40550, 2));
    }

    #[test]
    fn test_tier_payload() {
        let tiers: Vec<QuantityTier> = serde_json::from_str(r#"[{"quantity":"1","price":510},{"range":"2+","pricePerPiece":467}]"#).unwrap();
        let schedule = TierSchedule::new(&tiers).unwrap();
        assert_eq!(schedule.price_for(40), Some(Decimal::from(467)));
    }
}
