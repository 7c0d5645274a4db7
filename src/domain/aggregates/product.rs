//! Product listing records and grid cards

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::services::pricing::LocationPricing;
use crate::domain::services::tiering::QuantityTier;
use crate::domain::value_objects::lenient_decimal;

/// Product as returned by the catalog endpoint. Prices are in the base currency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub tiers: Vec<QuantityTier>,
}

/// One tile of the product grid, priced for the shopper's location.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub display_price: Decimal,
    pub currency: String,
    pub currency_symbol: &'static str,
}

impl Product {
    pub fn display_price(&self, pricing: &LocationPricing) -> Decimal {
        pricing.quote(self.price).final_price()
    }

    pub fn card(&self, pricing: &LocationPricing) -> ProductCard {
        ProductCard {
            id: self.id.clone(),
            name: self.name.clone(),
            image: self.images.first().cloned(),
            display_price: self.display_price(pricing),
            currency: pricing.currency.to_string(),
            currency_symbol: pricing.symbol(),
        }
    }
}

pub fn product_grid(products: &[Product], pricing: &LocationPricing) -> Vec<ProductCard> {
    products.iter().map(|p| p.card(pricing)).collect()
}
