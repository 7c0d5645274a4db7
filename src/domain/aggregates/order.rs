//! Order records seen by the storefront
//!
//! Orders are owned by the backend. The storefront only keeps the last
//! completed order (for the success page) and renders the shopper's history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::cart::Cart;
use crate::domain::value_objects::lenient_decimal;

/// Stored under the last-order key once checkout completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastOrder {
    #[serde(alias = "_id", alias = "id")]
    pub order_id: String,
    pub placed_at: DateTime<Utc>,
    #[serde(default)]
    pub pieces: u32,
    #[serde(default)]
    pub cart_subtotal: Decimal,
}

impl LastOrder {
    pub fn from_cart(order_id: impl Into<String>, cart: &Cart) -> Self {
        Self {
            order_id: order_id.into(),
            placed_at: Utc::now(),
            pieces: cart.total_pieces(),
            cart_subtotal: cart.subtotal(),
        }
    }
}

/// Row of the order-history listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, alias = "totalAmount", alias = "grandTotal", deserialize_with = "lenient_decimal")]
    pub total: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
