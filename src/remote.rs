//! Client for the storefront backend
//!
//! Every call is a single attempt: no retries, no timeouts. A failed call is
//! logged and resolved to an empty or neutral value so pages degrade instead
//! of failing. The invoice lookup returns `None` on failure; the success page
//! treats that as fatal.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::domain::aggregates::{OrderSummary, Product};
use crate::domain::services::LocationPricing;
use crate::Result;

/// List endpoints answer either with a bare array or with a wrapper object.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "products", alias = "orders")]
        data: Vec<T>,
    },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self { Self::Bare(items) | Self::Wrapped { data: items } => items }
    }
}

/// Decodes records one by one; an undecodable record is logged and skipped.
fn decode_each<T: DeserializeOwned>(records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct StorefrontApi {
    client: reqwest::Client,
    base_url: String,
    geo_url: String,
}

impl StorefrontApi {
    pub fn new(base_url: impl Into<String>, geo_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            geo_url: geo_url.into(),
        }
    }

    fn url(&self, path: &str) -> String { format!("{}/{}", self.base_url, path.trim_start_matches('/')) }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn products(&self) -> Vec<Product> {
        match self.fetch::<Listing<Value>>(&self.url("products")).await {
            Ok(listing) => decode_each(listing.into_vec()),
            Err(e) => {
                warn!(error = %e, "Failed to fetch products");
                Vec::new()
            }
        }
    }

    pub async fn banner(&self) -> Value {
        self.fetch(&self.url("banner")).await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch banner");
            Value::Null
        })
    }

    pub async fn orders_for_user(&self, user_id: &str) -> Vec<OrderSummary> {
        match self.fetch::<Listing<Value>>(&self.url(&format!("orders/user/{user_id}"))).await {
            Ok(listing) => decode_each(listing.into_vec()),
            Err(e) => {
                warn!(error = %e, user_id, "Failed to fetch orders");
                Vec::new()
            }
        }
    }

    pub async fn invoice(&self, order_id: &str) -> Option<Value> {
        match self.fetch::<Value>(&self.url(&format!("invoice/{order_id}"))).await {
            Ok(Value::Null) => None,
            Ok(invoice) => Some(invoice),
            Err(e) => {
                warn!(error = %e, order_id, "Failed to fetch invoice");
                None
            }
        }
    }

    pub async fn location_pricing(&self) -> LocationPricing {
        self.fetch(&self.geo_url).await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to resolve location, using base pricing");
            LocationPricing::default()
        })
    }
}
