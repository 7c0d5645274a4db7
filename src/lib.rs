//! Storefront core
//!
//! Client-side state and pricing for the customer-facing shop.
//!
//! ## Features
//! - Cart with per-size quantities, merged by design/color variant
//! - Location-based display pricing (markup + currency conversion)
//! - Bulk quantity tiers for the size configurator
//! - Invoice totals normalized from loosely shaped backend payloads
//! - Printable PDF invoice export

pub mod config;
pub mod domain;
pub mod export;
pub mod remote;
pub mod routes;
pub mod storage;
pub mod store;

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("No order id available")]
    MissingOrderId,

    #[error("Invoice not found for order {0}")]
    InvoiceNotFound(String),

    #[error("Cart item not found: {0}")]
    ItemNotFound(String),

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("Invalid quantity tier: {0}")]
    InvalidTier(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("PDF error: {0}")]
    Pdf(String),
}

impl StorefrontError {
    /// Errors after which the current page cannot be rendered at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingOrderId | Self::InvoiceNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
