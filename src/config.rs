//! Environment configuration

use rust_decimal::Decimal;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use crate::domain::services::invoice::DEFAULT_GST_RATE;
use crate::{Result, StorefrontError};

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub api_url: String,
    pub geo_url: String,
    pub storage_dir: PathBuf,
    pub gst_rate: Decimal,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("STOREFRONT_API_URL").unwrap_or_else(|| "http://localhost:5000/api".to_string());
        let geo_url = lookup("STOREFRONT_GEO_URL")
            .unwrap_or_else(|| format!("{}/location", api_url.trim_end_matches('/')));
        Ok(Self {
            port: parse_or(&lookup, "PORT", 8083)?,
            storage_dir: lookup("STOREFRONT_STORAGE_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".storefront")),
            gst_rate: parse_or(&lookup, "STOREFRONT_GST_RATE", DEFAULT_GST_RATE)?,
            api_url,
            geo_url,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| StorefrontError::Config(format!("invalid {key} value {raw:?}: {e}"))),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
