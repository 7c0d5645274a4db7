//! Storefront - serves cart, pricing and invoice views to the shop UI

use anyhow::{Context, Result};
use storefront::config::Config;
use storefront::domain::services::InvoiceNormalizer;
use storefront::remote::StorefrontApi;
use storefront::routes::{router, AppState};
use storefront::storage::FileStorage;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = Config::from_env()?;
    let storage = FileStorage::open(&config.storage_dir)
        .with_context(|| format!("opening storage at {}", config.storage_dir.display()))?;
    let api = StorefrontApi::new(&config.api_url, &config.geo_url);
    let state = AppState::new(Box::new(storage), api, InvoiceNormalizer::new(config.gst_rate));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(api = %config.api_url, "Storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, router(state)).await?;
    Ok(())
}
