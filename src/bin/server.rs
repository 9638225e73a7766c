//! Cache analytics HTTP server
//!
//! Run with: cargo run --bin cache-analytics-server
//!
//! Configured through `CACHE_BACKEND`, `REDIS_URL`, `CACHE_ANALYTICS_*` and
//! `RUST_LOG`.

use cache_analytics::{api, AnalyticsConfig, CacheAnalyticsBuilder};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AnalyticsConfig::from_env();
    let addr = config.socket_addr()?;

    let system = CacheAnalyticsBuilder::new().with_config(config).build().await?;
    if !system.health_check().await {
        tracing::warn!("Backing store unhealthy at startup; serving anyway");
    }

    api::serve(Arc::new(system), addr).await
}
