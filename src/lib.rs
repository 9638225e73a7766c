//! Cache Analytics
//!
//! Instrumentation and reporting around a key-value cache:
//! - **Cache Accessor**: get/set/delete against any [`CacheBackend`], counting every outcome
//! - **Counter Store**: all-time hits, misses, sets, deletes, pattern deletes and errors
//! - **Daily Rollup**: per-day buckets with a bounded retention window
//! - **Stats Reporter**: live snapshots merged with backend introspection
//! - **Invalidation Controller**: single-key, glob-pattern and full flushes
//! - **HTTP API**: `axum` routes for dashboards
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cache_analytics::CacheAnalyticsSystem;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let system = CacheAnalyticsSystem::new().await?;
//!
//!     system.accessor().set("user:1", b"alice", None).await?;
//!     let _ = system.accessor().get("user:1").await?;
//!     let _ = system.accessor().get("user:2").await?;
//!
//!     let stats = system.reporter().get_current_stats().await;
//!     tracing::info!("Hit rate: {:.2}%", stats.hit_rate);
//!
//!     system.invalidation().delete_by_pattern("user:*").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! caller → CacheAccessor → CacheBackend (in-memory / Redis)
//!               ↓ outcome
//!          CounterStore + DailyRollup → StatsReporter → /api/cache/analytics
//! InvalidationController → CacheAccessor accounting → /api/cache/clear
//! ```

use std::sync::Arc;
use tracing::{info, warn};

pub mod accessor;
pub mod api;
pub mod backends;
pub mod builder;
pub mod config;
pub mod counters;
pub mod error;
pub mod invalidation;
pub mod pattern;
pub mod reporter;
pub mod rollup;
pub mod traits;

pub use accessor::CacheAccessor;
pub use backends::{FaultConfig, FaultInjectingBackend, InMemoryBackend};
#[cfg(feature = "redis")]
pub use backends::RemoteBackend;
pub use builder::CacheAnalyticsBuilder;
pub use config::{AnalyticsConfig, BackendKind};
pub use counters::{CounterEvent, CounterSet, CounterStore, LatencySample, LatencyStats};
pub use error::{CacheError, Operation, Result};
pub use invalidation::InvalidationController;
pub use pattern::KeyPattern;
pub use reporter::{AggregatedSnapshot, StatsReporter};
pub use rollup::{Clock, DailyRollup, DailyStatFields, DailyStatRecord, DayStart, ManualClock, SystemClock};
pub use traits::CacheBackend;

// Re-export async_trait for custom backends
pub use async_trait::async_trait;

/// Main entry point: an accessor, its invalidation controller and reporter,
/// all sharing one counter store and one daily rollup
///
/// # Example
///
/// ```rust,no_run
/// use cache_analytics::CacheAnalyticsSystem;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let system = CacheAnalyticsSystem::new().await?;
///     let daily = system.reporter().get_daily_stats(7);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct CacheAnalyticsSystem {
    pub(crate) accessor: Arc<CacheAccessor>,
    pub(crate) invalidation: Arc<InvalidationController>,
    pub(crate) reporter: Arc<StatsReporter>,
    pub(crate) config: AnalyticsConfig,
}

impl CacheAnalyticsSystem {
    /// Create a system configured from the environment
    ///
    /// See [`AnalyticsConfig::from_env`] for the variables read.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured backend cannot be created.
    pub async fn new() -> anyhow::Result<Self> {
        Self::from_config(AnalyticsConfig::from_env()).await
    }

    /// Create a system from an explicit configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configured backend cannot be created.
    pub async fn from_config(config: AnalyticsConfig) -> anyhow::Result<Self> {
        CacheAnalyticsBuilder::new().with_config(config).build().await
    }

    /// Instrumented cache operations
    pub fn accessor(&self) -> &Arc<CacheAccessor> {
        &self.accessor
    }

    pub fn invalidation(&self) -> &Arc<InvalidationController> {
        &self.invalidation
    }

    pub fn reporter(&self) -> &Arc<StatsReporter> {
        &self.reporter
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Whether the backing store answers
    pub async fn health_check(&self) -> bool {
        let backend = self.accessor.backend();
        let healthy = tokio::time::timeout(self.accessor.operation_timeout(), backend.health_check())
            .await
            .unwrap_or(false);
        if healthy {
            info!(backend = backend.name(), "Cache health check passed");
        } else {
            warn!(backend = backend.name(), "Cache health check failed");
        }
        healthy
    }

    /// Zero every counter and drop all daily records
    ///
    /// Cached entries are untouched.
    pub fn reset_stats(&self) {
        self.accessor.counters().reset();
        self.accessor.rollup().clear();
        info!("Cache statistics reset");
    }
}
