//! Cache Analytics Builder
//!
//! Wires a backing store, a clock and a counter store into a
//! [`CacheAnalyticsSystem`].
//!
//! # Example: Using Defaults
//!
//! ```rust,no_run
//! use cache_analytics::CacheAnalyticsBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let system = CacheAnalyticsBuilder::new().build().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Example: Custom Backend
//!
//! ```rust,ignore
//! use cache_analytics::{CacheAnalyticsBuilder, CacheBackend};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MyStore::new());
//!
//! let system = CacheAnalyticsBuilder::new()
//!     .with_backend(store)
//!     .build()
//!     .await?;
//! ```

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::accessor::CacheAccessor;
use crate::backends::{FaultConfig, FaultInjectingBackend, InMemoryBackend};
use crate::config::{AnalyticsConfig, BackendKind};
use crate::counters::CounterStore;
use crate::invalidation::InvalidationController;
use crate::reporter::StatsReporter;
use crate::rollup::{Clock, DailyRollup, SystemClock};
use crate::traits::CacheBackend;
use crate::CacheAnalyticsSystem;

/// Builder for [`CacheAnalyticsSystem`]
///
/// # Default Behavior
///
/// Without an explicit backend, the one named by `config.backend` is created:
/// - **`InMemory`**: a fresh `InMemoryBackend`
/// - **`Remote`**: a `RemoteBackend` connected to `config.redis_url`
///
/// The clock defaults to the system clock and a fresh counter store is created.
pub struct CacheAnalyticsBuilder {
    config: AnalyticsConfig,
    backend: Option<Arc<dyn CacheBackend>>,
    clock: Option<Arc<dyn Clock>>,
    counters: Option<Arc<CounterStore>>,
    faults: Option<FaultConfig>,
}

impl CacheAnalyticsBuilder {
    /// Builder with default configuration
    pub fn new() -> Self {
        Self {
            config: AnalyticsConfig::default(),
            backend: None,
            clock: None,
            counters: None,
            faults: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: AnalyticsConfig) -> Self {
        self.config = config;
        self
    }

    /// Instrument an existing store instead of creating one from config
    pub fn with_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Clock used for day boundaries
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share a counter store with other components
    pub fn with_counter_store(mut self, counters: Arc<CounterStore>) -> Self {
        self.counters = Some(counters);
        self
    }

    /// Wrap the store in a [`FaultInjectingBackend`]; for tests and demos
    pub fn with_fault_injection(mut self, faults: FaultConfig) -> Self {
        self.faults = Some(faults);
        self
    }

    /// Build the system
    ///
    /// # Errors
    ///
    /// Returns an error if the configured remote store cannot be reached, or
    /// if `Remote` is requested without the `redis` feature.
    pub async fn build(self) -> Result<CacheAnalyticsSystem> {
        let config = self.config;

        let mut backend = match self.backend {
            Some(backend) => backend,
            None => create_backend(&config).await?,
        };
        if let Some(faults) = self.faults {
            info!(latency_ms = ?faults.latency.as_millis(), failure_rate = faults.failure_rate, "Fault injection enabled");
            backend = Arc::new(FaultInjectingBackend::new(backend, faults));
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let counters = self.counters.unwrap_or_default();
        let rollup = Arc::new(DailyRollup::new(
            clock,
            config.utc_offset(),
            config.retention_days,
            config.day_start,
        ));

        info!(
            backend = backend.name(),
            retention_days = rollup.retention_days(),
            utc_offset = config.utc_offset_seconds,
            "Initializing cache analytics"
        );

        let accessor = Arc::new(CacheAccessor::new(
            backend,
            counters,
            rollup,
            config.operation_timeout,
        ));
        let invalidation = Arc::new(InvalidationController::new(
            Arc::clone(&accessor),
            config.invalidation_batch_size,
        ));
        let reporter = Arc::new(StatsReporter::new(Arc::clone(&accessor)));

        Ok(CacheAnalyticsSystem {
            accessor,
            invalidation,
            reporter,
            config,
        })
    }
}

impl Default for CacheAnalyticsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn create_backend(config: &AnalyticsConfig) -> Result<Arc<dyn CacheBackend>> {
    match config.backend {
        BackendKind::InMemory => Ok(Arc::new(InMemoryBackend::new())),
        #[cfg(feature = "redis")]
        BackendKind::Remote => {
            let remote = crate::backends::RemoteBackend::with_url(&config.redis_url).await?;
            Ok(Arc::new(remote))
        }
        #[cfg(not(feature = "redis"))]
        BackendKind::Remote => Err(anyhow::anyhow!(
            "Remote backend requested but the `redis` feature is disabled"
        )),
    }
}
