//! Common utilities for integration tests
//!
//! - Systems wired to a manual clock
//! - A backing store whose bulk deletes fail for chosen keys
//! - Test data generators

#![allow(dead_code)]

use anyhow::{bail, Result};
use cache_analytics::{
    async_trait, AnalyticsConfig, CacheAnalyticsBuilder, CacheAnalyticsSystem, CacheBackend,
    InMemoryBackend, ManualClock,
};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Noon UTC on 2025-03-10
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

/// Create a test key with a random suffix
pub fn test_key(name: &str) -> String {
    format!("test_{}_{}", name, rand::random::<u32>())
}

/// In-memory system whose day boundaries follow the returned clock
pub async fn setup_system_with_clock(
    config: AnalyticsConfig,
) -> (CacheAnalyticsSystem, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_time()));
    let system = CacheAnalyticsBuilder::new()
        .with_config(config)
        .with_clock(clock.clone())
        .build()
        .await
        .expect("Failed to build system");
    (system, clock)
}

/// In-memory system with default config and a manual clock
pub async fn setup_system() -> (CacheAnalyticsSystem, Arc<ManualClock>) {
    setup_system_with_clock(AnalyticsConfig::default()).await
}

/// System over an arbitrary store
pub async fn setup_system_with_backend(
    backend: Arc<dyn CacheBackend>,
    config: AnalyticsConfig,
) -> CacheAnalyticsSystem {
    CacheAnalyticsBuilder::new()
        .with_config(config)
        .with_backend(backend)
        .with_clock(Arc::new(ManualClock::new(start_time())))
        .build()
        .await
        .expect("Failed to build system")
}

/// In-memory store that rejects any bulk delete touching a poisoned key
pub struct PoisonedDeleteBackend {
    inner: InMemoryBackend,
    poisoned: HashSet<String>,
}

impl PoisonedDeleteBackend {
    pub fn new<I, S>(poisoned: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: InMemoryBackend::new(),
            poisoned: poisoned.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl CacheBackend for PoisonedDeleteBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        if self.poisoned.contains(key) {
            bail!("delete rejected for {key}");
        }
        self.inner.delete(key).await
    }

    async fn scan_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        self.inner.scan_by_pattern(pattern).await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize> {
        if let Some(bad) = keys.iter().find(|k| self.poisoned.contains(*k)) {
            bail!("bulk delete rejected for {bad}");
        }
        self.inner.delete_many(keys).await
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }

    fn name(&self) -> &'static str {
        "PoisonedDelete"
    }
}

/// Generate test data
pub mod test_data {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Quote {
        pub symbol: String,
        pub bid: f64,
        pub ask: f64,
    }

    impl Quote {
        pub fn new(id: u64) -> Self {
            Self {
                symbol: format!("SYM{id}"),
                bid: 100.0 + id as f64,
                ask: 100.5 + id as f64,
            }
        }
    }
}

/// Assert on one field of the all-time counters
#[macro_export]
macro_rules! assert_counter {
    ($system:expr, $field:ident == $value:expr) => {
        let counters = $system.accessor().counters().snapshot();
        assert_eq!(
            counters.$field,
            $value,
            "Expected {} == {}, got {}",
            stringify!($field),
            $value,
            counters.$field
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let key1 = test_key("quote");
        let key2 = test_key("quote");
        assert_ne!(key1, key2, "Keys should be unique");
        assert!(key1.starts_with("test_quote_"));
    }
}
