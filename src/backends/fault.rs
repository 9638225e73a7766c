//! Fault Injection Decorator
//!
//! Wraps any backend with artificial latency and random failures. Meant for
//! tests and demos; the accessor itself knows nothing about it.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::traits::CacheBackend;

/// Latency and failure settings for [`FaultInjectingBackend`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultConfig {
    /// Delay added before every store call
    pub latency: Duration,
    /// Probability in `[0, 1]` that a call fails instead of reaching the store
    pub failure_rate: f64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            failure_rate: 0.0,
        }
    }
}

impl FaultConfig {
    /// Every call fails
    pub fn always_fail() -> Self {
        Self {
            latency: Duration::ZERO,
            failure_rate: 1.0,
        }
    }

    /// Every call is delayed by `latency`
    pub fn slow(latency: Duration) -> Self {
        Self {
            latency,
            failure_rate: 0.0,
        }
    }
}

/// Backend decorator injecting latency and failures
pub struct FaultInjectingBackend {
    inner: Arc<dyn CacheBackend>,
    config: FaultConfig,
}

impl FaultInjectingBackend {
    pub fn new(inner: Arc<dyn CacheBackend>, config: FaultConfig) -> Self {
        Self { inner, config }
    }

    async fn inject(&self, operation: &str) -> Result<()> {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        let rate = self.config.failure_rate.clamp(0.0, 1.0);
        let fail = rate > 0.0 && rand::thread_rng().gen_bool(rate);
        if fail {
            debug!(operation = %operation, "[Fault] Injected failure");
            return Err(anyhow!("injected failure during {operation}"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for FaultInjectingBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inject("get").await?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.inject("set").await?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inject("delete").await?;
        self.inner.delete(key).await
    }

    async fn scan_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        self.inject("scan").await?;
        self.inner.scan_by_pattern(pattern).await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize> {
        self.inject("delete_many").await?;
        self.inner.delete_many(keys).await
    }

    async fn memory_usage(&self) -> Option<u64> {
        self.inject("memory_usage").await.ok()?;
        self.inner.memory_usage().await
    }

    async fn connection_count(&self) -> Option<u64> {
        self.inject("connection_count").await.ok()?;
        self.inner.connection_count().await
    }

    async fn uptime(&self) -> Option<Duration> {
        self.inject("uptime").await.ok()?;
        self.inner.uptime().await
    }

    async fn health_check(&self) -> bool {
        self.inject("health_check").await.is_ok() && self.inner.health_check().await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryBackend;

    #[tokio::test]
    async fn test_no_faults_passes_through() {
        let inner = Arc::new(InMemoryBackend::new());
        let store = FaultInjectingBackend::new(inner, FaultConfig::default());
        store.set("k", b"v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.name(), "InMemory");
    }

    #[tokio::test]
    async fn test_always_fail() {
        let inner = Arc::new(InMemoryBackend::new());
        let store = FaultInjectingBackend::new(inner, FaultConfig::always_fail());
        assert!(store.get("k").await.is_err());
        assert!(store.set("k", b"v", None).await.is_err());
        assert!(store.scan_by_pattern("*").await.is_err());
        assert_eq!(store.memory_usage().await, None);
        assert!(!store.health_check().await);
    }

    #[tokio::test]
    async fn test_latency_is_applied() {
        let inner = Arc::new(InMemoryBackend::new());
        let store = FaultInjectingBackend::new(inner, FaultConfig::slow(Duration::from_millis(30)));
        let start = std::time::Instant::now();
        store.get("k").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
