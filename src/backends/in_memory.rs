//! In-Memory Backend - `DashMap` Store
//!
//! A concurrent in-process store. Used when no remote store is configured and
//! as the default backend in tests.

use anyhow::Result;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::pattern::KeyPattern;

/// Stored value with optional expiration
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() > expires_at)
    }
}

/// Concurrent in-memory store using `DashMap`
///
/// **Features**:
/// - Lock-free concurrent reads/writes
/// - Optional per-key TTL, checked lazily on access
/// - Pattern scans over the live keyspace
/// - Approximate memory accounting (key + value bytes)
///
/// **Limitations**:
/// - No eviction policy, growth is bounded only by TTLs and deletes
/// - Expired entries linger until touched or `cleanup_expired` runs
///
/// **Example**:
/// ```rust
/// use cache_analytics::backends::InMemoryBackend;
/// use cache_analytics::CacheBackend;
///
/// # async fn example() -> anyhow::Result<()> {
/// let store = InMemoryBackend::new();
/// store.set("user:1", b"alice", None).await?;
/// assert_eq!(store.get("user:1").await?, Some(b"alice".to_vec()));
/// # Ok(())
/// # }
/// ```
pub struct InMemoryBackend {
    map: Arc<DashMap<String, CacheEntry>>,
    started_at: Instant,
    /// Live handles created through `connect`
    connections: Arc<AtomicU64>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        info!("Initializing in-memory backend (DashMap)");

        Self {
            map: Arc::new(DashMap::new()),
            started_at: Instant::now(),
            connections: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a client; the count is reported as `total_connections`
    pub fn connect(&self) -> ConnectionHandle {
        self.connections.fetch_add(1, Ordering::Relaxed);
        ConnectionHandle {
            connections: Arc::clone(&self.connections),
        }
    }

    /// Remove expired entries, returning how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let mut removed = 0;
        self.map.retain(|_, entry| {
            if entry.is_expired() {
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed > 0 {
            debug!(count = removed, "[InMemory] Cleaned up expired entries");
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the connection count when dropped
pub struct ConnectionHandle {
    connections: Arc<AtomicU64>,
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }
}

// ===== Trait Implementations =====

use crate::traits::CacheBackend;
use async_trait::async_trait;

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.map.get(key) else {
            return Ok(None);
        };
        if entry.is_expired() {
            drop(entry); // Release read lock
            self.map.remove_if(key, |_, e| e.is_expired());
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.map
            .insert(key.to_string(), CacheEntry::new(value.to_vec(), ttl));
        debug!(key = %key, ttl_secs = ?ttl.map(|t| t.as_secs()), "[InMemory] Stored key");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self
            .map
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired()))
    }

    async fn scan_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = KeyPattern::parse(pattern)?;
        let keys: Vec<String> = self
            .map
            .iter()
            .filter(|entry| !entry.value().is_expired() && pattern.matches(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        debug!(pattern = %pattern, count = keys.len(), "[InMemory] Scanned keys matching pattern");
        Ok(keys)
    }

    async fn memory_usage(&self) -> Option<u64> {
        let bytes: usize = self
            .map
            .iter()
            .map(|entry| entry.key().len() + entry.value().value.len())
            .sum();
        u64::try_from(bytes).ok()
    }

    async fn connection_count(&self) -> Option<u64> {
        Some(self.connections.load(Ordering::Relaxed))
    }

    async fn uptime(&self) -> Option<Duration> {
        Some(self.started_at.elapsed())
    }

    async fn health_check(&self) -> bool {
        let test_key = "health_check_in_memory";
        let test_value = b"health_check_value";

        match self
            .set(test_key, test_value, Some(Duration::from_secs(60)))
            .await
        {
            Ok(()) => match self.get(test_key).await {
                Ok(Some(retrieved)) => {
                    let _ = self.delete(test_key).await;
                    retrieved == test_value
                }
                _ => false,
            },
            Err(_) => false,
        }
    }

    fn name(&self) -> &'static str {
        "InMemory"
    }
}
