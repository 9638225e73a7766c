//! Remote Backend - Redis Store
//!
//! Redis-backed store for deployments where the cache lives outside the
//! process. Pattern scans use cursor-based `SCAN`, introspection uses `INFO`.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Keys fetched per `SCAN` round trip
const SCAN_COUNT: usize = 100;

/// Redis store with `ConnectionManager` for automatic reconnection
///
/// - Shared across instances of the application
/// - Automatic reconnection via `ConnectionManager`
/// - Non-blocking `SCAN` for pattern resolution (never `KEYS`)
/// - `INFO`-based memory, client and uptime introspection
pub struct RemoteBackend {
    /// Redis connection manager - handles reconnection automatically
    conn_manager: ConnectionManager,
}

impl RemoteBackend {
    /// Connect using the `REDIS_URL` environment variable
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis client cannot be created or connection fails.
    pub async fn new() -> Result<Self> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| crate::config::DEFAULT_REDIS_URL.to_string());
        Self::with_url(&redis_url).await
    }

    /// Connect to a specific Redis URL
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis client cannot be created or connection fails.
    pub async fn with_url(redis_url: &str) -> Result<Self> {
        info!(redis_url = %redis_url, "Initializing remote backend (Redis)");

        let client = Client::open(redis_url)
            .with_context(|| format!("Failed to create Redis client with URL: {redis_url}"))?;

        let conn_manager = ConnectionManager::new(client)
            .await
            .context("Failed to establish Redis connection manager")?;

        let mut conn = conn_manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis PING health check failed")?;

        info!(redis_url = %redis_url, "Remote backend connected");

        Ok(Self { conn_manager })
    }

    /// Raw `INFO <section>` text
    async fn info_section(&self, section: &str) -> Result<String> {
        let mut conn = self.conn_manager.clone();
        let text: String = redis::cmd("INFO")
            .arg(section)
            .query_async(&mut conn)
            .await
            .with_context(|| format!("Redis INFO {section} failed"))?;
        Ok(text)
    }

    async fn info_field(&self, section: &str, field: &str) -> Option<u64> {
        match self.info_section(section).await {
            Ok(text) => parse_info_field(&text, field),
            Err(e) => {
                warn!(section = %section, error = %e, "[Redis] Introspection failed");
                None
            }
        }
    }
}

/// Extract a numeric `field:value` line from `INFO` output
fn parse_info_field(info: &str, field: &str) -> Option<u64> {
    info.lines()
        .filter_map(|line| line.trim().split_once(':'))
        .find(|(name, _)| *name == field)
        .and_then(|(_, value)| value.trim().parse().ok())
}

// ===== Trait Implementations =====

use crate::traits::CacheBackend;
use async_trait::async_trait;

#[async_trait]
impl CacheBackend for RemoteBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn_manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        match ttl {
            Some(ttl) => {
                // PX keeps sub-second TTLs intact
                let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
                let _: () = redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(millis)
                    .query_async(&mut conn)
                    .await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        debug!(key = %key, ttl_ms = ?ttl.map(|t| t.as_millis()), "[Redis] Stored key");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let removed: usize = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn scan_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn_manager.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            cursor = next;
            keys.extend(batch);

            // Cursor 0 means iteration is complete
            if cursor == 0 {
                break;
            }
        }

        // SCAN may return a key more than once
        keys.sort_unstable();
        keys.dedup();

        debug!(pattern = %pattern, count = keys.len(), "[Redis] Scanned keys matching pattern");
        Ok(keys)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn_manager.clone();
        let count: usize = conn.del(keys).await?;
        debug!(count = count, "[Redis] Removed keys in bulk");
        Ok(count)
    }

    async fn memory_usage(&self) -> Option<u64> {
        self.info_field("memory", "used_memory").await
    }

    async fn connection_count(&self) -> Option<u64> {
        self.info_field("clients", "connected_clients").await
    }

    async fn uptime(&self) -> Option<Duration> {
        self.info_field("server", "uptime_in_seconds")
            .await
            .map(Duration::from_secs)
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.conn_manager.clone();
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok_and(|pong| pong == "PONG")
    }

    fn name(&self) -> &'static str {
        "Redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO_SAMPLE: &str = "# Memory\r\nused_memory:1048576\r\nused_memory_human:1.00M\r\n\r\n# Clients\r\nconnected_clients:7\r\n";

    #[test]
    fn test_parse_info_field() {
        assert_eq!(parse_info_field(INFO_SAMPLE, "used_memory"), Some(1_048_576));
        assert_eq!(parse_info_field(INFO_SAMPLE, "connected_clients"), Some(7));
        assert_eq!(parse_info_field(INFO_SAMPLE, "used_memory_human"), None);
        assert_eq!(parse_info_field(INFO_SAMPLE, "uptime_in_seconds"), None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at REDIS_URL"]
    async fn test_round_trip_against_redis() {
        let store = RemoteBackend::new().await.unwrap();
        let key = format!("cache_analytics_test:{}", rand::random::<u32>());
        store.set(&key, b"v", Some(Duration::from_secs(30))).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.scan_by_pattern(&key).await.unwrap(), vec![key.clone()]);
        assert!(store.delete(&key).await.unwrap());
        assert!(store.memory_usage().await.is_some());
    }
}
