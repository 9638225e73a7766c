//! Backing Store Traits
//!
//! The analytics layer does not store anything itself. It instruments a
//! backing key-value store reached through [`CacheBackend`].
//!
//! # Example: Custom Backend
//!
//! ```rust,ignore
//! use cache_analytics::{CacheBackend, async_trait};
//! use std::time::Duration;
//! use anyhow::Result;
//!
//! struct MyStore {
//!     // Your implementation
//! }
//!
//! #[async_trait]
//! impl CacheBackend for MyStore {
//!     async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
//!         // Your implementation
//!     }
//!
//!     async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
//!         // Your implementation
//!     }
//!
//!     async fn delete(&self, key: &str) -> Result<bool> {
//!         // Your implementation
//!     }
//!
//!     async fn scan_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
//!         // Your implementation
//!     }
//!
//!     async fn health_check(&self) -> bool {
//!         // Your implementation
//!     }
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value store instrumented by the analytics layer
///
/// Unlike a plain cache lookup, `get` returns a `Result`: a store that cannot
/// be reached must be distinguishable from a key that is not there.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; operations on different keys may run
/// concurrently.
///
/// # Introspection
///
/// `memory_usage`, `connection_count` and `uptime` are optional. The default
/// implementations return `None`, which the reporter turns into `0`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Look up a key
    ///
    /// # Returns
    ///
    /// * `Ok(Some(bytes))` - Key present
    /// * `Ok(None)` - Key absent or expired
    /// * `Err(e)` - Store unreachable or failed
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value
    ///
    /// `ttl` is applied exactly as given; `None` means no expiry.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Remove a key
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Key existed and was removed
    /// * `Ok(false)` - Key did not exist
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Every key matching a glob pattern (`*`, `?`, `[...]`)
    async fn scan_by_pattern(&self, pattern: &str) -> Result<Vec<String>>;

    /// Remove several keys, returning how many existed
    ///
    /// The default issues one `delete` per key. An error means the batch as a
    /// whole failed and should be treated as nothing removed.
    async fn delete_many(&self, keys: &[String]) -> Result<usize> {
        let mut removed = 0;
        for key in keys {
            if self.delete(key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Bytes used by the store, if it can tell
    async fn memory_usage(&self) -> Option<u64> {
        None
    }

    /// Connected clients, if the store can tell
    async fn connection_count(&self) -> Option<u64> {
        None
    }

    /// Time since the store started, if it can tell
    async fn uptime(&self) -> Option<Duration> {
        None
    }

    /// Check if the store is operational
    async fn health_check(&self) -> bool;

    /// Name used in logs and reports
    fn name(&self) -> &'static str {
        "unknown"
    }
}
