//! Cache Accessor - Instrumented Store Operations
//!
//! Every read and write the application makes goes through here. Each call
//! reaches the backing store, then updates the all-time counters and today's
//! rollup bucket with the outcome, in that order and on the caller's task.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::counters::{CounterEvent, CounterStore};
use crate::error::{CacheError, Operation, Result};
use crate::rollup::DailyRollup;
use crate::traits::CacheBackend;

/// Instrumented wrapper around a [`CacheBackend`]
///
/// Cheap to share behind an `Arc`; calls on different keys run concurrently
/// with no ordering between them.
pub struct CacheAccessor {
    backend: Arc<dyn CacheBackend>,
    counters: Arc<CounterStore>,
    rollup: Arc<DailyRollup>,
    operation_timeout: Duration,
}

impl CacheAccessor {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        counters: Arc<CounterStore>,
        rollup: Arc<DailyRollup>,
        operation_timeout: Duration,
    ) -> Self {
        debug!(backend = backend.name(), timeout_ms = ?operation_timeout.as_millis(), "Initializing cache accessor");
        Self {
            backend,
            counters,
            rollup,
            operation_timeout,
        }
    }

    /// Look up a key
    ///
    /// # Returns
    /// * `Ok(Some(bytes))` - Hit, `hits` incremented
    /// * `Ok(None)` - Miss, `misses` incremented
    /// * `Err(error)` - Store unreachable or timed out, `errors` incremented
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` or `CacheError::Timeout`; a failing
    /// store is never reported as a miss.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let start = Instant::now();
        let outcome = self.bounded(Operation::Get, key, self.backend.get(key)).await;
        self.counters.record_latency(Operation::Get, start.elapsed());

        match outcome {
            Ok(Some(value)) => {
                self.record(CounterEvent::Hit);
                debug!(key = %key, "[Accessor] Hit");
                Ok(Some(value))
            }
            Ok(None) => {
                self.record(CounterEvent::Miss);
                debug!(key = %key, "[Accessor] Miss");
                Ok(None)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Store a value, forwarding `ttl` untouched
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` or `CacheError::Timeout` when the
    /// write does not succeed.
    pub async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let start = Instant::now();
        let outcome = self
            .bounded(Operation::Set, key, self.backend.set(key, value, ttl))
            .await;
        self.counters.record_latency(Operation::Set, start.elapsed());

        match outcome {
            Ok(()) => {
                self.record(CounterEvent::Set);
                debug!(key = %key, ttl_ms = ?ttl.map(|t| t.as_millis()), "[Accessor] Set");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Remove a key, returning whether it existed
    ///
    /// `deletes` is incremented even when the key was absent.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` or `CacheError::Timeout` when the
    /// store fails; only `errors` is incremented then.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let start = Instant::now();
        let outcome = self
            .bounded(Operation::Delete, key, self.backend.delete(key))
            .await;
        self.counters
            .record_latency(Operation::Delete, start.elapsed());

        match outcome {
            Ok(existed) => {
                self.record(CounterEvent::Delete(1));
                debug!(key = %key, existed = existed, "[Accessor] Deleted");
                Ok(existed)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Look up a key and decode it as JSON
    ///
    /// The lookup is counted as usual. A present value that does not decode
    /// additionally counts one error.
    ///
    /// # Errors
    ///
    /// Store failures as in [`get`](Self::get), or `CacheError::Serialization`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|source| {
            self.fail(CacheError::Serialization {
                key: key.to_string(),
                source,
            })
        })
    }

    /// Encode a value as JSON and store it
    ///
    /// # Errors
    ///
    /// `CacheError::Serialization` if encoding fails (nothing is written), or
    /// store failures as in [`set`](Self::set).
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(|source| {
            self.fail(CacheError::Serialization {
                key: key.to_string(),
                source,
            })
        })?;
        self.set(key, &bytes, ttl).await
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub fn counters(&self) -> &Arc<CounterStore> {
        &self.counters
    }

    pub fn rollup(&self) -> &Arc<DailyRollup> {
        &self.rollup
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Count an event in both the all-time counters and today's bucket
    pub(crate) fn record(&self, event: CounterEvent) {
        self.counters.record(event);
        self.rollup.record(event);
    }

    /// Count a failed operation once and hand the error back
    pub(crate) fn fail(&self, error: CacheError) -> CacheError {
        self.record(CounterEvent::Error);
        warn!(operation = ?error.operation(), error = %error, "[Accessor] Operation failed");
        error
    }

    /// Run a store call under the operation timeout, attaching context on failure
    ///
    /// Does not touch any counter; callers decide what the outcome counts as.
    pub(crate) async fn bounded<T, F>(&self, operation: Operation, target: &str, call: F) -> Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(CacheError::Unavailable {
                operation,
                target: target.to_string(),
                source,
            }),
            Err(_) => Err(CacheError::Timeout {
                operation,
                target: target.to_string(),
                after: self.operation_timeout,
            }),
        }
    }
}
