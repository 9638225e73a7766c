//! Invalidation Controller
//!
//! Targeted and pattern-based removal of cache entries. A pattern sweep is
//! one logical operation: it bumps `pattern_deletes` once and `deletes` by the
//! number of keys that were actually removed, so the reporter can tell sweeps
//! apart from purged entries.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::accessor::CacheAccessor;
use crate::counters::CounterEvent;
use crate::error::{CacheError, Operation, Result};
use crate::pattern::KeyPattern;

/// Executes deletes through the same counting path as the accessor
pub struct InvalidationController {
    accessor: Arc<CacheAccessor>,
    batch_size: usize,
}

impl InvalidationController {
    /// `batch_size` keys are handed to the store per bulk delete (at least 1)
    pub fn new(accessor: Arc<CacheAccessor>, batch_size: usize) -> Self {
        Self {
            accessor,
            batch_size: batch_size.max(1),
        }
    }

    /// Remove a single key
    ///
    /// Same accounting as [`CacheAccessor::delete`].
    ///
    /// # Errors
    ///
    /// Store failures as in [`CacheAccessor::delete`].
    pub async fn invalidate(&self, key: &str) -> Result<bool> {
        self.accessor.delete(key).await
    }

    /// Remove every key matching a glob pattern, returning how many were removed
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidPattern` - Malformed pattern; the store is not touched
    /// * `CacheError::Unavailable` / `CacheError::Timeout` - Scan failed; nothing deleted
    /// * `CacheError::PartialInvalidation` - Some batches failed; every batch was
    ///   still attempted and the removed count is reported
    ///
    /// Each of these counts exactly one error.
    pub async fn delete_by_pattern(&self, pattern: &str) -> Result<usize> {
        let pattern = KeyPattern::parse(pattern).map_err(|e| self.accessor.fail(e))?;
        self.sweep(&pattern).await
    }

    /// Flush every key
    ///
    /// Confirmation belongs to the caller; this runs unconditionally.
    ///
    /// # Errors
    ///
    /// Same as [`delete_by_pattern`](Self::delete_by_pattern).
    pub async fn clear_all(&self) -> Result<usize> {
        warn!("[Invalidation] Clearing all cache entries");
        self.sweep(&KeyPattern::universal()).await
    }

    async fn sweep(&self, pattern: &KeyPattern) -> Result<usize> {
        let start = Instant::now();
        let backend = self.accessor.backend();

        let scanned = self
            .accessor
            .bounded(
                Operation::Scan,
                pattern.as_str(),
                backend.scan_by_pattern(pattern.as_str()),
            )
            .await;
        let keys = match scanned {
            Ok(keys) => keys,
            Err(e) => {
                self.accessor
                    .counters()
                    .record_latency(Operation::PatternDelete, start.elapsed());
                return Err(self.accessor.fail(e));
            }
        };

        let mut removed = 0usize;
        let mut failed = 0usize;
        for batch in keys.chunks(self.batch_size) {
            match self
                .accessor
                .bounded(
                    Operation::PatternDelete,
                    pattern.as_str(),
                    backend.delete_many(batch),
                )
                .await
            {
                Ok(count) => removed += count,
                Err(e) => {
                    warn!(pattern = %pattern, batch = batch.len(), error = %e, "[Invalidation] Batch delete failed");
                    failed += batch.len();
                }
            }
        }

        self.accessor.record(CounterEvent::PatternDelete {
            removed: u64::try_from(removed).unwrap_or(u64::MAX),
        });
        self.accessor
            .counters()
            .record_latency(Operation::PatternDelete, start.elapsed());

        if failed > 0 {
            return Err(self.accessor.fail(CacheError::PartialInvalidation {
                pattern: pattern.to_string(),
                removed,
                failed,
            }));
        }

        info!(
            pattern = %pattern,
            matched = keys.len(),
            removed = removed,
            elapsed_us = start.elapsed().as_micros(),
            "[Invalidation] Pattern sweep complete"
        );
        Ok(removed)
    }
}
