//! Stats Reporter
//!
//! Read-only views over the counters, the daily rollup and whatever the
//! backing store can say about itself. Nothing here fails: introspection the
//! store cannot answer is reported as `0`.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::accessor::CacheAccessor;
use crate::counters::{CounterSet, LatencyStats};
use crate::rollup::DailyStatRecord;

/// Live statistics, computed on demand
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedSnapshot {
    /// All-time hit rate in `[0, 100]`
    pub hit_rate: f64,
    pub memory_used_bytes: u64,
    pub total_connections: u64,
    pub uptime_seconds: u64,
    pub counters: CounterSet,
    pub latency: LatencyStats,
    pub avg_latency_ms: f64,
    pub backend: &'static str,
}

/// Builds snapshots and daily history for the reporting endpoint
pub struct StatsReporter {
    accessor: Arc<CacheAccessor>,
}

impl StatsReporter {
    pub fn new(accessor: Arc<CacheAccessor>) -> Self {
        Self { accessor }
    }

    /// Current counters plus best-effort store introspection
    pub async fn get_current_stats(&self) -> AggregatedSnapshot {
        let backend = self.accessor.backend();
        let limit = self.accessor.operation_timeout();

        let (memory, connections, uptime) = tokio::join!(
            best_effort(limit, "memory_usage", backend.memory_usage()),
            best_effort(limit, "connection_count", backend.connection_count()),
            best_effort(limit, "uptime", backend.uptime()),
        );

        let counters = self.accessor.counters().snapshot();
        let latency = self.accessor.counters().latency();

        AggregatedSnapshot {
            hit_rate: counters.hit_rate(),
            memory_used_bytes: memory.unwrap_or(0),
            total_connections: connections.unwrap_or(0),
            uptime_seconds: uptime.map_or(0, |u| u.as_secs()),
            counters,
            latency,
            avg_latency_ms: latency.overall_avg_ms(),
            backend: backend.name(),
        }
    }

    /// Up to `days` daily records, most recent first
    ///
    /// Asking for more days than exist, or than the retention window holds,
    /// returns what is there.
    pub fn get_daily_stats(&self, days: usize) -> Vec<DailyStatRecord> {
        self.accessor.rollup().daily_stats(days)
    }
}

async fn best_effort<T, F>(limit: Duration, what: &str, probe: F) -> Option<T>
where
    F: std::future::Future<Output = Option<T>>,
{
    match tokio::time::timeout(limit, probe).await {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            debug!(probe = %what, "[Reporter] Introspection unsupported");
            None
        }
        Err(_) => {
            debug!(probe = %what, "[Reporter] Introspection timed out");
            None
        }
    }
}
