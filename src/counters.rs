//! Counter Store
//!
//! All-time operation counters for one process. Each field is its own atomic,
//! so concurrent writers never lose updates; a reader may observe `hits` and
//! `misses` from slightly different instants, which the reporter tolerates.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::Operation;

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSet {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub pattern_deletes: u64,
    pub errors: u64,
}

impl CounterSet {
    /// Total `get` calls resolved either way
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit rate as a percentage in `[0, 100]`, `0` when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }

    /// Apply one counted event
    pub(crate) fn apply(&mut self, event: CounterEvent) {
        match event {
            CounterEvent::Hit => self.hits += 1,
            CounterEvent::Miss => self.misses += 1,
            CounterEvent::Set => self.sets += 1,
            CounterEvent::Delete(n) => self.deletes += n,
            CounterEvent::PatternDelete { removed } => {
                self.pattern_deletes += 1;
                self.deletes += removed;
            }
            CounterEvent::Error => self.errors += 1,
        }
    }
}

/// `hits / (hits + misses) * 100`, defined as `0` for no lookups
#[allow(clippy::cast_precision_loss)]
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        (hits as f64 / total as f64) * 100.0
    }
}

/// A single counted outcome, shared by the counter store and the daily rollup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterEvent {
    Hit,
    Miss,
    Set,
    /// Keys removed by single-key deletes (counted even when absent)
    Delete(u64),
    /// One invalidation sweep that removed `removed` keys
    PatternDelete { removed: u64 },
    Error,
}

/// Cumulative latency for one operation kind
#[derive(Debug, Default)]
struct LatencyCell {
    count: AtomicU64,
    total_micros: AtomicU64,
}

impl LatencyCell {
    fn record(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
    }

    fn snapshot(&self) -> LatencySample {
        LatencySample {
            count: self.count.load(Ordering::Relaxed),
            total_micros: self.total_micros.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.total_micros.store(0, Ordering::Relaxed);
    }
}

/// Latency totals for one operation kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySample {
    pub count: u64,
    pub total_micros: u64,
}

impl LatencySample {
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_micros as f64 / self.count as f64 / 1000.0
        }
    }
}

/// Latency totals per operation kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyStats {
    pub get: LatencySample,
    pub set: LatencySample,
    pub delete: LatencySample,
    pub pattern_delete: LatencySample,
}

impl LatencyStats {
    /// Average latency over every timed operation
    #[allow(clippy::cast_precision_loss)]
    pub fn overall_avg_ms(&self) -> f64 {
        let all = [self.get, self.set, self.delete, self.pattern_delete];
        let count: u64 = all.iter().map(|s| s.count).sum();
        let micros: u64 = all.iter().map(|s| s.total_micros).sum();
        if count == 0 {
            0.0
        } else {
            micros as f64 / count as f64 / 1000.0
        }
    }
}

/// Process-wide counter store, shared by the accessor, controller and reporter
#[derive(Debug, Default)]
pub struct CounterStore {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    pattern_deletes: AtomicU64,
    errors: AtomicU64,
    get_latency: LatencyCell,
    set_latency: LatencyCell,
    delete_latency: LatencyCell,
    pattern_latency: LatencyCell,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, event: CounterEvent) {
        match event {
            CounterEvent::Hit => {
                self.hits.fetch_add(1, Ordering::Relaxed);
            }
            CounterEvent::Miss => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
            CounterEvent::Set => {
                self.sets.fetch_add(1, Ordering::Relaxed);
            }
            CounterEvent::Delete(n) => {
                self.deletes.fetch_add(n, Ordering::Relaxed);
            }
            CounterEvent::PatternDelete { removed } => {
                self.pattern_deletes.fetch_add(1, Ordering::Relaxed);
                self.deletes.fetch_add(removed, Ordering::Relaxed);
            }
            CounterEvent::Error => {
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub(crate) fn record_latency(&self, operation: Operation, elapsed: Duration) {
        match operation {
            Operation::Get => self.get_latency.record(elapsed),
            Operation::Set => self.set_latency.record(elapsed),
            Operation::Delete => self.delete_latency.record(elapsed),
            Operation::PatternDelete | Operation::Scan => self.pattern_latency.record(elapsed),
        }
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> CounterSet {
        CounterSet {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            pattern_deletes: self.pattern_deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub fn latency(&self) -> LatencyStats {
        LatencyStats {
            get: self.get_latency.snapshot(),
            set: self.set_latency.snapshot(),
            delete: self.delete_latency.snapshot(),
            pattern_delete: self.pattern_latency.snapshot(),
        }
    }

    /// Administrative clear; the only way counters ever go down
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.sets.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.pattern_deletes.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.get_latency.reset();
        self.set_latency.reset();
        self.delete_latency.reset();
        self.pattern_latency.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_hit_rate_zero_without_lookups() {
        assert_eq!(CounterSet::default().hit_rate(), 0.0);
        assert_eq!(hit_rate(0, 0), 0.0);
    }

    #[test]
    fn test_hit_rate_bounds() {
        assert_eq!(hit_rate(10, 0), 100.0);
        assert_eq!(hit_rate(0, 10), 0.0);
        assert!((hit_rate(80, 20) - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pattern_delete_counts_sweep_and_keys() {
        let store = CounterStore::new();
        store.record(CounterEvent::PatternDelete { removed: 5 });
        store.record(CounterEvent::PatternDelete { removed: 0 });
        let snap = store.snapshot();
        assert_eq!(snap.pattern_deletes, 2);
        assert_eq!(snap.deletes, 5);
    }

    #[test]
    fn test_counter_set_apply_matches_store() {
        let store = CounterStore::new();
        let mut set = CounterSet::default();
        let events = [
            CounterEvent::Hit,
            CounterEvent::Miss,
            CounterEvent::Miss,
            CounterEvent::Set,
            CounterEvent::Delete(1),
            CounterEvent::PatternDelete { removed: 3 },
            CounterEvent::Error,
        ];
        for event in events {
            store.record(event);
            set.apply(event);
        }
        assert_eq!(store.snapshot(), set);
    }

    #[test]
    fn test_reset_clears_everything() {
        let store = CounterStore::new();
        store.record(CounterEvent::Hit);
        store.record_latency(Operation::Get, Duration::from_millis(2));
        store.reset();
        assert_eq!(store.snapshot(), CounterSet::default());
        assert_eq!(store.latency(), LatencyStats::default());
    }

    #[test]
    fn test_latency_average() {
        let store = CounterStore::new();
        store.record_latency(Operation::Get, Duration::from_millis(2));
        store.record_latency(Operation::Get, Duration::from_millis(4));
        let latency = store.latency();
        assert_eq!(latency.get.count, 2);
        assert!((latency.get.avg_ms() - 3.0).abs() < 1e-9);
        assert!((latency.overall_avg_ms() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(CounterStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        store.record(CounterEvent::Hit);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.snapshot().hits, 8000);
    }
}
