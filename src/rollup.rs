//! Daily Rollup Aggregator
//!
//! Keeps a per-day delta series next to the all-time counters. The current day
//! is open and updated in place; when the clock's date moves past it the day
//! is frozen into history and a fresh day starts. Rollover is checked lazily
//! on every mutation and every read, so no timer task is needed.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

use crate::counters::{CounterEvent, CounterSet};

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for simulating day boundaries
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// How a freshly opened day starts counting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStart {
    /// Each day is an independent delta starting at zero
    #[default]
    Zero,
    /// The new day starts from the closed day's totals
    CarryForward,
}

/// Counters for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatRecord {
    pub date: NaiveDate,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub pattern_deletes: u64,
    pub errors: u64,
    pub hit_rate: f64,
}

impl DailyStatRecord {
    fn from_counters(date: NaiveDate, counters: &CounterSet) -> Self {
        Self {
            date,
            hits: counters.hits,
            misses: counters.misses,
            sets: counters.sets,
            deletes: counters.deletes,
            pattern_deletes: counters.pattern_deletes,
            errors: counters.errors,
            hit_rate: counters.hit_rate(),
        }
    }

    /// Counter fields without the date, as served under a date key
    pub fn fields(&self) -> DailyStatFields {
        DailyStatFields {
            hits: self.hits,
            misses: self.misses,
            sets: self.sets,
            deletes: self.deletes,
            pattern_deletes: self.pattern_deletes,
            errors: self.errors,
            hit_rate: self.hit_rate,
        }
    }
}

/// A daily record keyed externally by its date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatFields {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub pattern_deletes: u64,
    pub errors: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Clone, Copy)]
struct OpenDay {
    date: NaiveDate,
    counters: CounterSet,
}

#[derive(Debug, Default)]
struct RollupState {
    open: Option<OpenDay>,
    /// Closed days, oldest first
    closed: VecDeque<DailyStatRecord>,
}

/// Day-bucketed history of counter deltas
pub struct DailyRollup {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    retention_days: usize,
    day_start: DayStart,
    state: Mutex<RollupState>,
}

impl DailyRollup {
    /// Create an aggregator
    ///
    /// `retention_days` bounds the total number of records, including the
    /// open day; it is raised to 1 if given as 0.
    pub fn new(
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
        retention_days: usize,
        day_start: DayStart,
    ) -> Self {
        Self {
            clock,
            offset,
            retention_days: retention_days.max(1),
            day_start,
            state: Mutex::new(RollupState::default()),
        }
    }

    /// UTC aggregator with the default 30-day window
    pub fn utc(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            clock,
            Utc.fix(),
            crate::config::DEFAULT_RETENTION_DAYS,
            DayStart::Zero,
        )
    }

    pub fn retention_days(&self) -> usize {
        self.retention_days
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.offset).date_naive()
    }

    /// Count one event against today's bucket
    pub(crate) fn record(&self, event: CounterEvent) {
        let today = self.today();
        let mut state = self.state.lock();
        self.roll_if_needed(&mut state, today);

        if state.open.is_none() {
            debug!(date = %today, "[Rollup] Opened day");
            state.open = Some(OpenDay {
                date: today,
                counters: CounterSet::default(),
            });
            self.evict_past_retention(&mut state);
        }
        if let Some(open) = state.open.as_mut() {
            open.counters.apply(event);
        }
    }

    /// Freeze the open day if the clock has moved past it
    fn roll_if_needed(&self, state: &mut RollupState, today: NaiveDate) {
        let Some(open) = state.open else {
            return;
        };
        // A clock stepping backwards keeps counting into the open day
        if today <= open.date {
            return;
        }

        let record = DailyStatRecord::from_counters(open.date, &open.counters);
        info!(
            date = %record.date,
            hits = record.hits,
            misses = record.misses,
            hit_rate = record.hit_rate,
            "[Rollup] Day closed"
        );
        state.closed.push_back(record);

        state.open = match self.day_start {
            DayStart::Zero => None,
            DayStart::CarryForward => Some(OpenDay {
                date: today,
                counters: open.counters,
            }),
        };

        self.evict_past_retention(state);
    }

    fn evict_past_retention(&self, state: &mut RollupState) {
        let open_slots = usize::from(state.open.is_some());
        while state.closed.len() + open_slots > self.retention_days {
            match state.closed.pop_front() {
                Some(evicted) => {
                    debug!(date = %evicted.date, "[Rollup] Evicted record past retention");
                }
                None => break,
            }
        }
    }

    /// Up to `days` records, most recent first, including the open day
    pub fn daily_stats(&self, days: usize) -> Vec<DailyStatRecord> {
        let today = self.today();
        let mut state = self.state.lock();
        self.roll_if_needed(&mut state, today);

        let limit = days.min(self.retention_days);
        let open = state
            .open
            .map(|day| DailyStatRecord::from_counters(day.date, &day.counters));

        open.into_iter()
            .chain(state.closed.iter().rev().copied())
            .take(limit)
            .collect()
    }

    /// Counters accumulated so far today, if anything happened today
    pub fn today_stats(&self) -> Option<DailyStatRecord> {
        let today = self.today();
        let mut state = self.state.lock();
        self.roll_if_needed(&mut state, today);

        state
            .open
            .filter(|day| day.date == today)
            .map(|day| DailyStatRecord::from_counters(day.date, &day.counters))
    }

    /// Drop all history; used together with `CounterStore::reset`
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.open = None;
        state.closed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn clock_at(y: i32, m: u32, d: u32, h: u32) -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
        ))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Hands out the queued instants in order, then repeats the last one
    struct SteppingClock(Mutex<VecDeque<DateTime<Utc>>>);

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut ticks = self.0.lock();
            if ticks.len() > 1 {
                ticks.pop_front().unwrap()
            } else {
                *ticks.front().unwrap()
            }
        }
    }

    #[test]
    fn test_today_stats_reads_clock_once() {
        let before = Utc.with_ymd_and_hms(2025, 1, 1, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 1).unwrap();
        let clock = Arc::new(SteppingClock(Mutex::new(VecDeque::from([before, before, after]))));
        let rollup = DailyRollup::utc(clock);

        rollup.record(CounterEvent::Hit);
        let today = rollup.today_stats().unwrap();
        assert_eq!(today.date, date(2025, 1, 1));
        assert_eq!(today.hits, 1);
    }

    #[test]
    fn test_fresh_rollup_is_empty() {
        let rollup = DailyRollup::utc(clock_at(2025, 1, 1, 12));
        assert!(rollup.daily_stats(30).is_empty());
        assert!(rollup.today_stats().is_none());
    }

    #[test]
    fn test_open_day_updates_in_place() {
        let clock = clock_at(2025, 1, 1, 9);
        let rollup = DailyRollup::utc(clock.clone());
        rollup.record(CounterEvent::Hit);
        rollup.record(CounterEvent::Miss);
        clock.advance(Duration::hours(3));
        rollup.record(CounterEvent::Hit);

        let stats = rollup.daily_stats(30);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].date, date(2025, 1, 1));
        assert_eq!(stats[0].hits, 2);
        assert_eq!(stats[0].misses, 1);
    }

    #[test]
    fn test_rollover_freezes_previous_day() {
        let clock = clock_at(2025, 1, 1, 23);
        let rollup = DailyRollup::utc(clock.clone());
        for _ in 0..3 {
            rollup.record(CounterEvent::Hit);
        }
        rollup.record(CounterEvent::Miss);

        clock.advance(Duration::hours(2));
        rollup.record(CounterEvent::Miss);

        let stats = rollup.daily_stats(30);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].date, date(2025, 1, 2));
        assert_eq!(stats[0].hits, 0);
        assert_eq!(stats[0].misses, 1);
        assert_eq!(stats[1].date, date(2025, 1, 1));
        assert_eq!(stats[1].hits, 3);
        assert_eq!(stats[1].misses, 1);
        assert!((stats[1].hit_rate - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_rollover_on_read_without_new_traffic() {
        let clock = clock_at(2025, 3, 10, 8);
        let rollup = DailyRollup::utc(clock.clone());
        rollup.record(CounterEvent::Set);
        clock.advance(Duration::days(1));

        let stats = rollup.daily_stats(30);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].date, date(2025, 3, 10));
        assert_eq!(stats[0].sets, 1);
        assert!(rollup.today_stats().is_none());
    }

    #[test]
    fn test_retention_evicts_oldest() {
        let clock = clock_at(2025, 1, 1, 12);
        let rollup = DailyRollup::new(
            clock.clone(),
            FixedOffset::east_opt(0).unwrap(),
            3,
            DayStart::Zero,
        );
        for _ in 0..5 {
            rollup.record(CounterEvent::Hit);
            clock.advance(Duration::days(1));
        }
        let stats = rollup.daily_stats(30);
        let dates: Vec<_> = stats.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![date(2025, 1, 5), date(2025, 1, 4), date(2025, 1, 3)]
        );
    }

    #[test]
    fn test_days_argument_clamps() {
        let clock = clock_at(2025, 1, 1, 12);
        let rollup = DailyRollup::utc(clock.clone());
        for _ in 0..4 {
            rollup.record(CounterEvent::Miss);
            clock.advance(Duration::days(1));
        }
        assert_eq!(rollup.daily_stats(2).len(), 2);
        assert_eq!(rollup.daily_stats(0).len(), 0);
        assert_eq!(rollup.daily_stats(usize::MAX).len(), 4);
    }

    #[test]
    fn test_carry_forward_seeds_new_day() {
        let clock = clock_at(2025, 1, 1, 12);
        let rollup = DailyRollup::new(
            clock.clone(),
            FixedOffset::east_opt(0).unwrap(),
            30,
            DayStart::CarryForward,
        );
        rollup.record(CounterEvent::Hit);
        rollup.record(CounterEvent::Hit);
        clock.advance(Duration::days(1));
        rollup.record(CounterEvent::Miss);

        let stats = rollup.daily_stats(30);
        assert_eq!(stats[0].date, date(2025, 1, 2));
        assert_eq!(stats[0].hits, 2);
        assert_eq!(stats[0].misses, 1);
        assert_eq!(stats[1].hits, 2);
        assert_eq!(stats[1].misses, 0);
    }

    #[test]
    fn test_timezone_offset_moves_boundary() {
        // 2025-01-01 22:00 UTC is already 2025-01-02 in UTC+3
        let clock = clock_at(2025, 1, 1, 22);
        let rollup = DailyRollup::new(
            clock,
            FixedOffset::east_opt(3 * 3600).unwrap(),
            30,
            DayStart::Zero,
        );
        rollup.record(CounterEvent::Hit);
        assert_eq!(rollup.daily_stats(1)[0].date, date(2025, 1, 2));
    }

    #[test]
    fn test_clock_moving_backwards_keeps_open_day() {
        let clock = clock_at(2025, 1, 2, 1);
        let rollup = DailyRollup::utc(clock.clone());
        rollup.record(CounterEvent::Hit);
        clock.set(Utc.with_ymd_and_hms(2025, 1, 1, 23, 0, 0).unwrap());
        rollup.record(CounterEvent::Hit);

        let stats = rollup.daily_stats(30);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].date, date(2025, 1, 2));
        assert_eq!(stats[0].hits, 2);
    }
}
