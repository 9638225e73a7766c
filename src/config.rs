//! Configuration
//!
//! Plain structs with sensible defaults. `AnalyticsConfig::from_env` applies
//! environment overrides on top of the defaults; unparsable values are logged
//! and ignored.

use chrono::{FixedOffset, Offset, Utc};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

use crate::rollup::DayStart;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_RETENTION_DAYS: usize = 30;
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_INVALIDATION_BATCH_SIZE: usize = 100;
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Which backing store to instrument
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process `DashMap` store
    #[default]
    InMemory,
    /// Redis at `redis_url`
    Remote,
}

impl BackendKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" | "inmemory" => Some(Self::InMemory),
            "redis" | "remote" => Some(Self::Remote),
            _ => None,
        }
    }
}

/// Settings for the whole analytics layer
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub backend: BackendKind,
    /// Used when `backend` is `Remote`
    pub redis_url: String,
    /// Number of daily records kept, including today
    pub retention_days: usize,
    /// Offset from UTC, in seconds, defining where a day starts
    pub utc_offset_seconds: i32,
    pub day_start: DayStart,
    /// Upper bound for every backing-store call
    pub operation_timeout: Duration,
    /// Keys deleted per backend call during pattern invalidation
    pub invalidation_batch_size: usize,
    /// Address the HTTP API binds to
    pub listen_addr: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::InMemory,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            retention_days: DEFAULT_RETENTION_DAYS,
            utc_offset_seconds: 0,
            day_start: DayStart::Zero,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            invalidation_batch_size: DEFAULT_INVALIDATION_BATCH_SIZE,
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
        }
    }
}

impl AnalyticsConfig {
    /// Defaults overridden by environment variables
    ///
    /// | variable | field |
    /// |---|---|
    /// | `CACHE_BACKEND` | `backend` (`memory` or `redis`) |
    /// | `REDIS_URL` | `redis_url` |
    /// | `CACHE_ANALYTICS_RETENTION_DAYS` | `retention_days` |
    /// | `CACHE_ANALYTICS_UTC_OFFSET` | `utc_offset_seconds` |
    /// | `CACHE_ANALYTICS_TIMEOUT_MS` | `operation_timeout` |
    /// | `CACHE_ANALYTICS_ADDR` | `listen_addr` |
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("CACHE_BACKEND") {
            match BackendKind::parse(&value) {
                Some(kind) => config.backend = kind,
                None => warn!(value = %value, "Ignoring unknown CACHE_BACKEND"),
            }
        }
        if let Some(url) = lookup("REDIS_URL") {
            config.redis_url = url;
        }
        if let Some(days) = parse_var(&lookup, "CACHE_ANALYTICS_RETENTION_DAYS") {
            config.retention_days = days;
        }
        if let Some(offset) = parse_var(&lookup, "CACHE_ANALYTICS_UTC_OFFSET") {
            config.utc_offset_seconds = offset;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "CACHE_ANALYTICS_TIMEOUT_MS") {
            config.operation_timeout = Duration::from_millis(ms);
        }
        if let Some(addr) = lookup("CACHE_ANALYTICS_ADDR") {
            config.listen_addr = addr;
        }

        config
    }

    /// Day-boundary offset; out-of-range values fall back to UTC
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_seconds).unwrap_or_else(|| {
            warn!(
                offset = self.utc_offset_seconds,
                "UTC offset out of range, using UTC"
            );
            Utc.fix()
        })
    }

    /// Parsed listen address
    ///
    /// # Errors
    ///
    /// Returns an error if `listen_addr` is not a socket address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address '{}': {e}", self.listen_addr))
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = %name, value = %raw, "Ignoring unparsable environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.backend, BackendKind::InMemory);
        assert_eq!(config.retention_days, 30);
        assert_eq!(config.utc_offset_seconds, 0);
        assert_eq!(config.day_start, DayStart::Zero);
        assert_eq!(config.invalidation_batch_size, 100);
        assert_eq!(config.utc_offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_overrides() {
        let config = AnalyticsConfig::from_lookup(lookup_from(&[
            ("CACHE_BACKEND", "redis"),
            ("REDIS_URL", "redis://cache:6379"),
            ("CACHE_ANALYTICS_RETENTION_DAYS", "7"),
            ("CACHE_ANALYTICS_UTC_OFFSET", "-18000"),
            ("CACHE_ANALYTICS_TIMEOUT_MS", "250"),
            ("CACHE_ANALYTICS_ADDR", "127.0.0.1:9000"),
        ]));
        assert_eq!(config.backend, BackendKind::Remote);
        assert_eq!(config.redis_url, "redis://cache:6379");
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.utc_offset().local_minus_utc(), -18000);
        assert_eq!(config.operation_timeout, Duration::from_millis(250));
        assert_eq!(config.socket_addr().unwrap().port(), 9000);
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = AnalyticsConfig::from_lookup(lookup_from(&[
            ("CACHE_BACKEND", "memcached"),
            ("CACHE_ANALYTICS_RETENTION_DAYS", "lots"),
            ("CACHE_ANALYTICS_UTC_OFFSET", "999999"),
        ]));
        assert_eq!(config.backend, BackendKind::InMemory);
        assert_eq!(config.retention_days, 30);
        assert_eq!(config.utc_offset().local_minus_utc(), 0);
    }
}
