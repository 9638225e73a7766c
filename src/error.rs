//! Error taxonomy for the analytics layer
//!
//! A cache miss is not an error: it is `Ok(None)` from
//! [`CacheAccessor::get`](crate::CacheAccessor::get). Everything below is a
//! failed operation and has already been counted in the `errors` counter by
//! the time the caller sees it.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Kind of operation that failed, carried in errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Set,
    Delete,
    PatternDelete,
    Scan,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Delete => "delete",
            Self::PatternDelete => "pattern_delete",
            Self::Scan => "scan",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the accessor and the invalidation controller
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backing store unreachable or returned an error
    #[error("cache unavailable during {operation} on '{target}': {source}")]
    Unavailable {
        operation: Operation,
        target: String,
        #[source]
        source: anyhow::Error,
    },

    /// Backing store did not answer within the operation timeout
    #[error("cache {operation} on '{target}' timed out after {after:?}")]
    Timeout {
        operation: Operation,
        target: String,
        after: Duration,
    },

    /// Malformed glob pattern, rejected before any scan
    #[error("invalid key pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Keys matched but some of them could not be deleted
    #[error("pattern '{pattern}' partially invalidated: {removed} removed, {failed} failed")]
    PartialInvalidation {
        pattern: String,
        removed: usize,
        failed: usize,
    },

    /// Stored value could not be encoded or decoded as JSON
    #[error("failed to (de)serialize value for '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    /// `true` for conditions where the store could not be reached at all
    ///
    /// Callers usually degrade on these instead of recomputing.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }

    /// Operation the error belongs to, if it maps to a single one
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Unavailable { operation, .. } | Self::Timeout { operation, .. } => {
                Some(*operation)
            }
            Self::InvalidPattern { .. } | Self::PartialInvalidation { .. } => {
                Some(Operation::PatternDelete)
            }
            Self::Serialization { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
