//! Backing Store Implementations
//!
//! # Available Backends
//!
//! - **`InMemoryBackend`** - In-process `DashMap` store (default)
//! - **`RemoteBackend`** - Redis store (feature: `redis`)
//! - **`FaultInjectingBackend`** - Decorator adding latency/failures, for tests
//!
//! # Usage
//!
//! ```rust
//! use cache_analytics::backends::InMemoryBackend;
//!
//! let local = InMemoryBackend::new();
//! assert!(local.is_empty());
//! ```
//!
//! With the `redis` feature:
//!
//! ```rust,ignore
//! use cache_analytics::backends::RemoteBackend;
//!
//! let remote = RemoteBackend::with_url("redis://127.0.0.1:6379").await?;
//! ```

pub mod fault;
pub mod in_memory;

#[cfg(feature = "redis")]
pub mod redis_cache;

pub use fault::{FaultConfig, FaultInjectingBackend};
pub use in_memory::InMemoryBackend;

#[cfg(feature = "redis")]
pub use redis_cache::RemoteBackend;
