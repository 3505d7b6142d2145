//! An in-process key-value cache whose eviction and expiration behaviour is
//! composed from pluggable policies.
//!
//! # Features
//! - **Pluggable storage**: entries live in a [`Backend`]; the default
//!   [`ArenaBackend`] keeps them in a generational arena.
//! - **Segmented LRU**: a scan-resistant eviction policy with O(1) operations.
//! - **Proactive expiration**: per-entry TTLs reclaimed by a collector that
//!   scans the backend in bounded batches and goes idle when nothing expires.
//! - **DELETE events**: listeners learn about every removal and its reason.
//! - **Observability**: counters for hits, misses and evictions.
//! - **Configuration**: optional `serde` feature for YAML configuration.
//!
//! ```
//! use std::time::Duration;
//! use tessel_cache::{Cache, CollectorConfig, SetOptions};
//!
//! let cache = Cache::builder()
//!   .segmented_lru(1_000, 0.8)
//!   .proactive_expiration(CollectorConfig::default())
//!   .build()
//!   .unwrap();
//!
//! cache.set_with("session", 42, SetOptions::new().expires_after(Duration::from_secs(30)));
//! assert_eq!(cache.get(&"session").as_deref(), Some(&42));
//! ```

// Public modules that form the API
pub mod backend;
pub mod builder;
pub mod error;
pub mod handles;
pub mod listener;
pub mod metrics;
pub mod options;
pub mod policy;
pub mod runtime;

#[cfg(feature = "serde")]
pub mod config;

// Internal, crate-only modules
mod entry;
mod shared;
mod task;
mod time;

// Re-export the primary user-facing types for convenience
pub use backend::{ArenaBackend, Backend, Cursor, ScanStep};
pub use builder::CacheBuilder;
pub use entry::{CacheEntry, EntryId, Segment, SegmentLinks};
pub use error::BuildError;
pub use handles::Cache;
pub use listener::{EvictionListener, EvictionReason, ListenerId};
pub use metrics::MetricsSnapshot;
pub use options::{Expiration, SetOptions, INFINITE_EXPIRATION};
pub use policy::expiration::ProactiveExpiration;
pub use policy::slru::SegmentedLru;
pub use policy::{CachePolicy, DeleteRequest, Deleter, PolicyContext, PolicyKind, TickControl};
pub use runtime::{ScheduledTick, Scheduler};
pub use task::collector::{CollectorConfig, IntervalCollector, ScanStats};

#[cfg(feature = "serde")]
pub use config::{CacheConfig, ConfigError};
