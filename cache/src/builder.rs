use crate::backend::{ArenaBackend, Backend};
use crate::error::BuildError;
use crate::handles::Cache;
use crate::listener::EvictionListener;
use crate::policy::expiration::ProactiveExpiration;
use crate::policy::slru::SegmentedLru;
use crate::policy::CachePolicy;
use crate::runtime::Scheduler;
use crate::shared::CacheShared;
use crate::task::collector::CollectorConfig;

use core::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use crate::config::CacheConfig;

/// The protected share used when none is given.
pub const DEFAULT_PROTECTED_RATIO: f64 = 0.8;

// Policies are resolved at build time so that configuration errors surface
// from `build()`, in registration order.
enum PolicySlot<K, V> {
  SegmentedLru { capacity: usize, protected_ratio: f64 },
  Expiration(CollectorConfig),
  Custom(Box<dyn CachePolicy<K, V>>),
}

impl<K, V> PolicySlot<K, V> {
  fn resolve(self) -> Result<Box<dyn CachePolicy<K, V>>, BuildError> {
    Ok(match self {
      PolicySlot::SegmentedLru {
        capacity,
        protected_ratio,
      } => Box::new(SegmentedLru::new(capacity, protected_ratio)?),
      PolicySlot::Expiration(config) => Box::new(ProactiveExpiration::new(config)?),
      PolicySlot::Custom(policy) => policy,
    })
  }

  fn name(&self) -> &'static str {
    match self {
      PolicySlot::SegmentedLru { .. } => "segmented_lru",
      PolicySlot::Expiration(_) => "proactive_expiration",
      PolicySlot::Custom(_) => "custom",
    }
  }
}

/// A builder for [`Cache`] instances.
///
/// Policies receive notifications in the order they were added.
pub struct CacheBuilder<K, V, B = ArenaBackend<K, V>> {
  backend: B,
  policies: Vec<PolicySlot<K, V>>,
  scheduler: Scheduler,
  listeners: Vec<Arc<dyn EvictionListener<K, V>>>,
}

impl<K, V, B> fmt::Debug for CacheBuilder<K, V, B> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let policies: Vec<_> = self.policies.iter().map(PolicySlot::name).collect();
    f.debug_struct("CacheBuilder")
      .field("policies", &policies)
      .field("scheduler", &self.scheduler)
      .field("listeners", &self.listeners.len())
      .finish_non_exhaustive()
  }
}

impl<K, V> CacheBuilder<K, V> {
  pub fn new() -> Self {
    Self {
      backend: ArenaBackend::new(),
      policies: Vec::new(),
      scheduler: Scheduler::default(),
      listeners: Vec::new(),
    }
  }

  /// A builder configured from a [`CacheConfig`]: a Segmented-LRU policy when
  /// `capacity` is set, then proactive expiration when `expiration` is set.
  #[cfg(feature = "serde")]
  pub fn from_config(config: &CacheConfig) -> Result<Self, BuildError> {
    Self::new().with_config(config)
  }
}

impl<K, V> Default for CacheBuilder<K, V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V, B> CacheBuilder<K, V, B> {
  /// Replaces the storage backend.
  pub fn backend<B2>(self, backend: B2) -> CacheBuilder<K, V, B2> {
    CacheBuilder {
      backend,
      policies: self.policies,
      scheduler: self.scheduler,
      listeners: self.listeners,
    }
  }

  /// Bounds the cache to `capacity` entries with a Segmented-LRU policy.
  pub fn segmented_lru(mut self, capacity: usize, protected_ratio: f64) -> Self {
    self.policies.push(PolicySlot::SegmentedLru {
      capacity,
      protected_ratio,
    });
    self
  }

  /// Shorthand for [`segmented_lru`](Self::segmented_lru) with the default
  /// protected ratio.
  pub fn capacity(self, capacity: usize) -> Self {
    self.segmented_lru(capacity, DEFAULT_PROTECTED_RATIO)
  }

  /// Enables per-entry TTLs, reclaimed by a background collector.
  pub fn proactive_expiration(mut self, config: CollectorConfig) -> Self {
    self.policies.push(PolicySlot::Expiration(config));
    self
  }

  /// Registers a user-defined policy.
  pub fn policy<P>(mut self, policy: P) -> Self
  where
    P: CachePolicy<K, V> + 'static,
  {
    self.policies.push(PolicySlot::Custom(Box::new(policy)));
    self
  }

  /// Chooses where policy timers run. Defaults to [`Scheduler::Thread`].
  pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
    self.scheduler = scheduler;
    self
  }

  /// Subscribes a listener to DELETE events from the moment the cache exists.
  pub fn eviction_listener<L>(mut self, listener: L) -> Self
  where
    L: EvictionListener<K, V> + 'static,
  {
    self.listeners.push(Arc::new(listener));
    self
  }

  /// Adds the policies described by `config`.
  #[cfg(feature = "serde")]
  pub fn with_config(mut self, config: &CacheConfig) -> Result<Self, BuildError> {
    if let Some(capacity) = config.capacity {
      let capacity = usize::try_from(capacity)
        .map_err(|_| BuildError::Config(format!("capacity {capacity} does not fit in memory")))?;
      self = self.segmented_lru(capacity, config.protected_ratio);
    }
    if let Some(expiration) = &config.expiration {
      self = self.proactive_expiration(CollectorConfig::from(expiration));
    }
    Ok(self)
  }

  /// Validates every policy and builds the cache.
  pub fn build(self) -> Result<Cache<K, V, B>, BuildError>
  where
    K: Send + 'static,
    V: Send + Sync + 'static,
    B: Backend<K, V> + 'static,
  {
    let policies = self
      .policies
      .into_iter()
      .map(PolicySlot::resolve)
      .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(policies = policies.len(), scheduler = ?self.scheduler, "building cache");

    let shared = CacheShared::new(self.backend, policies, self.scheduler, self.listeners);
    Ok(Cache { shared })
  }
}
