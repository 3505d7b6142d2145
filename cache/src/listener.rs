use std::fmt;
use std::sync::Arc;

/// Describes the reason an entry was removed from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EvictionReason {
  /// The entry was removed due to exceeding the cache's capacity.
  Capacity,
  /// The entry was removed because its time-to-live expired.
  Expired,
  /// The entry was removed by an explicit `delete`.
  Deleted,
}

impl fmt::Display for EvictionReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EvictionReason::Capacity => write!(f, "evicted due to capacity"),
      EvictionReason::Expired => write!(f, "evicted due to expiration"),
      EvictionReason::Deleted => write!(f, "explicitly deleted"),
    }
  }
}

/// A listener that can be registered with the cache to receive DELETE
/// events.
///
/// `on_evict` runs synchronously on the thread that removed the entry,
/// after the cache has released its internal lock, so a listener may call
/// back into the cache. A panicking listener is logged and skipped.
pub trait EvictionListener<K, V>: Send + Sync {
  fn on_evict(&self, key: &K, value: &Arc<V>, reason: EvictionReason);
}

impl<K, V, F> EvictionListener<K, V> for F
where
  F: Fn(&K, &Arc<V>, EvictionReason) + Send + Sync,
{
  fn on_evict(&self, key: &K, value: &Arc<V>, reason: EvictionReason) {
    self(key, value, reason)
  }
}

/// Identifies a subscription made with [`Cache::subscribe`](crate::Cache::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);
