use crate::backend::{ArenaBackend, Backend};
use crate::builder::CacheBuilder;
use crate::entry::Segment;
use crate::listener::{EvictionListener, ListenerId};
use crate::metrics::MetricsSnapshot;
use crate::options::SetOptions;
use crate::shared::CacheShared;

use std::fmt;
use std::sync::Arc;

/// A thread-safe cache that delegates eviction and expiration decisions to
/// the policies it was built with.
///
/// `Cache` is a cheap handle: clones share the same entries. Every
/// operation runs to completion under one internal lock, and DELETE events
/// are delivered after that lock is released.
pub struct Cache<K, V, B = ArenaBackend<K, V>> {
  pub(crate) shared: Arc<CacheShared<K, V, B>>,
}

impl<K, V, B> Clone for Cache<K, V, B> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<K, V, B> fmt::Debug for Cache<K, V, B> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Cache").field("shared", &self.shared).finish()
  }
}

impl<K, V> Cache<K, V>
where
  K: Eq + std::hash::Hash + Clone + Send + 'static,
  V: Send + Sync + 'static,
{
  /// Starts configuring a cache backed by the default [`ArenaBackend`].
  pub fn builder() -> CacheBuilder<K, V> {
    CacheBuilder::new()
  }
}

impl<K, V, B> Cache<K, V, B>
where
  K: Send + 'static,
  V: Send + Sync + 'static,
  B: Backend<K, V> + 'static,
{
  /// Stores `value` under `key` with no expiration preference.
  ///
  /// On a new key every policy sees `on_set`; on an existing key they see
  /// `on_update` and any existing deadline is kept.
  pub fn set(&self, key: K, value: V) {
    self.shared.set(key, Arc::new(value), &SetOptions::default());
  }

  pub fn set_with(&self, key: K, value: V, options: SetOptions) {
    self.shared.set(key, Arc::new(value), &options);
  }

  /// Stores an already shared value.
  pub fn set_arc(&self, key: K, value: Arc<V>, options: SetOptions) {
    self.shared.set(key, value, &options);
  }

  /// Retrieves a value and records the access with the eviction policies.
  ///
  /// An entry whose deadline has passed is removed on the spot and reported
  /// as a miss.
  pub fn get(&self, key: &K) -> Option<Arc<V>> {
    self.shared.get(key)
  }

  /// Like [`get`](Self::get), but leaves recency and metrics untouched.
  pub fn peek(&self, key: &K) -> Option<Arc<V>> {
    self.shared.peek(key)
  }

  pub fn has(&self, key: &K) -> bool {
    self.shared.has(key)
  }

  /// Removes `key`, returning `true` if a live entry was removed.
  pub fn delete(&self, key: &K) -> bool {
    self.shared.delete(key)
  }

  /// Drops every entry and stops the expiration timer. No DELETE events are
  /// emitted.
  pub fn clear(&self) {
    self.shared.clear();
  }

  /// The number of stored entries, including expired ones the collector has
  /// not reached yet.
  pub fn len(&self) -> usize {
    self.shared.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// True when no expiration policy has a running timer.
  pub fn is_expiration_idle(&self) -> bool {
    self.shared.is_expiration_idle()
  }

  /// The Segmented-LRU segment holding `key`, if it is tracked.
  pub fn segment_of(&self, key: &K) -> Option<Segment> {
    self.shared.segment_of(key)
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }

  /// Registers a listener for DELETE events.
  pub fn subscribe<L>(&self, listener: L) -> ListenerId
  where
    L: EvictionListener<K, V> + 'static,
  {
    self.shared.subscribe(Arc::new(listener))
  }

  pub fn unsubscribe(&self, id: ListenerId) -> bool {
    self.shared.unsubscribe(id)
  }
}
