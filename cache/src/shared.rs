use crate::backend::Backend;
use crate::entry::{EntryId, Segment};
use crate::listener::{EvictionListener, EvictionReason, ListenerId};
use crate::metrics::Metrics;
use crate::options::SetOptions;
use crate::policy::{CachePolicy, DeleteRequest, Deleter, PolicyContext, PolicyKind, TickControl, TickSink, TimerTarget};
use crate::runtime::Scheduler;
use crate::time;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{trace, warn};

/// An entry that left the cache, waiting to be announced to listeners.
pub(crate) type Removed<K, V> = (K, Arc<V>, EvictionReason);

type Listeners<K, V> = Vec<(ListenerId, Arc<dyn EvictionListener<K, V>>)>;

/// Everything that must change together: the storage and the policies that
/// keep metadata on it.
pub(crate) struct CacheCore<K, V, B> {
  pub(crate) backend: B,
  pub(crate) policies: Vec<Box<dyn CachePolicy<K, V>>>,
}

impl<K, V, B> CacheCore<K, V, B>
where
  B: Backend<K, V>,
{
  /// Removes `id` from every policy and then from the backend.
  fn remove_entry(&mut self, id: EntryId, reason: EvictionReason, metrics: &Metrics, removed: &mut Vec<Removed<K, V>>) -> bool {
    if self.backend.entry(id).is_none() {
      return false;
    }
    for policy in self.policies.iter_mut() {
      policy.on_delete(&mut self.backend, id);
    }
    match self.backend.delete(id) {
      Some(entry) => {
        metrics.record_removal(reason);
        removed.push((entry.key, entry.value, reason));
        true
      }
      None => false,
    }
  }

  /// Carries out every deletion the policies have requested so far,
  /// including any requested while doing so.
  fn drain(&mut self, deleter: &Deleter, metrics: &Metrics, removed: &mut Vec<Removed<K, V>>) {
    while let Some(DeleteRequest { id, reason }) = deleter.take() {
      if self.remove_entry(id, reason, metrics, removed) && reason == EvictionReason::Capacity {
        trace!(?id, "capacity eviction applied");
      }
    }
  }

  fn expired_id(&self, key: &K, now: std::time::Duration) -> Option<EntryId> {
    let id = self.backend.get(key)?;
    self.backend.entry(id).filter(|entry| entry.is_expired_at(now)).map(|_| id)
  }

  fn live_id(&self, key: &K) -> Option<EntryId> {
    let id = self.backend.get(key)?;
    let entry = self.backend.entry(id)?;
    (!entry.is_expired_at(time::now_duration())).then_some(id)
  }
}

/// The internal, thread-safe core of the cache.
pub(crate) struct CacheShared<K, V, B> {
  core: Mutex<CacheCore<K, V, B>>,
  deleter: Deleter,
  pub(crate) metrics: Metrics,
  listeners: RwLock<Listeners<K, V>>,
  next_listener: AtomicU64,
}

impl<K, V, B> fmt::Debug for CacheShared<K, V, B> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheShared")
      .field("deleter", &self.deleter)
      .field("listeners", &self.listeners.read().len())
      .field("metrics", &self.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<K, V, B> CacheShared<K, V, B>
where
  K: Send + 'static,
  V: Send + Sync + 'static,
  B: Backend<K, V> + 'static,
{
  /// Wires the policies to a fresh deleter and to timers that point back at
  /// this cache through a weak reference.
  pub(crate) fn new(
    backend: B,
    mut policies: Vec<Box<dyn CachePolicy<K, V>>>,
    scheduler: Scheduler,
    listeners: Vec<Arc<dyn EvictionListener<K, V>>>,
  ) -> Arc<Self> {
    let deleter = Deleter::new();
    let listeners: Listeners<K, V> = listeners
      .into_iter()
      .enumerate()
      .map(|(n, listener)| (ListenerId(n as u64), listener))
      .collect();
    let next_listener = AtomicU64::new(listeners.len() as u64);

    let runtime = scheduler.runtime();
    Arc::new_cyclic(|weak: &Weak<Self>| {
      let sink: Weak<dyn TickSink> = weak.clone();
      for (slot, policy) in policies.iter_mut().enumerate() {
        let timer = TimerTarget {
          sink: sink.clone(),
          slot,
          runtime: runtime.clone(),
        };
        policy.attach(PolicyContext::new(deleter.clone(), timer));
      }
      Self {
        core: Mutex::new(CacheCore { backend, policies }),
        deleter,
        metrics: Metrics::new(),
        listeners: RwLock::new(listeners),
        next_listener,
      }
    })
  }

  pub(crate) fn set(&self, key: K, value: Arc<V>, options: &SetOptions) {
    let mut removed = Vec::new();
    {
      let mut guard = self.core.lock();
      let core = &mut *guard;

      // A lingering expired entry is replaced, not updated.
      if let Some(stale) = core.expired_id(&key, time::now_duration()) {
        core.remove_entry(stale, EvictionReason::Expired, &self.metrics, &mut removed);
      }

      let existing = core.backend.get(&key).is_some();
      let id = core.backend.set(key, value);
      if existing {
        self.metrics.record_update();
      } else {
        self.metrics.record_insert();
      }

      for slot in 0..core.policies.len() {
        let policy = &mut core.policies[slot];
        if existing {
          policy.on_update(&mut core.backend, id, options);
        } else {
          policy.on_set(&mut core.backend, id, options);
        }
        core.drain(&self.deleter, &self.metrics, &mut removed);
      }
    }
    self.notify(removed);
  }

  pub(crate) fn get(&self, key: &K) -> Option<Arc<V>> {
    let mut removed = Vec::new();
    let value = {
      let mut guard = self.core.lock();
      let core = &mut *guard;
      match core.backend.get(key) {
        None => None,
        Some(id) => match core.backend.entry(id) {
          Some(entry) if entry.is_expired_at(time::now_duration()) => {
            core.remove_entry(id, EvictionReason::Expired, &self.metrics, &mut removed);
            None
          }
          Some(entry) => {
            let value = entry.value();
            for slot in 0..core.policies.len() {
              let policy = &mut core.policies[slot];
              if policy.kind() == PolicyKind::Eviction {
                policy.on_hit(&mut core.backend, id);
                core.drain(&self.deleter, &self.metrics, &mut removed);
              }
            }
            Some(value)
          }
          None => None,
        },
      }
    };

    if value.is_some() {
      self.metrics.record_hit();
    } else {
      self.metrics.record_miss();
    }
    self.notify(removed);
    value
  }

  pub(crate) fn peek(&self, key: &K) -> Option<Arc<V>> {
    let core = self.core.lock();
    let id = core.live_id(key)?;
    core.backend.entry(id).map(|entry| entry.value())
  }

  pub(crate) fn has(&self, key: &K) -> bool {
    self.core.lock().live_id(key).is_some()
  }

  /// Returns true if a live entry was removed. An entry that has already
  /// expired is reclaimed as expired and reported as absent.
  pub(crate) fn delete(&self, key: &K) -> bool {
    let mut removed = Vec::new();
    let deleted = {
      let mut guard = self.core.lock();
      let core = &mut *guard;
      match core.backend.get(key) {
        None => false,
        Some(id) => {
          let expired = core
            .backend
            .entry(id)
            .is_some_and(|entry| entry.is_expired_at(time::now_duration()));
          let reason = if expired {
            EvictionReason::Expired
          } else {
            EvictionReason::Deleted
          };
          core.remove_entry(id, reason, &self.metrics, &mut removed) && !expired
        }
      }
    };
    self.notify(removed);
    deleted
  }

  pub(crate) fn clear(&self) {
    let mut guard = self.core.lock();
    let core = &mut *guard;
    for policy in core.policies.iter_mut() {
      policy.on_clear();
    }
    core.backend.clear();
    self.deleter.discard();
    self.metrics.record_clear();
  }

  pub(crate) fn len(&self) -> usize {
    self.core.lock().backend.len()
  }

  pub(crate) fn is_expiration_idle(&self) -> bool {
    self
      .core
      .lock()
      .policies
      .iter()
      .filter(|policy| policy.kind() == PolicyKind::Expiration)
      .all(|policy| policy.is_idle())
  }

  pub(crate) fn segment_of(&self, key: &K) -> Option<Segment> {
    let core = self.core.lock();
    let id = core.backend.get(key)?;
    core.backend.entry(id)?.segment()
  }

  pub(crate) fn subscribe(&self, listener: Arc<dyn EvictionListener<K, V>>) -> ListenerId {
    let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
    self.listeners.write().push((id, listener));
    id
  }

  pub(crate) fn unsubscribe(&self, id: ListenerId) -> bool {
    let mut listeners = self.listeners.write();
    let before = listeners.len();
    listeners.retain(|(existing, _)| *existing != id);
    listeners.len() != before
  }

  /// Announces removals in order. Must be called without holding the core
  /// lock, so listeners may use the cache.
  fn notify(&self, removed: Vec<Removed<K, V>>) {
    if removed.is_empty() {
      return;
    }
    let listeners = self.listeners.read().clone();
    for (key, value, reason) in &removed {
      for (id, listener) in &listeners {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_evict(key, value, *reason)));
        if outcome.is_err() {
          warn!(listener = ?id, %reason, "eviction listener panicked");
        }
      }
    }
  }
}

impl<K, V, B> TickSink for CacheShared<K, V, B>
where
  K: Send + 'static,
  V: Send + Sync + 'static,
  B: Backend<K, V> + 'static,
{
  fn run_tick(&self, slot: usize, generation: u64) -> TickControl {
    let mut removed = Vec::new();
    let control = {
      let mut guard = self.core.lock();
      let core = &mut *guard;
      let Some(policy) = core.policies.get_mut(slot) else {
        return TickControl::Stop;
      };
      let backend = &core.backend;
      let outcome = panic::catch_unwind(AssertUnwindSafe(|| policy.tick(backend, generation)));

      match outcome {
        Ok(control) => {
          core.drain(&self.deleter, &self.metrics, &mut removed);
          if core.policies[slot].is_idle() {
            TickControl::Stop
          } else {
            control
          }
        }
        Err(_) => {
          warn!(slot, generation, "policy tick panicked; stopping its timer");
          core.policies[slot].stop_timer();
          self.deleter.discard();
          TickControl::Stop
        }
      }
    };
    self.notify(removed);
    control
  }
}
