pub mod deleter;
pub mod expiration;
pub(crate) mod segment_list;
pub mod slru;

pub use deleter::{DeleteRequest, Deleter};

use crate::backend::Backend;
use crate::entry::EntryId;
use crate::options::SetOptions;
use crate::runtime::{ScheduledTick, TimerRuntime};

use std::fmt;
use std::sync::Weak;
use std::time::Duration;

/// Which lifecycle events a policy cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
  /// Bounds the cache by discarding entries; receives `on_hit`.
  Eviction,
  /// Reclaims time-expired entries; reads bypass it.
  Expiration,
}

/// What a scheduled timer should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
  Continue,
  Stop,
}

/// A policy plugged into a [`Cache`](crate::Cache).
///
/// The cache calls these hooks synchronously, in registration order, while
/// it holds exclusive access to the backend. Policies keep their state in
/// the entry's policy fields and in their own structures, and may remove an
/// entry only through the [`Deleter`] they receive in [`attach`](Self::attach).
pub trait CachePolicy<K, V>: Send {
  fn kind(&self) -> PolicyKind;

  /// Called once when the policy is registered with a cache.
  fn attach(&mut self, context: PolicyContext) {
    let _ = context;
  }

  /// A new entry was inserted.
  fn on_set(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId, options: &SetOptions);

  /// An existing entry received a new value.
  fn on_update(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId, options: &SetOptions) {
    let _ = (backend, id, options);
  }

  /// An entry was read. Only delivered to [`PolicyKind::Eviction`] policies.
  fn on_hit(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId) {
    let _ = (backend, id);
  }

  /// The entry is about to be removed from the backend. The policy must
  /// release every reference to it and reset its policy fields. Must be a
  /// no-op for entries the policy does not track.
  fn on_delete(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId);

  /// Every entry is about to be dropped at once.
  fn on_clear(&mut self);

  /// Runs one unit of scheduled work for the timer started with `generation`.
  fn tick(&mut self, backend: &dyn Backend<K, V>, generation: u64) -> TickControl {
    let _ = (backend, generation);
    TickControl::Stop
  }

  /// Cancels any timer this policy owns.
  fn stop_timer(&mut self) {}

  /// True when the policy has no pending scheduled work.
  fn is_idle(&self) -> bool {
    true
  }
}

/// Something a scheduled timer can call back into.
pub(crate) trait TickSink: Send + Sync {
  fn run_tick(&self, slot: usize, generation: u64) -> TickControl;
}

#[derive(Clone)]
pub(crate) struct TimerTarget {
  pub(crate) sink: Weak<dyn TickSink>,
  pub(crate) slot: usize,
  pub(crate) runtime: TimerRuntime,
}

/// Everything a policy receives from the cache it is registered with.
#[derive(Clone)]
pub struct PolicyContext {
  deleter: Deleter,
  timer: Option<TimerTarget>,
}

impl PolicyContext {
  pub(crate) fn new(deleter: Deleter, timer: TimerTarget) -> Self {
    Self {
      deleter,
      timer: Some(timer),
    }
  }

  /// A context that is not bound to any cache. Deletion requests queue up in
  /// `deleter` and timers are never started.
  pub fn detached(deleter: Deleter) -> Self {
    Self { deleter, timer: None }
  }

  pub fn deleter(&self) -> &Deleter {
    &self.deleter
  }

  pub fn can_schedule(&self) -> bool {
    self.timer.is_some()
  }

  /// Starts a repeating timer that runs [`CachePolicy::tick`] on this policy
  /// every `period`, tagged with `generation`.
  ///
  /// Returns `None` for a detached context or when the timer could not be
  /// started.
  pub fn schedule(&self, period: Duration, generation: u64) -> Option<ScheduledTick> {
    let target = self.timer.as_ref()?;
    let sink = target.sink.clone();
    let slot = target.slot;

    let tick = move || match sink.upgrade() {
      Some(sink) => sink.run_tick(slot, generation),
      None => TickControl::Stop,
    };

    match target.runtime.schedule(period, tick) {
      Ok(timer) => Some(timer),
      Err(err) => {
        tracing::warn!(slot, error = %err, "failed to start policy timer");
        None
      }
    }
  }
}

impl fmt::Debug for PolicyContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PolicyContext")
      .field("deleter", &self.deleter)
      .field("slot", &self.timer.as_ref().map(|t| t.slot))
      .finish()
  }
}
