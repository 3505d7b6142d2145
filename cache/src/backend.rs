use crate::entry::{CacheEntry, EntryId};

use core::fmt;
use std::hash::Hash;
use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use generational_arena::Arena;

/// A resumable position in a backend's iteration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(usize);

impl Cursor {
  /// The position before the first entry.
  pub const START: Cursor = Cursor(0);

  pub fn new(position: usize) -> Self {
    Self(position)
  }

  pub fn position(self) -> usize {
    self.0
  }
}

/// The outcome of one [`Backend::next_from`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
  /// A live entry, the cursor just past it, and the positions walked to
  /// reach it (at least one, never more than the budget).
  Entry { id: EntryId, next: Cursor, walked: usize },
  /// The budget ran out on empty positions. Resume from `next`.
  Exhausted { next: Cursor },
  /// The end of iteration was reached after walking `walked` positions.
  End { walked: usize },
}

/// The raw keyed storage a cache delegates to.
///
/// A backend is a dumb associative container: it owns the canonical
/// [`CacheEntry`] for each key and never looks at policy fields. Policies
/// reach entries through the handles it hands out.
pub trait Backend<K, V>: Send {
  /// Stores `value` under `key`. An existing entry keeps its handle and
  /// policy fields; only the value is replaced.
  fn set(&mut self, key: K, value: Arc<V>) -> EntryId;

  fn get(&self, key: &K) -> Option<EntryId>;

  fn entry(&self, id: EntryId) -> Option<&CacheEntry<K, V>>;

  fn entry_mut(&mut self, id: EntryId) -> Option<&mut CacheEntry<K, V>>;

  /// Removes the entry, returning it if the handle was live.
  fn delete(&mut self, id: EntryId) -> Option<CacheEntry<K, V>>;

  fn clear(&mut self);

  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Looks for the first live entry at or after `cursor`, walking at most
  /// `budget` positions. Empty positions count against the budget, so a
  /// sparse backend cannot make one step arbitrarily long.
  ///
  /// Cursors stay valid across removals; a scan may delete the entries it
  /// has already visited and resume where it left off.
  fn next_from(&self, cursor: Cursor, budget: usize) -> ScanStep;

  /// A deterministic traversal over every entry, in cursor order.
  fn iter(&self) -> Box<dyn Iterator<Item = (EntryId, &CacheEntry<K, V>)> + '_>;
}

/// The default backend: entries live contiguously in a generational arena,
/// with a hash map from key to handle.
pub struct ArenaBackend<K, V> {
  entries: Arena<CacheEntry<K, V>>,
  lookup: HashMap<K, EntryId>,
}

impl<K, V> ArenaBackend<K, V> {
  pub fn new() -> Self {
    Self {
      entries: Arena::new(),
      lookup: HashMap::new(),
    }
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      entries: Arena::with_capacity(capacity),
      lookup: HashMap::with_capacity(capacity),
    }
  }
}

impl<K, V> Default for ArenaBackend<K, V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V> fmt::Debug for ArenaBackend<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ArenaBackend")
      .field("len", &self.entries.len())
      .field("slots", &self.entries.capacity())
      .finish()
  }
}

impl<K, V> Backend<K, V> for ArenaBackend<K, V>
where
  K: Eq + Hash + Clone + Send,
  V: Send + Sync,
{
  fn set(&mut self, key: K, value: Arc<V>) -> EntryId {
    if let Some(&id) = self.lookup.get(&key) {
      if let Some(entry) = self.entries.get_mut(id.index()) {
        entry.value = value;
        return id;
      }
    }
    let id = EntryId::from(self.entries.insert(CacheEntry::new(key.clone(), value)));
    self.lookup.insert(key, id);
    id
  }

  #[inline]
  fn get(&self, key: &K) -> Option<EntryId> {
    self.lookup.get(key).copied()
  }

  #[inline]
  fn entry(&self, id: EntryId) -> Option<&CacheEntry<K, V>> {
    self.entries.get(id.index())
  }

  #[inline]
  fn entry_mut(&mut self, id: EntryId) -> Option<&mut CacheEntry<K, V>> {
    self.entries.get_mut(id.index())
  }

  fn delete(&mut self, id: EntryId) -> Option<CacheEntry<K, V>> {
    let entry = self.entries.remove(id.index())?;
    self.lookup.remove(&entry.key);
    Some(entry)
  }

  fn clear(&mut self) {
    self.entries.clear();
    self.lookup.clear();
  }

  #[inline]
  fn len(&self) -> usize {
    self.entries.len()
  }

  fn next_from(&self, cursor: Cursor, budget: usize) -> ScanStep {
    let start = cursor.position();
    let end = self.entries.capacity();
    let stop = start.saturating_add(budget).min(end);
    for slot in start..stop {
      if let Some((_, index)) = self.entries.get_unknown_gen(slot) {
        return ScanStep::Entry {
          id: EntryId::from(index),
          next: Cursor(slot + 1),
          walked: slot + 1 - start,
        };
      }
    }
    if stop >= end {
      ScanStep::End {
        walked: stop.saturating_sub(start),
      }
    } else {
      ScanStep::Exhausted { next: Cursor(stop) }
    }
  }

  fn iter(&self) -> Box<dyn Iterator<Item = (EntryId, &CacheEntry<K, V>)> + '_> {
    Box::new(
      self
        .entries
        .iter()
        .map(|(index, entry)| (EntryId::from(index), entry)),
    )
  }
}
