use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use generational_arena::Index;

/// A stable handle to an entry held by a [`Backend`](crate::backend::Backend).
///
/// Handles are generational: once an entry is removed, its handle never
/// resolves again, even if the underlying slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(Index);

impl EntryId {
  /// Splits the handle into its slot position and generation.
  pub fn into_raw_parts(self) -> (usize, u64) {
    self.0.into_raw_parts()
  }

  /// Rebuilds a handle from parts produced by [`EntryId::into_raw_parts`].
  pub fn from_raw_parts(slot: usize, generation: u64) -> Self {
    Self(Index::from_raw_parts(slot, generation))
  }

  #[inline]
  pub(crate) fn index(self) -> Index {
    self.0
  }
}

impl From<Index> for EntryId {
  fn from(index: Index) -> Self {
    Self(index)
  }
}

impl fmt::Debug for EntryId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let (slot, generation) = self.0.into_raw_parts();
    write!(f, "EntryId({slot}v{generation})")
  }
}

/// The recency tier an entry occupies in a Segmented-LRU policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
  Probation,
  Protected,
}

/// Links owned by whichever segment list currently holds the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLinks {
  pub segment: Segment,
  pub prev: Option<EntryId>,
  pub next: Option<EntryId>,
}

impl SegmentLinks {
  pub(crate) fn detached(segment: Segment) -> Self {
    Self {
      segment,
      prev: None,
      next: None,
    }
  }
}

/// A container for a value in the cache, holding all policy metadata.
///
/// Every policy-private field is optional. A policy that stops tracking an
/// entry resets its field to `None`, so a removed entry never carries links
/// into structures that still exist.
pub struct CacheEntry<K, V> {
  pub(crate) key: K,
  /// The user's value, wrapped in an Arc for shared ownership.
  pub(crate) value: Arc<V>,
  /// Segmented-LRU membership. `None` means untracked.
  pub(crate) links: Option<SegmentLinks>,
  /// Absolute deadline since the cache epoch. `None` never expires.
  pub(crate) expires_at: Option<Duration>,
}

impl<K, V> CacheEntry<K, V> {
  pub(crate) fn new(key: K, value: Arc<V>) -> Self {
    Self {
      key,
      value,
      links: None,
      expires_at: None,
    }
  }

  #[inline]
  pub fn key(&self) -> &K {
    &self.key
  }

  /// Returns a clone of the `Arc` containing the value.
  #[inline]
  pub fn value(&self) -> Arc<V> {
    self.value.clone()
  }

  #[inline]
  pub fn links(&self) -> Option<SegmentLinks> {
    self.links
  }

  #[inline]
  pub fn segment(&self) -> Option<Segment> {
    self.links.map(|links| links.segment)
  }

  #[inline]
  pub fn expires_at(&self) -> Option<Duration> {
    self.expires_at
  }

  /// Checks the entry's deadline against `now` (both measured from the epoch).
  #[inline]
  pub fn is_expired_at(&self, now: Duration) -> bool {
    matches!(self.expires_at, Some(deadline) if deadline <= now)
  }

  /// True when no policy holds any state on this entry.
  #[inline]
  pub fn is_untracked(&self) -> bool {
    self.links.is_none() && self.expires_at.is_none()
  }
}

impl<K: fmt::Debug, V> fmt::Debug for CacheEntry<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheEntry")
      .field("key", &self.key)
      .field("links", &self.links)
      .field("expires_at", &self.expires_at)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_entry_is_untracked() {
    let entry = CacheEntry::new("k", Arc::new(1));
    assert!(entry.is_untracked());
    assert_eq!(entry.segment(), None);
    assert!(!entry.is_expired_at(Duration::MAX));
  }

  #[test]
  fn expiry_is_inclusive() {
    let mut entry = CacheEntry::new("k", Arc::new(1));
    entry.expires_at = Some(Duration::from_secs(10));
    assert!(!entry.is_expired_at(Duration::from_secs(9)));
    assert!(entry.is_expired_at(Duration::from_secs(10)));
    assert!(entry.is_expired_at(Duration::from_secs(11)));
  }

  #[test]
  fn entry_id_raw_parts_round_trip() {
    let id = EntryId::from_raw_parts(3, 7);
    assert_eq!(id.into_raw_parts(), (3, 7));
  }
}
