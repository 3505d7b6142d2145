use super::segment_list::SegmentList;
use super::{CachePolicy, Deleter, PolicyContext, PolicyKind};
use crate::backend::Backend;
use crate::entry::{EntryId, Segment};
use crate::error::BuildError;
use crate::listener::EvictionReason;
use crate::options::SetOptions;

use tracing::{debug, warn};

/// An eviction policy based on the Segmented LRU algorithm.
///
/// New entries are admitted to a *probation* segment; a hit promotes an
/// entry to the *protected* segment. When the cache is full, the least
/// recently used probation entry is evicted first, so one-off scans cannot
/// flush entries that have proven their worth.
///
/// Recency links live on the backend's entries, so every operation is O(1).
#[derive(Debug)]
pub struct SegmentedLru {
  capacity: usize,
  protected_capacity: usize,
  probation_capacity: usize,
  probation: SegmentList,
  protected: SegmentList,
  deleter: Option<Deleter>,
}

impl SegmentedLru {
  /// Creates a policy bounding the cache to `capacity` entries, of which
  /// `round(capacity * protected_ratio)` may sit in the protected segment.
  pub fn new(capacity: usize, protected_ratio: f64) -> Result<Self, BuildError> {
    if capacity == 0 {
      return Err(BuildError::ZeroCapacity);
    }
    if !(protected_ratio > 0.0 && protected_ratio < 1.0) {
      return Err(BuildError::InvalidProtectedRatio(protected_ratio));
    }

    let protected_capacity = ((capacity as f64 * protected_ratio).round() as usize).min(capacity);
    let probation_capacity = capacity - protected_capacity;

    Ok(Self {
      capacity,
      protected_capacity,
      probation_capacity,
      probation: SegmentList::new(Segment::Probation),
      protected: SegmentList::new(Segment::Protected),
      deleter: None,
    })
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn protected_capacity(&self) -> usize {
    self.protected_capacity
  }

  pub fn probation_capacity(&self) -> usize {
    self.probation_capacity
  }

  /// Total entries tracked across both segments.
  pub fn len(&self) -> usize {
    self.probation.len() + self.protected.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn probation_len(&self) -> usize {
    self.probation.len()
  }

  pub fn protected_len(&self) -> usize {
    self.protected.len()
  }

  /// Handles in `segment`, from most to least recently used.
  pub fn segment_ids<K, V>(&self, backend: &dyn Backend<K, V>, segment: Segment) -> Vec<EntryId> {
    match segment {
      Segment::Probation => self.probation.ids(backend),
      Segment::Protected => self.protected.ids(backend),
    }
  }

  /// Keys in `segment`, from most to least recently used.
  pub fn segment_keys<K: Clone, V>(&self, backend: &dyn Backend<K, V>, segment: Segment) -> Vec<K> {
    self
      .segment_ids(backend, segment)
      .into_iter()
      .filter_map(|id| backend.entry(id).map(|entry| entry.key().clone()))
      .collect()
  }

  /// The entry that would be evicted next.
  pub fn peek_victim(&self) -> Option<EntryId> {
    self.probation.tail().or(self.protected.tail())
  }

  fn list_mut(&mut self, segment: Segment) -> &mut SegmentList {
    match segment {
      Segment::Probation => &mut self.probation,
      Segment::Protected => &mut self.protected,
    }
  }

  // Hands `victim` to the deleter, then stops tracking it.
  fn evict<K, V>(&mut self, backend: &mut dyn Backend<K, V>, victim: EntryId) {
    let Some(segment) = backend.entry(victim).and_then(|entry| entry.segment()) else {
      return;
    };
    match &self.deleter {
      Some(deleter) => deleter.delete(victim, EvictionReason::Capacity),
      None => warn!(?victim, "segmented LRU evicting without an attached deleter"),
    }
    self.list_mut(segment).unlink(backend, victim);
    debug!(?victim, ?segment, "evicted least recently used entry");
  }

  fn evict_lru<K, V>(&mut self, backend: &mut dyn Backend<K, V>) {
    if let Some(victim) = self.peek_victim() {
      self.evict(backend, victim);
    }
  }
}

impl<K, V> CachePolicy<K, V> for SegmentedLru {
  fn kind(&self) -> PolicyKind {
    PolicyKind::Eviction
  }

  fn attach(&mut self, context: PolicyContext) {
    self.deleter = Some(context.deleter().clone());
  }

  fn on_set(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId, _options: &SetOptions) {
    match backend.entry(id) {
      Some(entry) if entry.segment().is_none() => {}
      // Unknown handle, or already tracked.
      _ => return,
    }
    if self.len() >= self.capacity {
      self.evict_lru(backend);
    }
    self.probation.push_front(backend, id);
  }

  fn on_hit(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId) {
    match backend.entry(id).and_then(|entry| entry.segment()) {
      Some(Segment::Probation) => {
        self.probation.unlink(backend, id);
        self.protected.push_front(backend, id);

        // At most one demotion, and at most one eviction, per hit.
        if self.protected.len() > self.protected_capacity {
          if let Some(demoted) = self.protected.pop_back(backend) {
            self.probation.push_front(backend, demoted);
            if self.probation.len() > self.probation_capacity {
              if let Some(victim) = self.probation.tail() {
                self.evict(backend, victim);
              }
            }
          }
        }
      }
      Some(Segment::Protected) => self.protected.move_to_front(backend, id),
      None => {}
    }
  }

  fn on_delete(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId) {
    if let Some(segment) = backend.entry(id).and_then(|entry| entry.segment()) {
      self.list_mut(segment).unlink(backend, id);
    }
  }

  fn on_clear(&mut self) {
    self.probation.clear();
    self.protected.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::ArenaBackend;
  use crate::policy::DeleteRequest;

  use std::sync::Arc;

  type TestBackend = Box<dyn Backend<&'static str, i32>>;

  struct Harness {
    backend: TestBackend,
    policy: SegmentedLru,
    deleter: Deleter,
  }

  impl Harness {
    fn new(capacity: usize, ratio: f64) -> Self {
      let deleter = Deleter::new();
      let mut policy = SegmentedLru::new(capacity, ratio).unwrap();
      CachePolicy::<&str, i32>::attach(&mut policy, PolicyContext::detached(deleter.clone()));
      Self {
        backend: Box::new(ArenaBackend::new()),
        policy,
        deleter,
      }
    }

    // Mirrors what the cache does: set, notify, carry out requested deletions.
    fn set(&mut self, key: &'static str) -> Vec<&'static str> {
      let id = self.backend.set(key, Arc::new(0));
      self.policy.on_set(&mut *self.backend, id, &SetOptions::default());
      self.apply_deletions()
    }

    fn hit(&mut self, key: &'static str) -> Vec<&'static str> {
      let id = self.backend.get(&key).unwrap();
      self.policy.on_hit(&mut *self.backend, id);
      self.apply_deletions()
    }

    fn apply_deletions(&mut self) -> Vec<&'static str> {
      let mut evicted = Vec::new();
      while let Some(DeleteRequest { id, reason }) = self.deleter.take() {
        assert_eq!(reason, EvictionReason::Capacity);
        CachePolicy::<&str, i32>::on_delete(&mut self.policy, &mut *self.backend, id);
        evicted.push(self.backend.delete(id).unwrap().key);
      }
      evicted
    }

    fn probation(&self) -> Vec<&'static str> {
      self.policy.segment_keys(&*self.backend, Segment::Probation)
    }

    fn protected(&self) -> Vec<&'static str> {
      self.policy.segment_keys(&*self.backend, Segment::Protected)
    }

    fn segment(&self, key: &'static str) -> Option<Segment> {
      let id = self.backend.get(&key)?;
      self.backend.entry(id)?.segment()
    }

    // Every tracked entry is reachable from exactly the list its tag names,
    // and every backlink matches.
    fn assert_consistent(&self) {
      for segment in [Segment::Probation, Segment::Protected] {
        let ids = self.policy.segment_ids(&*self.backend, segment);
        let mut prev = None;
        for id in &ids {
          let links = self.backend.entry(*id).unwrap().links().unwrap();
          assert_eq!(links.segment, segment);
          assert_eq!(links.prev, prev);
          prev = Some(*id);
        }
        let expected = match segment {
          Segment::Probation => self.policy.probation_len(),
          Segment::Protected => self.policy.protected_len(),
        };
        assert_eq!(ids.len(), expected);
      }
      let tracked = self.backend.iter().filter(|(_, e)| e.segment().is_some()).count();
      assert_eq!(tracked, self.policy.len());
      assert!(self.policy.len() <= self.policy.capacity());
    }
  }

  #[test]
  fn capacities_split_by_ratio() {
    let policy = SegmentedLru::new(10, 0.8).unwrap();
    assert_eq!(policy.protected_capacity(), 8);
    assert_eq!(policy.probation_capacity(), 2);

    // 0.5 rounds half away from zero.
    let policy = SegmentedLru::new(1, 0.5).unwrap();
    assert_eq!(policy.protected_capacity(), 1);
    assert_eq!(policy.probation_capacity(), 0);

    let policy = SegmentedLru::new(2, 0.2).unwrap();
    assert_eq!(policy.protected_capacity(), 0);
    assert_eq!(policy.probation_capacity(), 2);
  }

  #[test]
  fn rejects_bad_configuration() {
    assert_eq!(SegmentedLru::new(0, 0.5).unwrap_err(), BuildError::ZeroCapacity);
    for ratio in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
      assert!(matches!(
        SegmentedLru::new(4, ratio),
        Err(BuildError::InvalidProtectedRatio(_))
      ));
    }
  }

  #[test]
  fn new_item_goes_to_probation_head() {
    let mut h = Harness::new(10, 0.5);
    h.set("a");
    h.set("b");
    assert_eq!(h.probation(), vec!["b", "a"]);
    assert!(h.protected().is_empty());
    assert_eq!(h.segment("a"), Some(Segment::Probation));
    h.assert_consistent();
  }

  #[test]
  fn hit_promotes_from_probation_to_protected() {
    let mut h = Harness::new(10, 0.5);
    h.set("a");
    h.set("b");
    h.hit("a");
    assert_eq!(h.probation(), vec!["b"]);
    assert_eq!(h.protected(), vec!["a"]);
    h.assert_consistent();
  }

  #[test]
  fn hit_refreshes_item_in_protected() {
    let mut h = Harness::new(10, 0.5);
    for key in ["a", "b"] {
      h.set(key);
      h.hit(key);
    }
    assert_eq!(h.protected(), vec!["b", "a"]);
    h.hit("a");
    assert_eq!(h.protected(), vec!["a", "b"]);
    h.assert_consistent();
  }

  #[test]
  fn eviction_order_without_hits_is_insertion_order() {
    let mut h = Harness::new(4, 0.5);
    let keys = ["k0", "k1", "k2", "k3", "k4", "k5", "k6"];
    let mut evicted = Vec::new();
    for key in keys {
      evicted.extend(h.set(key));
      h.assert_consistent();
    }
    assert_eq!(evicted, vec!["k0", "k1", "k2"]);
    assert_eq!(h.policy.len(), 4);
  }

  #[test]
  fn promotion_overflow_demotes_protected_tail() {
    let mut h = Harness::new(4, 0.5); // protected 2, probation 2
    for key in ["a", "b", "c", "d"] {
      h.set(key);
    }
    h.hit("a");
    h.hit("b");
    assert_eq!(h.protected(), vec!["b", "a"]);

    let evicted = h.hit("c");
    assert!(evicted.is_empty());
    assert_eq!(h.protected(), vec!["c", "b"]);
    assert_eq!(h.probation(), vec!["a", "d"], "demoted entry lands at probation head");
    h.assert_consistent();
  }

  #[test]
  fn protected_entries_outlive_probation_under_pressure() {
    let mut h = Harness::new(3, 0.34); // protected 1, probation 2
    h.set("hot");
    h.hit("hot");
    let mut evicted = Vec::new();
    for key in ["x1", "x2", "x3", "x4", "x5"] {
      evicted.extend(h.set(key));
    }
    assert!(!evicted.contains(&"hot"));
    assert_eq!(h.protected(), vec!["hot"]);
    assert_eq!(evicted, vec!["x1", "x2", "x3"]);
    h.assert_consistent();
  }

  #[test]
  fn evicts_from_protected_when_probation_is_empty() {
    let mut h = Harness::new(2, 0.9); // protected 2, probation 0
    h.set("a");
    h.hit("a");
    h.set("b");
    h.hit("b");
    assert!(h.probation().is_empty());

    let evicted = h.set("c");
    assert_eq!(evicted, vec!["a"]);
    assert_eq!(h.probation(), vec!["c"]);
    assert_eq!(h.protected(), vec!["b"]);
    h.assert_consistent();
  }

  #[test]
  fn zero_protected_capacity_behaves_as_plain_lru() {
    let mut h = Harness::new(2, 0.2); // protected 0, probation 2
    h.set("a");
    h.set("b");
    h.hit("a");
    assert!(h.protected().is_empty(), "promotion is immediately undone");
    assert_eq!(h.probation(), vec!["a", "b"]);

    assert_eq!(h.set("c"), vec!["b"]);
    assert_eq!(h.set("d"), vec!["a"]);
    h.assert_consistent();
  }

  #[test]
  fn capacity_one_keeps_latest() {
    let mut h = Harness::new(1, 0.5);
    h.set("a");
    h.hit("a");
    assert_eq!(h.set("b"), vec!["a"]);
    assert_eq!(h.set("c"), vec!["b"]);
    assert_eq!(h.probation(), vec!["c"]);
    h.assert_consistent();
  }

  #[test]
  fn end_to_end_capacity_two() {
    let mut h = Harness::new(2, 0.5);
    h.set("a");
    h.set("b");
    assert_eq!(h.set("c"), vec!["a"]);
    h.hit("b");
    assert_eq!(h.set("d"), vec!["c"]);

    assert_eq!(h.segment("b"), Some(Segment::Protected));
    assert_eq!(h.segment("d"), Some(Segment::Probation));
    assert_eq!(h.backend.len(), 2);
    h.assert_consistent();
  }

  #[test]
  fn on_delete_clears_links() {
    let mut h = Harness::new(10, 0.5);
    h.set("a");
    h.set("b");
    h.hit("b");
    let a = h.backend.get(&"a").unwrap();
    let b = h.backend.get(&"b").unwrap();

    CachePolicy::<&str, i32>::on_delete(&mut h.policy, &mut *h.backend, a);
    CachePolicy::<&str, i32>::on_delete(&mut h.policy, &mut *h.backend, b);
    assert!(h.backend.entry(a).unwrap().links().is_none());
    assert!(h.backend.entry(b).unwrap().links().is_none());
    assert!(h.policy.is_empty());

    // Deleting an untracked entry is a no-op.
    CachePolicy::<&str, i32>::on_delete(&mut h.policy, &mut *h.backend, a);
    assert!(h.policy.is_empty());
  }

  #[test]
  fn reinsert_of_tracked_entry_is_noop() {
    let mut h = Harness::new(10, 0.5);
    h.set("a");
    h.set("b");
    let a = h.backend.get(&"a").unwrap();
    h.policy.on_set(&mut *h.backend, a, &SetOptions::default());
    assert_eq!(h.probation(), vec!["b", "a"]);
    h.assert_consistent();
  }

  #[test]
  fn clear_drops_both_segments() {
    let mut h = Harness::new(10, 0.5);
    h.set("a");
    h.set("b");
    h.hit("b");
    CachePolicy::<&str, i32>::on_clear(&mut h.policy);
    h.backend.clear();
    assert!(h.policy.is_empty());
    assert!(h.policy.peek_victim().is_none());

    h.set("c");
    assert_eq!(h.probation(), vec!["c"]);
    h.assert_consistent();
  }

  #[test]
  fn random_workload_never_exceeds_capacity() {
    const KEYS: [&str; 12] = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"];
    let mut h = Harness::new(5, 0.6);
    // Small deterministic LCG; no need for a real RNG here.
    let mut state: u64 = 0x2545_f491;
    for _ in 0..500 {
      state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
      let key = KEYS[(state >> 33) as usize % KEYS.len()];
      if h.backend.get(&key).is_some() && (state >> 20) & 1 == 0 {
        h.hit(key);
      } else if h.backend.get(&key).is_none() {
        h.set(key);
      }
      h.assert_consistent();
      assert_eq!(h.backend.len(), h.policy.len());
    }
  }
}
