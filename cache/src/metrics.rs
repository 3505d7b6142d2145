use crate::listener::EvictionReason;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;

/// Counters updated by every cache operation. All fields are atomic so a
/// snapshot can be taken without touching the cache lock.
#[derive(Debug)]
pub struct Metrics {
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,

  pub(crate) inserts: CachePadded<AtomicU64>,
  pub(crate) updates: CachePadded<AtomicU64>,
  pub(crate) deletions: CachePadded<AtomicU64>,
  pub(crate) clears: CachePadded<AtomicU64>,

  pub(crate) evicted_by_capacity: CachePadded<AtomicU64>,
  pub(crate) evicted_by_expiry: CachePadded<AtomicU64>,

  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      inserts: CachePadded::new(AtomicU64::new(0)),
      updates: CachePadded::new(AtomicU64::new(0)),
      deletions: CachePadded::new(AtomicU64::new(0)),
      clears: CachePadded::new(AtomicU64::new(0)),
      evicted_by_capacity: CachePadded::new(AtomicU64::new(0)),
      evicted_by_expiry: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

#[inline]
fn bump(counter: &AtomicU64) {
  counter.fetch_add(1, Ordering::Relaxed);
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn record_hit(&self) {
    bump(&self.hits);
  }

  pub(crate) fn record_miss(&self) {
    bump(&self.misses);
  }

  pub(crate) fn record_insert(&self) {
    bump(&self.inserts);
  }

  pub(crate) fn record_update(&self) {
    bump(&self.updates);
  }

  pub(crate) fn record_clear(&self) {
    bump(&self.clears);
  }

  pub(crate) fn record_removal(&self, reason: EvictionReason) {
    match reason {
      EvictionReason::Deleted => bump(&self.deletions),
      EvictionReason::Capacity => bump(&self.evicted_by_capacity),
      EvictionReason::Expired => bump(&self.evicted_by_expiry),
    }
  }

  /// Creates a point-in-time snapshot of the current metrics.
  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      inserts: self.inserts.load(Ordering::Relaxed),
      updates: self.updates.load(Ordering::Relaxed),
      deletions: self.deletions.load(Ordering::Relaxed),
      clears: self.clears.load(Ordering::Relaxed),
      evicted_by_capacity: self.evicted_by_capacity.load(Ordering::Relaxed),
      evicted_by_expiry: self.evicted_by_expiry.load(Ordering::Relaxed),
      uptime: self.created_at.elapsed(),
    }
  }
}

/// A point-in-time, public-facing snapshot of the cache's metrics.
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MetricsSnapshot {
  /// Reads that found a live entry.
  pub hits: u64,
  /// Reads that found nothing, or an expired entry.
  pub misses: u64,
  /// The cache hit ratio (hits / (hits + misses)).
  pub hit_ratio: f64,
  /// Writes that created a new entry.
  pub inserts: u64,
  /// Writes that replaced the value of an existing entry.
  pub updates: u64,
  /// Entries removed by an explicit `delete`.
  pub deletions: u64,
  pub clears: u64,
  pub evicted_by_capacity: u64,
  /// Entries removed by the collector or by a lazy check on read.
  pub evicted_by_expiry: u64,
  /// Time since the cache was built.
  pub uptime: Duration,
}

impl MetricsSnapshot {
  /// Removals of any kind, excluding `clear`.
  pub fn removals(&self) -> u64 {
    self.deletions + self.evicted_by_capacity + self.evicted_by_expiry
  }
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("inserts", &self.inserts)
      .field("updates", &self.updates)
      .field("deletions", &self.deletions)
      .field("clears", &self.clears)
      .field("evicted_by_capacity", &self.evicted_by_capacity)
      .field("evicted_by_expiry", &self.evicted_by_expiry)
      .field("uptime", &self.uptime)
      .finish()
  }
}
