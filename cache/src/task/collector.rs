use crate::backend::{Backend, Cursor, ScanStep};
use crate::error::BuildError;
use crate::listener::EvictionReason;
use crate::policy::{Deleter, PolicyContext};
use crate::runtime::ScheduledTick;

use std::time::Duration;

use tracing::debug;

/// The default period between two collector ticks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// The default number of entries inspected per tick.
pub const DEFAULT_ITERATE_COUNT: usize = 100;

/// Tuning for an [`IntervalCollector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorConfig {
  /// The period between two scans.
  pub check_interval: Duration,
  /// The maximum number of backend positions a single scan walks. Empty
  /// positions left behind by removals count too.
  pub iterate_count: usize,
}

impl CollectorConfig {
  pub fn new(check_interval: Duration, iterate_count: usize) -> Result<Self, BuildError> {
    let config = Self {
      check_interval,
      iterate_count,
    };
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), BuildError> {
    if self.check_interval.is_zero() {
      return Err(BuildError::ZeroCheckInterval);
    }
    if self.iterate_count == 0 {
      return Err(BuildError::ZeroIterateCount);
    }
    Ok(())
  }
}

impl Default for CollectorConfig {
  fn default() -> Self {
    Self {
      check_interval: DEFAULT_CHECK_INTERVAL,
      iterate_count: DEFAULT_ITERATE_COUNT,
    }
  }
}

/// What a single scan did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
  /// Live entries inspected.
  pub visited: usize,
  /// Backend positions walked, live or empty. Never exceeds `iterate_count`.
  pub walked: usize,
  pub expired: usize,
  /// The scan reached the end of the backend and the cursor went back to
  /// the start.
  pub wrapped: bool,
}

enum CollectorState {
  Idle,
  Running {
    generation: u64,
    // `None` when the owning policy is not attached to a cache.
    _timer: Option<ScheduledTick>,
  },
}

/// Periodically scans a bounded slice of the backend for expired entries.
///
/// Each scan resumes from where the previous one stopped, so reclaiming
/// expired entries costs at most `iterate_count` inspections per tick no
/// matter how large the backend grows.
pub struct IntervalCollector {
  config: CollectorConfig,
  cursor: Cursor,
  generation: u64,
  state: CollectorState,
}

impl IntervalCollector {
  pub fn new(config: CollectorConfig) -> Result<Self, BuildError> {
    config.validate()?;
    Ok(Self {
      config,
      cursor: Cursor::START,
      generation: 0,
      state: CollectorState::Idle,
    })
  }

  pub fn config(&self) -> &CollectorConfig {
    &self.config
  }

  pub fn cursor(&self) -> Cursor {
    self.cursor
  }

  pub fn is_running(&self) -> bool {
    matches!(self.state, CollectorState::Running { .. })
  }

  /// Whether a tick tagged with `generation` belongs to the running timer.
  pub fn is_current(&self, generation: u64) -> bool {
    matches!(self.state, CollectorState::Running { generation: current, .. } if current == generation)
  }

  /// Starts the timer unless it is already running. Every start opens a new
  /// generation, so ticks still in flight from an earlier timer are ignored.
  pub(crate) fn start(&mut self, context: Option<&PolicyContext>) {
    if self.is_running() {
      return;
    }
    self.generation += 1;
    let timer = context.and_then(|context| context.schedule(self.config.check_interval, self.generation));
    debug!(
      generation = self.generation,
      interval = ?self.config.check_interval,
      scheduled = timer.is_some(),
      "expiration collector started"
    );
    self.state = CollectorState::Running {
      generation: self.generation,
      _timer: timer,
    };
  }

  /// Cancels the timer, if any.
  pub(crate) fn stop(&mut self) {
    if let CollectorState::Running { generation, .. } = self.state {
      debug!(generation, "expiration collector stopped");
    }
    self.state = CollectorState::Idle;
  }

  pub(crate) fn reset_cursor(&mut self) {
    self.cursor = Cursor::START;
  }

  /// Walks up to `iterate_count` backend positions from the cursor and
  /// queues every live entry whose deadline is at or before `now` on
  /// `deleter`.
  ///
  /// Reaching the end of the backend wraps the cursor and ends the scan.
  pub fn collect<K, V>(&mut self, backend: &dyn Backend<K, V>, now: Duration, deleter: &Deleter) -> ScanStats {
    let mut stats = ScanStats::default();
    while stats.walked < self.config.iterate_count {
      let budget = self.config.iterate_count - stats.walked;
      match backend.next_from(self.cursor, budget) {
        ScanStep::Entry { id, next, walked } => {
          self.cursor = next;
          stats.walked += walked.clamp(1, budget);
          stats.visited += 1;
          if backend.entry(id).is_some_and(|entry| entry.is_expired_at(now)) {
            deleter.delete(id, EvictionReason::Expired);
            stats.expired += 1;
          }
        }
        ScanStep::Exhausted { next } => {
          self.cursor = next;
          stats.walked = self.config.iterate_count;
        }
        ScanStep::End { walked } => {
          self.cursor = Cursor::START;
          stats.walked += walked.min(budget);
          stats.wrapped = true;
          break;
        }
      }
    }
    stats
  }
}

impl std::fmt::Debug for IntervalCollector {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("IntervalCollector")
      .field("config", &self.config)
      .field("cursor", &self.cursor)
      .field("generation", &self.generation)
      .field("running", &self.is_running())
      .finish()
  }
}
