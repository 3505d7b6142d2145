use super::{CachePolicy, PolicyContext, PolicyKind, TickControl};
use crate::backend::Backend;
use crate::entry::EntryId;
use crate::error::BuildError;
use crate::options::{Expiration, SetOptions};
use crate::task::collector::{CollectorConfig, IntervalCollector, ScanStats};
use crate::time;

use std::time::Duration;

use tracing::{trace, warn};

/// Reclaims entries once their time-to-live has passed.
///
/// Deadlines are stored on the entries themselves. An [`IntervalCollector`]
/// scans the backend in bounded batches while at least one entry carries a
/// finite deadline, and goes idle as soon as none does.
#[derive(Debug)]
pub struct ProactiveExpiration {
  collector: IntervalCollector,
  // Number of entries carrying a finite deadline.
  tracked: usize,
  context: Option<PolicyContext>,
}

impl ProactiveExpiration {
  pub fn new(config: CollectorConfig) -> Result<Self, BuildError> {
    Ok(Self {
      collector: IntervalCollector::new(config)?,
      tracked: 0,
      context: None,
    })
  }

  /// Entries that currently carry a finite deadline.
  pub fn tracked(&self) -> usize {
    self.tracked
  }

  pub fn collector(&self) -> &IntervalCollector {
    &self.collector
  }

  /// Runs one scan immediately against `now` (measured from the cache epoch),
  /// independently of the timer.
  pub fn collect_at<K, V>(&mut self, backend: &dyn Backend<K, V>, now: Duration) -> ScanStats {
    match &self.context {
      Some(context) => self.collector.collect(backend, now, context.deleter()),
      None => {
        warn!("expiration scan requested before the policy was attached");
        ScanStats::default()
      }
    }
  }

  fn arm<K, V>(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId, after: Duration) {
    let Some(entry) = backend.entry_mut(id) else {
      return;
    };
    let was_tracked = entry.expires_at.is_some();
    entry.expires_at = Some(time::deadline_after(time::now_duration(), after));
    if !was_tracked {
      self.tracked += 1;
    }
    self.collector.start(self.context.as_ref());
  }

  fn disarm<K, V>(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId) {
    let Some(entry) = backend.entry_mut(id) else {
      return;
    };
    if entry.expires_at.take().is_none() {
      return;
    }
    self.tracked = self.tracked.saturating_sub(1);
    if self.tracked == 0 {
      self.collector.stop();
    }
  }
}

impl<K, V> CachePolicy<K, V> for ProactiveExpiration {
  fn kind(&self) -> PolicyKind {
    PolicyKind::Expiration
  }

  fn attach(&mut self, context: PolicyContext) {
    self.context = Some(context);
  }

  fn on_set(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId, options: &SetOptions) {
    if let Some(Expiration::After(after)) = options.expires_after {
      self.arm(backend, id, after);
    }
  }

  fn on_update(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId, options: &SetOptions) {
    match options.expires_after {
      None => {}
      Some(Expiration::Never) => self.disarm(backend, id),
      Some(Expiration::After(after)) => self.arm(backend, id, after),
    }
  }

  fn on_delete(&mut self, backend: &mut dyn Backend<K, V>, id: EntryId) {
    self.disarm(backend, id);
  }

  fn on_clear(&mut self) {
    self.tracked = 0;
    self.collector.stop();
    self.collector.reset_cursor();
  }

  fn tick(&mut self, backend: &dyn Backend<K, V>, generation: u64) -> TickControl {
    if !self.collector.is_current(generation) {
      return TickControl::Stop;
    }
    let stats = self.collect_at(backend, time::now_duration());
    trace!(
      generation,
      visited = stats.visited,
      expired = stats.expired,
      wrapped = stats.wrapped,
      "expiration scan"
    );
    TickControl::Continue
  }

  fn stop_timer(&mut self) {
    self.collector.stop();
  }

  fn is_idle(&self) -> bool {
    !self.collector.is_running()
  }
}
