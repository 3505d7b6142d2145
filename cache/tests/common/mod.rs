#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tessel_cache::{Cache, CacheBuilder, CollectorConfig, EvictionReason};

pub type Event<K, V> = (K, V, EvictionReason);

/// Collects DELETE events in the order they were delivered.
#[derive(Clone)]
pub struct Recorder<K, V> {
  events: Arc<Mutex<Vec<Event<K, V>>>>,
}

impl<K, V> Default for Recorder<K, V> {
  fn default() -> Self {
    Self {
      events: Arc::new(Mutex::new(Vec::new())),
    }
  }
}

impl<K: Clone + Send + 'static, V: Clone + Send + Sync + 'static> Recorder<K, V> {
  pub fn listener(&self) -> impl Fn(&K, &Arc<V>, EvictionReason) + Send + Sync + 'static {
    let events = self.events.clone();
    move |key: &K, value: &Arc<V>, reason: EvictionReason| events.lock().push((key.clone(), V::clone(value), reason))
  }

  pub fn take(&self) -> Vec<Event<K, V>> {
    std::mem::take(&mut *self.events.lock())
  }

  pub fn len(&self) -> usize {
    self.events.lock().len()
  }
}

/// Installs a test-friendly subscriber so `tracing` output shows up with
/// `--nocapture`. Safe to call from every test.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

pub fn slru_cache(capacity: usize, ratio: f64) -> Cache<&'static str, i32> {
  CacheBuilder::new().segmented_lru(capacity, ratio).build().unwrap()
}

pub const CHECK_INTERVAL: Duration = Duration::from_millis(10);

pub fn expiring_cache(iterate_count: usize) -> Cache<String, u32> {
  CacheBuilder::new()
    .proactive_expiration(CollectorConfig::new(CHECK_INTERVAL, iterate_count).unwrap())
    .build()
    .unwrap()
}

/// Polls `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
  let deadline = std::time::Instant::now() + timeout;
  while std::time::Instant::now() < deadline {
    if condition() {
      return true;
    }
    std::thread::sleep(Duration::from_millis(5));
  }
  condition()
}
