use tessel_cache::{Cache, CacheBuilder, SetOptions};
use std::time::Duration;

#[test]
fn test_set_get_has_delete() {
  let cache: Cache<i32, String> = CacheBuilder::new().build().unwrap();
  cache.set(1, "one".to_string());
  assert_eq!(cache.get(&1).as_deref().map(String::as_str), Some("one"));
  assert!(cache.has(&1));
  assert!(cache.get(&2).is_none());

  assert!(cache.delete(&1));
  assert!(!cache.has(&1));
  assert!(cache.get(&1).is_none());
}

#[test]
fn test_overwrite_replaces_value() {
  let cache: Cache<i32, i32> = CacheBuilder::new().capacity(4).build().unwrap();
  cache.set(1, 10);
  cache.set(1, 11);
  assert_eq!(cache.len(), 1);
  assert_eq!(cache.get(&1).as_deref(), Some(&11));

  let metrics = cache.metrics();
  assert_eq!(metrics.inserts, 1);
  assert_eq!(metrics.updates, 1);
}

#[test]
fn test_metrics_track_reads() {
  let cache: Cache<i32, i32> = CacheBuilder::new().build().unwrap();
  cache.set(1, 1);
  cache.get(&1);
  cache.get(&1);
  cache.get(&2);
  cache.delete(&1);

  let metrics = cache.metrics();
  assert_eq!(metrics.hits, 2);
  assert_eq!(metrics.misses, 1);
  assert_eq!(metrics.deletions, 1);
  assert!((metrics.hit_ratio - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_values_are_shared() {
  let cache: Cache<&str, Vec<u8>> = CacheBuilder::new().build().unwrap();
  cache.set("blob", vec![0; 1024]);
  let a = cache.get(&"blob").unwrap();
  let b = cache.get(&"blob").unwrap();
  assert!(std::sync::Arc::ptr_eq(&a, &b));

  // A value handed out earlier stays valid after the entry goes away.
  cache.delete(&"blob");
  assert_eq!(a.len(), 1024);
}

#[test]
fn test_ttl_is_ignored_without_expiration_policy() {
  let cache: Cache<i32, i32> = CacheBuilder::new().build().unwrap();
  cache.set_with(1, 1, SetOptions::new().expires_after(Duration::from_millis(1)));
  // No expiration policy is registered, so nothing records the deadline.
  std::thread::sleep(Duration::from_millis(10));
  assert!(cache.has(&1));
}

#[test]
fn test_clear_then_reuse() {
  let cache: Cache<i32, i32> = CacheBuilder::new().capacity(3).build().unwrap();
  for n in 0..3 {
    cache.set(n, n);
  }
  cache.clear();
  assert!(cache.is_empty());
  for n in 10..13 {
    cache.set(n, n);
  }
  assert_eq!(cache.len(), 3);
  cache.set(13, 13);
  assert_eq!(cache.len(), 3);
  assert!(!cache.has(&10));
}
