use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use tessel_cache::{Cache, CacheBuilder, CollectorConfig, SetOptions};

const CAPACITY: usize = 10_000;

fn slru_cache() -> Cache<u64, u64> {
  CacheBuilder::new().segmented_lru(CAPACITY, 0.8).build().unwrap()
}

// xorshift, so the access pattern is reproducible without pulling in an RNG.
fn keys(count: usize, range: u64) -> Vec<u64> {
  let mut state = 0x9e37_79b9_7f4a_7c15u64;
  (0..count)
    .map(|_| {
      state ^= state << 13;
      state ^= state >> 7;
      state ^= state << 17;
      state % range
    })
    .collect()
}

fn bench_set(c: &mut Criterion) {
  let mut group = c.benchmark_group("set");
  for range in [CAPACITY as u64 / 2, CAPACITY as u64 * 4] {
    let keys = keys(100_000, range);
    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_with_input(BenchmarkId::new("key_range", range), &keys, |b, keys| {
      let cache = slru_cache();
      b.iter(|| {
        for &key in keys {
          cache.set(key, key);
        }
      })
    });
  }
  group.finish();
}

fn bench_get(c: &mut Criterion) {
  let mut group = c.benchmark_group("get");
  let cache = slru_cache();
  for key in 0..CAPACITY as u64 {
    cache.set(key, key);
  }
  let keys = keys(100_000, CAPACITY as u64 * 2);
  group.throughput(Throughput::Elements(keys.len() as u64));
  group.bench_function("half_hits", |b| {
    b.iter(|| {
      for key in &keys {
        black_box(cache.get(key));
      }
    })
  });
  group.finish();
}

fn bench_set_with_ttl(c: &mut Criterion) {
  let mut group = c.benchmark_group("set_with_ttl");
  let keys = keys(100_000, CAPACITY as u64 * 4);
  group.throughput(Throughput::Elements(keys.len() as u64));
  group.bench_function("slru_and_expiration", |b| {
    let cache: Cache<u64, u64> = CacheBuilder::new()
      .segmented_lru(CAPACITY, 0.8)
      .proactive_expiration(CollectorConfig::new(Duration::from_millis(50), 500).unwrap())
      .build()
      .unwrap();
    let options = SetOptions::new().expires_after(Duration::from_secs(1));
    b.iter(|| {
      for &key in &keys {
        cache.set_with(key, key, options);
      }
    })
  });
  group.finish();
}

criterion_group!(benches, bench_set, bench_get, bench_set_with_ttl);
criterion_main!(benches);
