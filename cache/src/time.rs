use once_cell::sync::Lazy;
use std::time::{Duration, Instant};

// Deadlines are stored as offsets from this instant, fixed on first use.
static CACHE_EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Time elapsed since the cache epoch.
#[inline]
pub(crate) fn now_duration() -> Duration {
  Instant::now().saturating_duration_since(*CACHE_EPOCH)
}

/// Computes the absolute deadline for something that expires `after` from now.
///
/// Saturates instead of overflowing for absurdly long lifetimes.
#[inline]
pub(crate) fn deadline_after(now: Duration, after: Duration) -> Duration {
  now.checked_add(after).unwrap_or(Duration::MAX)
}
