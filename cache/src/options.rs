use std::time::Duration;

/// How long an entry may live before the expiration policy reclaims it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expiration {
  /// Exempt from expiration.
  Never,
  /// Expires once this much time has passed since the write.
  After(Duration),
}

/// Marks an entry as exempt from expiration.
pub const INFINITE_EXPIRATION: Expiration = Expiration::Never;

impl Expiration {
  pub fn after_secs(secs: u64) -> Self {
    Expiration::After(Duration::from_secs(secs))
  }

  pub fn after_millis(millis: u64) -> Self {
    Expiration::After(Duration::from_millis(millis))
  }

  #[inline]
  pub fn is_finite(&self) -> bool {
    matches!(self, Expiration::After(_))
  }
}

impl From<Duration> for Expiration {
  fn from(duration: Duration) -> Self {
    Expiration::After(duration)
  }
}

/// Per-write options passed to every policy.
///
/// `expires_after: None` means "not specified": a new entry never expires,
/// and an update leaves the existing deadline alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
  pub expires_after: Option<Expiration>,
}

impl SetOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn expires_after(mut self, expiration: impl Into<Expiration>) -> Self {
    self.expires_after = Some(expiration.into());
    self
  }

  pub fn never_expires(mut self) -> Self {
    self.expires_after = Some(Expiration::Never);
    self
  }
}
