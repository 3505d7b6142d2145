use std::fmt;

/// Errors that can occur when building a cache or one of its policies.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
  /// A Segmented-LRU policy was configured with a capacity of zero.
  ZeroCapacity,
  /// The protected ratio must lie strictly between 0 and 1.
  InvalidProtectedRatio(f64),
  /// The expiration collector cannot tick with a zero period.
  ZeroCheckInterval,
  /// The expiration collector must inspect at least one entry per tick.
  ZeroIterateCount,
  /// A configuration value could not be turned into a policy.
  Config(String),
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::ZeroCapacity => write!(f, "cache capacity cannot be zero"),
      BuildError::InvalidProtectedRatio(ratio) => {
        write!(f, "protected ratio must be within (0, 1), got {ratio}")
      }
      BuildError::ZeroCheckInterval => write!(f, "collector check interval cannot be zero"),
      BuildError::ZeroIterateCount => write!(f, "collector iterate count cannot be zero"),
      BuildError::Config(message) => write!(f, "invalid cache configuration: {message}"),
    }
  }
}

impl std::error::Error for BuildError {}
