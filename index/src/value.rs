use crate::error::{Result, StoreError};

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A value a record can be indexed under: a string or a number.
///
/// Numbers compare by value with `-0.0` equal to `0.0`. `NaN` is not a valid
/// index value; [`IndexValue::number`] rejects it and the store refuses it
/// everywhere it accepts a value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexValue {
  Str(String),
  Num(f64),
}

impl IndexValue {
  pub fn number(value: f64) -> Result<Self> {
    if value.is_nan() {
      return Err(StoreError::InvalidIndexValue {
        path: String::new(),
        reason: "NaN is not a valid index value".into(),
      });
    }
    Ok(IndexValue::Num(canonical(value)))
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      IndexValue::Str(s) => Some(s),
      IndexValue::Num(_) => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      IndexValue::Num(n) => Some(*n),
      IndexValue::Str(_) => None,
    }
  }

  /// Checks the value can be used as a bucket key.
  pub(crate) fn validate(&self, path: &str) -> Result<()> {
    match self {
      IndexValue::Num(n) if n.is_nan() => Err(StoreError::InvalidIndexValue {
        path: path.to_string(),
        reason: "NaN is not a valid index value".into(),
      }),
      _ => Ok(()),
    }
  }
}

#[inline]
fn canonical(value: f64) -> f64 {
  if value == 0.0 {
    0.0
  } else {
    value
  }
}

impl PartialEq for IndexValue {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (IndexValue::Str(a), IndexValue::Str(b)) => a == b,
      (IndexValue::Num(a), IndexValue::Num(b)) => canonical(*a).to_bits() == canonical(*b).to_bits(),
      _ => false,
    }
  }
}

impl Eq for IndexValue {}

impl Hash for IndexValue {
  fn hash<H: Hasher>(&self, state: &mut H) {
    match self {
      IndexValue::Str(s) => {
        state.write_u8(0);
        s.hash(state);
      }
      IndexValue::Num(n) => {
        state.write_u8(1);
        canonical(*n).to_bits().hash(state);
      }
    }
  }
}

/// Numbers sort before strings.
impl Ord for IndexValue {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self, other) {
      (IndexValue::Num(a), IndexValue::Num(b)) => canonical(*a).total_cmp(&canonical(*b)),
      (IndexValue::Str(a), IndexValue::Str(b)) => a.cmp(b),
      (IndexValue::Num(_), IndexValue::Str(_)) => Ordering::Less,
      (IndexValue::Str(_), IndexValue::Num(_)) => Ordering::Greater,
    }
  }
}

impl PartialOrd for IndexValue {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl fmt::Display for IndexValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      IndexValue::Str(s) => write!(f, "{s:?}"),
      IndexValue::Num(n) => write!(f, "{n}"),
    }
  }
}

impl From<&str> for IndexValue {
  fn from(value: &str) -> Self {
    IndexValue::Str(value.to_string())
  }
}

impl From<String> for IndexValue {
  fn from(value: String) -> Self {
    IndexValue::Str(value)
  }
}

macro_rules! from_integer {
  ($($ty:ty),*) => {
    $(
      impl From<$ty> for IndexValue {
        fn from(value: $ty) -> Self {
          IndexValue::Num(value as f64)
        }
      }
    )*
  };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl TryFrom<f64> for IndexValue {
  type Error = StoreError;

  fn try_from(value: f64) -> Result<Self> {
    IndexValue::number(value)
  }
}
