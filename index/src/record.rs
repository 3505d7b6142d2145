use crate::error::{Result, StoreError};
use crate::value::IndexValue;

/// The field that identifies a record. It is always indexed and never null.
pub const PRIMARY_INDEX: &str = "id";

/// Field access for anything stored in an [`IndexedStore`](crate::IndexedStore).
///
/// Paths are dot-separated (`"address.city"`). A missing or null field reads
/// as `None`; a field holding something other than a string or number is an
/// [`StoreError::InvalidIndexValue`].
pub trait Record {
  fn field(&self, path: &str) -> Result<Option<IndexValue>>;

  /// Writes `value` at `path`; `None` nulls the field.
  fn set_field(&mut self, path: &str, value: Option<IndexValue>) -> Result<()>;
}

/// Splits a dot path into its segments, rejecting empty ones.
pub(crate) fn split_path(path: &str) -> Result<Vec<&str>> {
  let segments: Vec<&str> = path.split('.').collect();
  if segments.iter().any(|segment| segment.is_empty()) {
    return Err(StoreError::InvalidFieldPath(path.to_string()));
  }
  Ok(segments)
}

#[cfg(feature = "json")]
mod json {
  use super::*;
  use serde_json::{Map, Number, Value};

  fn to_index_value(path: &str, value: &Value) -> Result<Option<IndexValue>> {
    match value {
      Value::Null => Ok(None),
      Value::String(s) => Ok(Some(IndexValue::Str(s.clone()))),
      Value::Number(n) => match n.as_f64() {
        Some(f) => IndexValue::number(f).map(Some),
        None => Err(invalid(path, "number out of range")),
      },
      Value::Bool(_) => Err(invalid(path, "booleans cannot be indexed")),
      Value::Array(_) => Err(invalid(path, "arrays cannot be indexed")),
      Value::Object(_) => Err(invalid(path, "objects cannot be indexed")),
    }
  }

  fn invalid(path: &str, reason: &str) -> StoreError {
    StoreError::InvalidIndexValue {
      path: path.to_string(),
      reason: reason.to_string(),
    }
  }

  fn to_json(value: IndexValue) -> Value {
    match value {
      IndexValue::Str(s) => Value::String(s),
      // Whole numbers are written back as integers.
      IndexValue::Num(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Value::from(n as i64),
      IndexValue::Num(n) => Number::from_f64(n).map_or(Value::Null, Value::Number),
    }
  }

  impl Record for Value {
    fn field(&self, path: &str) -> Result<Option<IndexValue>> {
      let mut current = self;
      for segment in split_path(path)? {
        match current.get(segment) {
          Some(next) => current = next,
          None => return Ok(None),
        }
      }
      to_index_value(path, current)
    }

    fn set_field(&mut self, path: &str, value: Option<IndexValue>) -> Result<()> {
      let segments = split_path(path)?;
      let (leaf, parents) = segments
        .split_last()
        .ok_or_else(|| StoreError::InvalidFieldPath(path.to_string()))?;

      let mut current = self;
      for segment in parents {
        if current.is_null() {
          *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
          return Err(StoreError::InvalidFieldPath(path.to_string()));
        };
        current = map.entry(segment.to_string()).or_insert(Value::Null);
      }

      if current.is_null() {
        *current = Value::Object(Map::new());
      }
      let Value::Object(map) = current else {
        return Err(StoreError::InvalidFieldPath(path.to_string()));
      };
      map.insert(leaf.to_string(), value.map_or(Value::Null, to_json));
      Ok(())
    }
  }

}
