use crate::value::IndexValue;

use thiserror::Error;

/// Everything that can go wrong when using an [`IndexedStore`](crate::IndexedStore).
///
/// Lookups that simply find nothing are not errors; they return an empty
/// result or `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
  #[error("Index '{0}' is not defined")]
  IndexNotFound(String),

  #[error("Index '{0}' already exists")]
  IndexAlreadyExists(String),

  #[error("The primary index cannot be dropped")]
  PrimaryIndexDrop,

  #[error("Record has no primary key")]
  MissingPrimaryKey,

  #[error("A record with primary key {0} already exists")]
  DuplicatePrimaryKey(IndexValue),

  #[error("Removing through secondary index '{0}' requires a predicate")]
  PredicateRequired(String),

  #[error("The primary index cannot be reindexed")]
  ReindexOfPrimaryKeyNotAllowed,

  #[error("Old and new values are the same")]
  ReindexingSameValue,

  #[error("Indexing a previously unindexed field requires a primary-key matcher")]
  PrimaryKeyMatcherRequired,

  #[error("Invalid index value at '{path}': {reason}")]
  InvalidIndexValue { path: String, reason: String },

  #[error("Invalid field path '{0}'")]
  InvalidFieldPath(String),
}

/// A specialized `Result` type for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
