use crate::error::{Result, StoreError};
use crate::record::{split_path, Record, PRIMARY_INDEX};
use crate::value::IndexValue;

use std::collections::BTreeMap;
use std::fmt;

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use generational_arena::{Arena, Index};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Secondary indexes to declare up front. The primary index is implicit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
  #[serde(default)]
  pub indexes: Vec<String>,
}

impl StoreConfig {
  pub fn new<I, S>(indexes: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      indexes: indexes.into_iter().map(Into::into).collect(),
    }
  }
}

/// Identifies the record a [`reindex`](IndexedStore::reindex) applies to.
pub enum Matcher<'a, R> {
  /// The record with this primary key.
  PrimaryKey(IndexValue),
  /// The first record in the old value's bucket the predicate accepts.
  Predicate(&'a dyn Fn(&R) -> bool),
}

impl<R> fmt::Debug for Matcher<'_, R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Matcher::PrimaryKey(value) => f.debug_tuple("PrimaryKey").field(value).finish(),
      Matcher::Predicate(_) => f.write_str("Predicate(..)"),
    }
  }
}

/// Which records a bulk query visits.
#[derive(Debug, Clone, PartialEq)]
pub enum Scope<'a> {
  All,
  /// Only the bucket for this value of this index.
  Index(&'a str, IndexValue),
}

struct Stored<R> {
  record: R,
  // The value this record is filed under, per index.
  keys: HashMap<String, IndexValue>,
}

type Bucket = Vec<Index>;

/// An in-memory collection of records, kept consistent across one unique
/// primary index and any number of secondary indexes.
///
/// A record sits in an index's bucket exactly when its indexed field holds
/// that bucket's value. Buckets keep records in the order they were filed.
pub struct IndexedStore<R> {
  records: Arena<Stored<R>>,
  indexes: HashMap<String, HashMap<IndexValue, Bucket>>,
}

impl<R> fmt::Debug for IndexedStore<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("IndexedStore")
      .field("records", &self.records.len())
      .field("indexes", &self.index_names())
      .finish()
  }
}

fn check_index_path(name: &str) -> Result<()> {
  split_path(name).map(|_| ())
}

impl<R> IndexedStore<R> {
  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.len() == 0
  }

  /// Every record, in storage order.
  pub fn iter(&self) -> impl Iterator<Item = &R> + '_ {
    self.records.iter().map(|(_, stored)| &stored.record)
  }

  /// Declared index names, sorted. Includes the primary index.
  pub fn index_names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.indexes.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  pub fn has_index(&self, name: &str) -> bool {
    self.indexes.contains_key(name)
  }
}

impl<R: Record> IndexedStore<R> {
  pub fn new(config: StoreConfig) -> Result<Self> {
    let mut indexes = HashMap::new();
    indexes.insert(PRIMARY_INDEX.to_string(), HashMap::new());
    let mut store = Self {
      records: Arena::new(),
      indexes,
    };
    store.create_indexes(config.indexes)?;
    Ok(store)
  }

  fn index(&self, name: &str) -> Result<&HashMap<IndexValue, Bucket>> {
    self
      .indexes
      .get(name)
      .ok_or_else(|| StoreError::IndexNotFound(name.to_string()))
  }

  fn bucket(&self, name: &str, value: &IndexValue) -> Result<&[Index]> {
    value.validate(name)?;
    Ok(self.index(name)?.get(value).map_or(&[][..], Vec::as_slice))
  }

  fn resolve(&self, ids: &[Index]) -> Vec<&R> {
    ids
      .iter()
      .filter_map(|id| self.records.get(*id).map(|stored| &stored.record))
      .collect()
  }

  fn file(&mut self, index: &str, value: IndexValue, id: Index) {
    if let Some(buckets) = self.indexes.get_mut(index) {
      buckets.entry(value).or_default().push(id);
    }
  }

  fn unfile(&mut self, index: &str, value: &IndexValue, id: Index) {
    let Some(buckets) = self.indexes.get_mut(index) else {
      return;
    };
    if let Some(bucket) = buckets.get_mut(value) {
      bucket.retain(|existing| *existing != id);
      if bucket.is_empty() {
        buckets.remove(value);
      }
    }
  }

  /// Index values of `record` for every declared index.
  fn keys_of(&self, record: &R) -> Result<HashMap<String, IndexValue>> {
    let mut keys = HashMap::with_capacity(self.indexes.len());
    for name in self.indexes.keys() {
      if let Some(value) = record.field(name)? {
        keys.insert(name.clone(), value);
      }
    }
    Ok(keys)
  }

  /// Adds a batch of records.
  ///
  /// The batch is validated as a whole: if any record lacks a primary key,
  /// repeats one, or carries an unindexable value, nothing is inserted.
  pub fn insert<I>(&mut self, records: I) -> Result<()>
  where
    I: IntoIterator<Item = R>,
  {
    let mut prepared = Vec::new();
    let mut seen = HashSet::new();
    for record in records {
      let keys = self.keys_of(&record)?;
      let primary = keys.get(PRIMARY_INDEX).cloned().ok_or(StoreError::MissingPrimaryKey)?;
      if self.index(PRIMARY_INDEX)?.contains_key(&primary) || !seen.insert(primary.clone()) {
        return Err(StoreError::DuplicatePrimaryKey(primary));
      }
      prepared.push((record, keys));
    }

    let count = prepared.len();
    for (record, keys) in prepared {
      let filed: Vec<(String, IndexValue)> = keys.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
      let id = self.records.insert(Stored { record, keys });
      for (index, value) in filed {
        self.file(&index, value, id);
      }
    }
    trace!(count, total = self.records.len(), "records inserted");
    Ok(())
  }

  /// Looks a record up by primary key.
  pub fn get(&self, primary_key: &IndexValue) -> Result<Option<&R>> {
    Ok(self.read(PRIMARY_INDEX, primary_key)?.into_iter().next())
  }

  /// Records filed under `value` in `index`, in filing order.
  pub fn read(&self, index: &str, value: &IndexValue) -> Result<Vec<&R>> {
    Ok(self.resolve(self.bucket(index, value)?))
  }

  /// The whole index, bucket by bucket, ordered by value.
  pub fn read_index(&self, index: &str) -> Result<BTreeMap<&IndexValue, Vec<&R>>> {
    Ok(
      self
        .index(index)?
        .iter()
        .map(|(value, ids)| (value, self.resolve(ids)))
        .collect(),
    )
  }

  /// Removes one record found through `index`.
  ///
  /// Through the primary index the value identifies the record on its own.
  /// Through a secondary index a bucket may hold several records, so a
  /// predicate picking exactly one of them is required. Returns `false` if
  /// no record matched.
  pub fn remove(&mut self, index: &str, value: &IndexValue, predicate: Option<&dyn Fn(&R) -> bool>) -> Result<bool> {
    if index != PRIMARY_INDEX && predicate.is_none() {
      return Err(StoreError::PredicateRequired(index.to_string()));
    }
    let found = self.bucket(index, value)?.iter().copied().find(|id| {
      self
        .records
        .get(*id)
        .is_some_and(|stored| predicate.map_or(true, |accept| accept(&stored.record)))
    });
    let Some(id) = found else {
      return Ok(false);
    };

    if let Some(stored) = self.records.remove(id) {
      for (name, key) in &stored.keys {
        self.unfile(name, key, id);
      }
      trace!(index, %value, "record removed");
    }
    Ok(true)
  }

  /// Changes the value of an indexed field and moves the record between
  /// buckets accordingly.
  ///
  /// - `old = None, new = Some`: files a record that was not indexed on this
  ///   field; the matcher must be [`Matcher::PrimaryKey`].
  /// - `old = Some, new = Some`: moves the record from one bucket to another.
  /// - `old = Some, new = None`: unfiles the record and nulls the field.
  ///
  /// Returns `false` if no record matched.
  pub fn reindex(
    &mut self,
    index: &str,
    old: Option<IndexValue>,
    new: Option<IndexValue>,
    matcher: Matcher<'_, R>,
  ) -> Result<bool> {
    if index == PRIMARY_INDEX {
      return Err(StoreError::ReindexOfPrimaryKeyNotAllowed);
    }
    self.index(index)?;
    if old == new {
      return Err(StoreError::ReindexingSameValue);
    }
    for value in old.iter().chain(new.iter()) {
      value.validate(index)?;
    }

    let found = match (&old, &matcher) {
      (None, Matcher::PrimaryKey(primary)) => self
        .bucket(PRIMARY_INDEX, primary)?
        .first()
        .copied()
        .filter(|id| self.records.get(*id).is_some_and(|stored| !stored.keys.contains_key(index))),
      (None, Matcher::Predicate(_)) => return Err(StoreError::PrimaryKeyMatcherRequired),
      (Some(old), Matcher::PrimaryKey(primary)) => {
        primary.validate(PRIMARY_INDEX)?;
        self.bucket(index, old)?.iter().copied().find(|id| {
          self
            .records
            .get(*id)
            .is_some_and(|stored| stored.keys.get(PRIMARY_INDEX) == Some(primary))
        })
      }
      (Some(old), Matcher::Predicate(accept)) => self
        .bucket(index, old)?
        .iter()
        .copied()
        .find(|id| self.records.get(*id).is_some_and(|stored| accept(&stored.record))),
    };
    let Some(id) = found else {
      return Ok(false);
    };

    let Some(stored) = self.records.get_mut(id) else {
      return Ok(false);
    };
    stored.record.set_field(index, new.clone())?;
    match &new {
      Some(value) => stored.keys.insert(index.to_string(), value.clone()),
      None => stored.keys.remove(index),
    };

    if let Some(old) = &old {
      self.unfile(index, old, id);
    }
    if let Some(new) = new {
      self.file(index, new, id);
    }
    trace!(index, "record reindexed");
    Ok(true)
  }

  /// Declares new secondary indexes and files every existing record under
  /// them. Either all indexes are created or none is.
  pub fn create_indexes<I, S>(&mut self, names: I) -> Result<()>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    let mut unique = HashSet::new();
    for name in &names {
      check_index_path(name)?;
      if self.indexes.contains_key(name) || !unique.insert(name.as_str()) {
        return Err(StoreError::IndexAlreadyExists(name.clone()));
      }
    }

    // Read every value before touching anything.
    let mut filings = Vec::new();
    for (id, stored) in self.records.iter() {
      for name in &names {
        if let Some(value) = stored.record.field(name)? {
          filings.push((id, name.clone(), value));
        }
      }
    }

    for name in &names {
      self.indexes.insert(name.clone(), HashMap::new());
      debug!(index = %name, "index created");
    }
    for (id, name, value) in filings {
      if let Some(stored) = self.records.get_mut(id) {
        stored.keys.insert(name.clone(), value.clone());
      }
      self.file(&name, value, id);
    }
    Ok(())
  }

  pub fn drop_index(&mut self, name: &str) -> Result<()> {
    self.drop_indexes([name])
  }

  /// Removes secondary indexes. Records stay in the store. Either all
  /// indexes are dropped or none is.
  pub fn drop_indexes<'n, I>(&mut self, names: I) -> Result<()>
  where
    I: IntoIterator<Item = &'n str>,
  {
    let names: Vec<&str> = names.into_iter().collect();
    for name in &names {
      if *name == PRIMARY_INDEX {
        return Err(StoreError::PrimaryIndexDrop);
      }
      self.index(name)?;
    }
    for name in names {
      if self.indexes.remove(name).is_some() {
        for (_, stored) in self.records.iter_mut() {
          stored.keys.remove(name);
        }
        debug!(index = name, "index dropped");
      }
    }
    Ok(())
  }

  fn scoped(&self, scope: &Scope<'_>) -> Result<Vec<&R>> {
    match scope {
      Scope::All => Ok(self.iter().collect()),
      Scope::Index(index, value) => self.read(index, value),
    }
  }

  pub fn map<T, F>(&self, scope: Scope<'_>, f: F) -> Result<Vec<T>>
  where
    F: FnMut(&R) -> T,
  {
    Ok(self.scoped(&scope)?.into_iter().map(f).collect())
  }

  pub fn filter<F>(&self, scope: Scope<'_>, mut predicate: F) -> Result<Vec<&R>>
  where
    F: FnMut(&R) -> bool,
  {
    Ok(self.scoped(&scope)?.into_iter().filter(|record| predicate(*record)).collect())
  }

  pub fn find<F>(&self, scope: Scope<'_>, mut predicate: F) -> Result<Option<&R>>
  where
    F: FnMut(&R) -> bool,
  {
    Ok(self.scoped(&scope)?.into_iter().find(|record| predicate(*record)))
  }
}
