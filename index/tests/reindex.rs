mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tessel_index::{IndexValue, Matcher, StoreError};

#[test]
fn test_round_trip_restores_bucket_membership() {
  let mut store = people();
  let before = store.read_index("team").unwrap().into_iter().map(|(v, r)| (v.clone(), ids_of(r))).collect::<Vec<_>>();

  for id in [3, 6, 9] {
    assert!(store
      .reindex("team", Some("core".into()), Some("qa".into()), Matcher::PrimaryKey(id.into()))
      .unwrap());
    assert!(!bucket(&store, "team", "core").contains(&(id as i64)));
    assert!(bucket(&store, "team", "qa").contains(&(id as i64)));
    assert_indexes_consistent(&store);
  }
  assert!(bucket(&store, "team", "core").is_empty());

  for id in [3, 6, 9] {
    store
      .reindex("team", Some("qa".into()), Some("core".into()), Matcher::PrimaryKey(id.into()))
      .unwrap();
  }
  let after = store.read_index("team").unwrap().into_iter().map(|(v, r)| (v.clone(), ids_of(r))).collect::<Vec<_>>();
  assert_eq!(before, after);
}

#[test]
fn test_every_record_round_trips_through_every_value() {
  let mut store = people();
  let teams = ["core", "ops", "web"];
  for id in 1..=10i64 {
    let Some(home) = store.get(&id.into()).unwrap().and_then(|r| r["team"].as_str().map(str::to_owned)) else {
      continue;
    };
    for away in teams.iter().filter(|t| **t != home) {
      store
        .reindex("team", Some(home.as_str().into()), Some((*away).into()), Matcher::PrimaryKey(id.into()))
        .unwrap();
      assert!(bucket(&store, "team", *away).contains(&id));
      store
        .reindex("team", Some((*away).into()), Some(home.as_str().into()), Matcher::PrimaryKey(id.into()))
        .unwrap();
      assert!(bucket(&store, "team", home.as_str()).contains(&id));
    }
  }
  assert_eq!(bucket(&store, "team", "core"), vec![3, 6, 9]);
  assert_eq!(bucket(&store, "team", "ops"), vec![1, 7, 10]);
  assert_eq!(bucket(&store, "team", "web"), vec![2, 5]);
  assert_indexes_consistent(&store);
}

#[test]
fn test_nested_field_reindex_updates_record() {
  let mut store = people();
  let fourth = |r: &Value| r["id"] == 4;
  assert!(store
    .reindex("address.city", Some("Oslo".into()), Some("Bergen".into()), Matcher::Predicate(&fourth))
    .unwrap());
  assert_eq!(store.get(&4.into()).unwrap().unwrap()["address"]["city"], "Bergen");
  assert_eq!(bucket(&store, "address.city", "Bergen"), vec![4]);
  assert_indexes_consistent(&store);
}

#[test]
fn test_index_then_unindex_teamless_record() {
  let mut store = people();
  assert!(store
    .reindex("team", None, Some("ops".into()), Matcher::PrimaryKey(8.into()))
    .unwrap());
  assert_eq!(bucket(&store, "team", "ops"), vec![1, 7, 8, 10]);

  assert!(store
    .reindex("team", Some("ops".into()), None, Matcher::PrimaryKey(8.into()))
    .unwrap());
  assert_eq!(bucket(&store, "team", "ops"), vec![1, 7, 10]);
  assert_eq!(store.get(&8.into()).unwrap().unwrap()["team"], Value::Null);
  assert_eq!(store.len(), 10);
  assert_indexes_consistent(&store);
}

#[test]
fn test_numeric_values_reindex() {
  let mut store = people();
  store.create_indexes(["score"]).unwrap();
  assert!(store
    .reindex("score", None, Some(IndexValue::number(-0.0).unwrap()), Matcher::PrimaryKey(1.into()))
    .unwrap());
  assert_eq!(bucket(&store, "score", 0), vec![1]);

  assert_eq!(
    store
      .reindex("score", Some(0.into()), Some(IndexValue::Num(-0.0)), Matcher::PrimaryKey(1.into()))
      .unwrap_err(),
    StoreError::ReindexingSameValue
  );
  assert!(store
    .reindex("score", Some(0.into()), Some(IndexValue::number(2.5).unwrap()), Matcher::PrimaryKey(1.into()))
    .unwrap());
  assert_eq!(bucket(&store, "score", IndexValue::Num(2.5)), vec![1]);
  assert_indexes_consistent(&store);
}
