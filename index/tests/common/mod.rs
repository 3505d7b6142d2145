#![allow(dead_code)]

use serde_json::{json, Value};
use tessel_index::{IndexValue, IndexedStore, Record, StoreConfig};

pub fn person(id: i64, name: &str, team: Option<&str>, city: Option<&str>) -> Value {
  let mut record = json!({ "id": id, "name": name });
  if let Some(team) = team {
    record["team"] = json!(team);
  }
  if let Some(city) = city {
    record["address"] = json!({ "city": city });
  }
  record
}

/// Ten people over three teams and two cities; `id % 4 == 0` has no team.
pub fn people() -> IndexedStore<Value> {
  let mut store = IndexedStore::new(StoreConfig::new(["team", "address.city"])).unwrap();
  let teams = ["core", "ops", "web"];
  let records = (1..=10).map(|id| {
    let team = (id % 4 != 0).then(|| teams[(id % 3) as usize]);
    let city = if id % 2 == 0 { "Oslo" } else { "Lima" };
    person(id, &format!("p{id}"), team, Some(city))
  });
  store.insert(records).unwrap();
  store
}

pub fn ids_of(records: Vec<&Value>) -> Vec<i64> {
  let mut ids: Vec<i64> = records.into_iter().map(|r| r["id"].as_i64().unwrap()).collect();
  ids.sort_unstable();
  ids
}

pub fn bucket(store: &IndexedStore<Value>, index: &str, value: impl Into<IndexValue>) -> Vec<i64> {
  ids_of(store.read(index, &value.into()).unwrap())
}

/// Checks that every index files each record exactly under its current value.
pub fn assert_indexes_consistent(store: &IndexedStore<Value>) {
  for name in store.index_names() {
    let mut filed = 0;
    for (value, records) in store.read_index(name).unwrap() {
      assert!(!records.is_empty(), "empty bucket {value} left in {name}");
      for record in records {
        assert_eq!(record.field(name).unwrap().as_ref(), Some(value), "index {name}");
        filed += 1;
      }
    }
    let holders = store.iter().filter(|r| r.field(name).unwrap().is_some()).count();
    assert_eq!(filed, holders, "index {name} misses records");
  }
}
