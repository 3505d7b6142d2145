use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tessel_index::{IndexedStore, StoreConfig, StoreError};

#[test]
fn test_store_config_from_yaml() {
  let config: StoreConfig = serde_yaml::from_str("indexes:\n  - team\n  - address.city\n").unwrap();
  assert_eq!(config, StoreConfig::new(["team", "address.city"]));

  let store = IndexedStore::<Value>::new(config).unwrap();
  assert_eq!(store.index_names(), vec!["address.city", "id", "team"]);
}

#[test]
fn test_empty_config_has_only_primary_index() {
  let config: StoreConfig = serde_yaml::from_str("{}").unwrap();
  let mut store = IndexedStore::new(config).unwrap();
  store.insert([json!({ "id": "a" })]).unwrap();
  assert_eq!(store.index_names(), vec!["id"]);
}

#[test]
fn test_unknown_config_keys_are_rejected() {
  let err = serde_yaml::from_str::<StoreConfig>("indexes: []\nunique: [email]\n").unwrap_err();
  assert!(err.to_string().contains("unique"));
}

#[test]
fn test_config_with_bad_path_fails_construction() {
  let config: StoreConfig = serde_yaml::from_str("indexes: ['team.']\n").unwrap();
  assert_eq!(
    IndexedStore::<Value>::new(config).unwrap_err(),
    StoreError::InvalidFieldPath("team.".into())
  );
}
