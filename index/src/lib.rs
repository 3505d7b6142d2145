//! A multi-index in-memory record store.
//!
//! Every record carries a unique primary key (the `id` field). Secondary
//! indexes map a field's value to the records holding it and are kept
//! consistent across inserts, removals and reindexing. Field paths may be
//! nested, e.g. `address.city`.
//!
//! ```
//! # #[cfg(feature = "json")] {
//! use serde_json::json;
//! use tessel_index::{IndexedStore, Matcher, StoreConfig};
//!
//! let mut people = IndexedStore::new(StoreConfig::new(["team"])).unwrap();
//! people
//!   .insert([json!({ "id": 1, "team": "core" }), json!({ "id": 2, "team": "core" })])
//!   .unwrap();
//!
//! people
//!   .reindex("team", Some("core".into()), Some("ops".into()), Matcher::PrimaryKey(2.into()))
//!   .unwrap();
//! assert_eq!(people.read("team", &"core".into()).unwrap().len(), 1);
//! # }
//! ```

pub mod error;
pub mod record;
pub mod store;
pub mod value;

pub use error::{Result, StoreError};
pub use record::{Record, PRIMARY_INDEX};
pub use store::{IndexedStore, Matcher, Scope, StoreConfig};
pub use value::IndexValue;
