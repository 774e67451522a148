//! Values that outlive the process.
//!
//! A [`PersistedValue`] holds one JSON value under one key of a
//! [`KeyValueStore`], loaded at startup and written through on every change.

mod backend;
mod value;

pub use backend::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use value::{PersistedValue, USER_DATA_KEY};
