//! A typed value mirrored to a durable key-value store.

use super::backend::KeyValueStore;
use crate::error::{PanelError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Key the signed-in user's data lives under.
pub const USER_DATA_KEY: &str = "userData";

/// A value of type `T` (or absent) kept in sync with one key of a
/// [`KeyValueStore`].
///
/// The backend is read once, on construction. After that the in-memory copy
/// is authoritative and every write goes straight through to the backend
/// before returning.
pub struct PersistedValue<T, S> {
    backend: S,
    key: String,
    value: Option<T>,
}

impl<T, S> PersistedValue<T, S>
where
    T: Serialize + DeserializeOwned,
    S: KeyValueStore,
{
    /// Hydrate from `backend[key]`.
    ///
    /// A missing key, an unreadable entry, or an entry that is not valid JSON
    /// for `T` all load as absent. Only the latter two are logged.
    pub fn load(backend: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let value = Self::read_backend(&backend, &key);

        Self {
            backend,
            key,
            value,
        }
    }

    /// The user data slot (`"userData"`).
    pub fn user_data(backend: S) -> Self {
        Self::load(backend, USER_DATA_KEY)
    }

    fn read_backend(backend: &S, key: &str) -> Option<T> {
        let raw = match backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "failed to read persisted value; treating as absent");
                return None;
            }
        };

        if raw.trim() == "null" {
            return None;
        }

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "loaded persisted value");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "failed to parse persisted value; treating as absent");
                None
            }
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value.
    pub fn read(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    /// Replace the value. `None` deletes the key.
    ///
    /// The backend is updated first; on error the in-memory value is left
    /// as it was.
    pub fn write(&mut self, value: Option<T>) -> Result<()> {
        let encoded = match value {
            Some(ref v) => Some(
                serde_json::to_string(v).map_err(|e| PanelError::Serialization(e.to_string()))?,
            ),
            None => None,
        };

        match encoded.as_deref() {
            // Values that serialize to null are stored as absent.
            Some("null") | None => self.backend.remove(&self.key)?,
            Some(json) => self.backend.set(&self.key, json)?,
        }

        self.value = match encoded.as_deref() {
            Some("null") => None,
            _ => value,
        };
        Ok(())
    }

    pub fn set(&mut self, value: T) -> Result<()> {
        self.write(Some(value))
    }

    pub fn clear(&mut self) -> Result<()> {
        self.write(None)
    }

    /// Remove and return the value, deleting the key.
    pub fn take(&mut self) -> Result<Option<T>>
    where
        T: Clone,
    {
        let previous = self.value.clone();
        self.write(None)?;
        Ok(previous)
    }

    /// Edit the value in place and write the result through.
    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Option<T>),
        T: Clone,
    {
        let mut next = self.value.clone();
        f(&mut next);
        self.write(next)
    }

    /// Re-read from the backend, discarding the in-memory value.
    pub fn reload(&mut self) {
        self.value = Self::read_backend(&self.backend, &self.key);
    }
}

impl<T: fmt::Debug, S> fmt::Debug for PersistedValue<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedValue")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryKeyValueStore;
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        role: String,
    }

    fn ana() -> User {
        User {
            name: "ana".into(),
            role: "waiter".into(),
        }
    }

    #[test]
    fn test_round_trip_through_fresh_instance() {
        let backend = MemoryKeyValueStore::new();

        let mut value: PersistedValue<User, _> = PersistedValue::user_data(backend.clone());
        assert!(value.read().is_none());
        value.set(ana()).unwrap();

        let fresh: PersistedValue<User, _> = PersistedValue::user_data(backend.clone());
        assert_eq!(fresh.read(), Some(&ana()));
        assert!(backend.get(USER_DATA_KEY).unwrap().is_some());
    }

    #[test]
    fn test_write_absent_deletes_key() {
        let backend = MemoryKeyValueStore::new();
        let mut value: PersistedValue<User, _> = PersistedValue::user_data(backend.clone());

        value.set(ana()).unwrap();
        value.clear().unwrap();

        assert!(value.read().is_none());
        assert_eq!(backend.get(USER_DATA_KEY).unwrap(), None);

        let fresh: PersistedValue<User, _> = PersistedValue::user_data(backend);
        assert!(fresh.read().is_none());
    }

    #[test]
    fn test_corrupted_entry_loads_absent() {
        let backend = MemoryKeyValueStore::new();
        backend.set(USER_DATA_KEY, "{\"name\": ").unwrap();

        let value: PersistedValue<User, _> = PersistedValue::user_data(backend.clone());
        assert!(value.read().is_none());
        // The corrupt entry is left alone until the next write.
        assert!(backend.get(USER_DATA_KEY).unwrap().is_some());
    }

    #[test]
    fn test_wrong_shape_loads_absent() {
        let backend = MemoryKeyValueStore::new();
        backend.set(USER_DATA_KEY, "[1, 2, 3]").unwrap();

        let value: PersistedValue<User, _> = PersistedValue::user_data(backend);
        assert!(!value.is_present());
    }

    #[test]
    fn test_null_serialization_is_absent() {
        let backend = MemoryKeyValueStore::new();
        let mut value: PersistedValue<Option<u32>, _> = PersistedValue::load(backend.clone(), "n");

        value.set(Some(3)).unwrap();
        assert_eq!(backend.get("n").unwrap().as_deref(), Some("3"));

        value.set(None).unwrap();
        assert!(value.read().is_none());
        assert_eq!(backend.get("n").unwrap(), None);
    }

    #[test]
    fn test_update_and_take() {
        let backend = MemoryKeyValueStore::new();
        let mut value: PersistedValue<User, _> = PersistedValue::user_data(backend.clone());
        value.set(ana()).unwrap();

        value
            .update(|user| {
                if let Some(user) = user {
                    user.role = "manager".into();
                }
            })
            .unwrap();

        let fresh: PersistedValue<User, _> = PersistedValue::user_data(backend.clone());
        assert_eq!(fresh.read().unwrap().role, "manager");

        let taken = value.take().unwrap();
        assert_eq!(taken.unwrap().role, "manager");
        assert!(backend.is_empty());
    }

    #[test]
    fn test_reload_sees_external_write() {
        let backend = MemoryKeyValueStore::new();
        let mut value: PersistedValue<u32, _> = PersistedValue::load(backend.clone(), "count");
        assert!(value.read().is_none());

        backend.set("count", "7").unwrap();
        value.reload();
        assert_eq!(value.read(), Some(&7));
    }
}
