//! In-process coordination store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, StoreError};
use crate::key::RecordKey;
use crate::{CoordinationStore, Fields};

#[derive(Debug, Clone)]
enum Value {
    Plain(String),
    Hash(Fields),
}

#[derive(Debug)]
struct MemoryState {
    values: HashMap<String, Value>,
    reachable: bool,
}

/// Shared in-memory store.
///
/// Clones share the same map, so handing one clone to each sink reproduces
/// the "one store, many clients" deployment inside a single process. Keys are
/// the same strings the networked backend uses.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty, reachable store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState {
                values: HashMap::new(),
                reachable: true,
            })),
        }
    }

    /// Make every clone of this store fail with [`StoreError::Unreachable`]
    /// (or recover).
    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Plain string value at `key`, if any.
    pub fn get(&self, key: &RecordKey) -> Option<String> {
        match self.lock().values.get(&key.to_string()) {
            Some(Value::Plain(v)) => Some(v.clone()),
            _ => None,
        }
    }

    /// Whether `key` exists, whatever its type.
    pub fn contains(&self, key: &RecordKey) -> bool {
        self.lock().values.contains_key(&key.to_string())
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.lock().values.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.lock().values.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn reachable(&self) -> Result<MutexGuard<'_, MemoryState>> {
        let state = self.lock();
        if state.reachable {
            Ok(state)
        } else {
            Err(StoreError::Unreachable("memory store switched off".into()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Protocol(format!("WRONGTYPE operation against key {}", key))
}

impl CoordinationStore for MemoryStore {
    fn set_if_absent(&mut self, key: &RecordKey, value: &str) -> Result<bool> {
        let mut state = self.reachable()?;
        let key = key.to_string();
        if state.values.contains_key(&key) {
            return Ok(false);
        }
        state.values.insert(key, Value::Plain(value.to_string()));
        Ok(true)
    }

    fn read_fields(&mut self, key: &RecordKey) -> Result<Fields> {
        let state = self.reachable()?;
        let key = key.to_string();
        match state.values.get(&key) {
            None => Ok(Fields::new()),
            Some(Value::Hash(fields)) => Ok(fields.clone()),
            Some(Value::Plain(_)) => Err(wrong_type(&key)),
        }
    }

    fn write_fields(&mut self, key: &RecordKey, fields: &[(&str, String)]) -> Result<()> {
        let mut state = self.reachable()?;
        let key = key.to_string();
        let entry = state
            .values
            .entry(key.clone())
            .or_insert_with(|| Value::Hash(Fields::new()));
        match entry {
            Value::Hash(existing) => {
                for (field, value) in fields {
                    existing.insert((*field).to_string(), value.clone());
                }
                Ok(())
            }
            Value::Plain(_) => Err(wrong_type(&key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_if_absent_only_once() {
        let mut store = MemoryStore::new();
        let key = RecordKey::FirstReceiver { source: 1, seq: 1 };

        assert!(store.set_if_absent(&key, "7").unwrap());
        assert!(!store.set_if_absent(&key, "8").unwrap());
        assert_eq!(store.get(&key).as_deref(), Some("7"));
    }

    #[test]
    fn clones_share_state() {
        let mut a = MemoryStore::new();
        let mut b = a.clone();
        let key = RecordKey::FirstReceiver { source: 2, seq: 9 };

        assert!(a.set_if_absent(&key, "1").unwrap());
        assert!(!b.set_if_absent(&key, "2").unwrap());
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn hash_write_merges_fields() {
        let mut store = MemoryStore::new();
        let key = RecordKey::Auth { source: 4 };

        store.write_fields(&key, &[("expiration", "1".into()), ("sinkId", "3".into())]).unwrap();
        store.write_fields(&key, &[("expiration", "2".into())]).unwrap();

        let fields = store.read_fields(&key).unwrap();
        assert_eq!(fields.get("expiration").map(String::as_str), Some("2"));
        assert_eq!(fields.get("sinkId").map(String::as_str), Some("3"));
    }

    #[test]
    fn absent_hash_reads_empty() {
        let mut store = MemoryStore::new();
        assert!(store.read_fields(&RecordKey::Auth { source: 1 }).unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn type_mismatch_is_protocol_error() {
        let mut store = MemoryStore::new();
        let key = RecordKey::Auth { source: 1 };
        store.set_if_absent(&key, "x").unwrap();

        assert!(matches!(store.read_fields(&key), Err(StoreError::Protocol(_))));
        assert!(matches!(
            store.write_fields(&key, &[("expiration", "1".into())]),
            Err(StoreError::Protocol(_))
        ));
    }

    #[test]
    fn unreachable_switch() {
        let mut store = MemoryStore::new();
        let observer = store.clone();
        observer.set_reachable(false);

        let key = RecordKey::Auth { source: 1 };
        let err = store.read_fields(&key).unwrap_err();
        assert!(err.is_unreachable());
        assert!(store.set_if_absent(&key, "1").is_err());

        observer.set_reachable(true);
        assert!(store.set_if_absent(&key, "1").unwrap());
    }
}
