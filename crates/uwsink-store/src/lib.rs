//! uwsink Coordination Store
//!
//! The shared key-value store is the only channel sinks use to coordinate
//! with each other. This crate hides its wire protocol behind the
//! [`CoordinationStore`] trait so the authentication logic never formats a
//! command itself.
//!
//! # Operations
//!
//! - [`set_if_absent`](CoordinationStore::set_if_absent): atomic create,
//!   `true` iff this call created the key (`SETNX`)
//! - [`read_fields`](CoordinationStore::read_fields): all fields of a hash,
//!   empty when absent (`HGETALL`)
//! - [`write_fields`](CoordinationStore::write_fields): unconditional
//!   overwrite/create of hash fields (`HMSET`)
//!
//! No operation spans more than one key. Expiry is never enforced by the
//! store: records carry an expiration timestamp that readers compare against
//! their own clock.
//!
//! # Backends
//!
//! - [`MemoryStore`]: shared in-process map, used by tests and simulations
//!   that run every sink in one process
//! - [`RedisStore`]: networked Redis backend with bounded timeouts

mod error;
mod key;
mod memory;
mod records;
mod redis_store;

use std::collections::HashMap;

pub use error::{Result, StoreError};
pub use key::{NodeAddr, RecordKey, SinkId};
pub use memory::MemoryStore;
pub use records::{AuthRecord, Credential, ReAuthRecord};
pub use redis_store::RedisStore;

/// Field/value pairs of a hash record.
pub type Fields = HashMap<String, String>;

/// Client side of the shared coordination store.
///
/// Every call is a single blocking round trip. Failures are reported, never
/// retried: callers abandon whatever step needed the store.
pub trait CoordinationStore {
    /// Create `key` with `value` unless it already exists.
    ///
    /// Returns `true` iff this call created the key.
    fn set_if_absent(&mut self, key: &RecordKey, value: &str) -> Result<bool>;

    /// Read every field of the hash at `key`. Empty when the key is absent.
    fn read_fields(&mut self, key: &RecordKey) -> Result<Fields>;

    /// Set the given fields of the hash at `key`, creating it if needed.
    fn write_fields(&mut self, key: &RecordKey, fields: &[(&str, String)]) -> Result<()>;
}

impl<S: CoordinationStore + ?Sized> CoordinationStore for Box<S> {
    fn set_if_absent(&mut self, key: &RecordKey, value: &str) -> Result<bool> {
        (**self).set_if_absent(key, value)
    }

    fn read_fields(&mut self, key: &RecordKey) -> Result<Fields> {
        (**self).read_fields(key)
    }

    fn write_fields(&mut self, key: &RecordKey, fields: &[(&str, String)]) -> Result<()> {
        (**self).write_fields(key, fields)
    }
}

impl<S: CoordinationStore + ?Sized> CoordinationStore for &mut S {
    fn set_if_absent(&mut self, key: &RecordKey, value: &str) -> Result<bool> {
        (**self).set_if_absent(key, value)
    }

    fn read_fields(&mut self, key: &RecordKey) -> Result<Fields> {
        (**self).read_fields(key)
    }

    fn write_fields(&mut self, key: &RecordKey, fields: &[(&str, String)]) -> Result<()> {
        (**self).write_fields(key, fields)
    }
}
