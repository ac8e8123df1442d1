//! Redis-backed coordination store.

use std::time::Duration;

use redis::{Client, Cmd, Connection, FromRedisValue};
use tracing::{debug, trace, warn};

use crate::error::{Result, StoreError};
use crate::key::RecordKey;
use crate::{CoordinationStore, Fields};

/// Coordination store on a shared Redis server.
///
/// Holds at most one connection. Connect, read and write are all bounded by
/// `timeout`. When a call fails because the server is unreachable the
/// connection is dropped and the next call reconnects; the failed call
/// itself is not retried.
pub struct RedisStore {
    client: Client,
    timeout: Duration,
    conn: Option<Connection>,
}

impl RedisStore {
    /// Create a store for `url` without connecting yet.
    pub fn open(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::open(url).map_err(|e| StoreError::Protocol(e.to_string()))?;
        Ok(Self {
            client,
            timeout,
            conn: None,
        })
    }

    /// Create a store and establish the connection immediately.
    pub fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let mut store = Self::open(url, timeout)?;
        store.ensure_connected()?;
        debug!(url, ?timeout, "Connected to coordination store");
        Ok(store)
    }

    /// Whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn ensure_connected(&mut self) -> Result<&mut Connection> {
        if self.conn.is_none() {
            let conn = self.client.get_connection_with_timeout(self.timeout)?;
            conn.set_read_timeout(Some(self.timeout))?;
            conn.set_write_timeout(Some(self.timeout))?;
            self.conn = Some(conn);
        }
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::Unreachable("no connection".into()))
    }

    fn run<T: FromRedisValue>(&mut self, cmd: &Cmd) -> Result<T> {
        let result = {
            let conn = self.ensure_connected()?;
            cmd.query::<T>(conn)
        };
        result.map_err(|e| {
            let err = StoreError::from(e);
            if err.is_unreachable() {
                warn!(error = %err, "Dropping coordination store connection");
                self.conn = None;
            }
            err
        })
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("timeout", &self.timeout)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl CoordinationStore for RedisStore {
    fn set_if_absent(&mut self, key: &RecordKey, value: &str) -> Result<bool> {
        let key = key.to_string();
        trace!(%key, value, "SETNX");
        let mut cmd = redis::cmd("SETNX");
        cmd.arg(&key).arg(value);
        self.run(&cmd)
    }

    fn read_fields(&mut self, key: &RecordKey) -> Result<Fields> {
        let key = key.to_string();
        trace!(%key, "HGETALL");
        let mut cmd = redis::cmd("HGETALL");
        cmd.arg(&key);
        self.run(&cmd)
    }

    fn write_fields(&mut self, key: &RecordKey, fields: &[(&str, String)]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let key = key.to_string();
        trace!(%key, count = fields.len(), "HMSET");
        let mut cmd = redis::cmd("HMSET");
        cmd.arg(&key);
        for (field, value) in fields {
            cmd.arg(*field).arg(value);
        }
        self.run(&cmd)
    }
}
