//! Credential records kept in the store.

use crate::key::SinkId;
use crate::Fields;

const EXPIRATION: &str = "expiration";
const SINK_ID: &str = "sinkId";

/// An expiring claim held by a sink.
///
/// Stored as a hash with fields `expiration` (simulation seconds) and
/// `sinkId`. A record whose expiration is missing or unreadable counts as
/// never issued.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Credential {
    pub expiration: Option<f64>,
    pub sink_id: Option<SinkId>,
}

/// Credential of a source node (`node:auth_status:*`).
pub type AuthRecord = Credential;

/// Completed hand-off to one sink (`node:re_auth_status:*`).
pub type ReAuthRecord = Credential;

impl Credential {
    /// A credential owned by `sink_id` that expires at `expiration`.
    pub fn issue(expiration: f64, sink_id: SinkId) -> Self {
        Self {
            expiration: Some(expiration),
            sink_id: Some(sink_id),
        }
    }

    /// Decode from hash fields. `None` when the hash is empty (key absent).
    pub fn from_fields(fields: &Fields) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        let expiration = fields
            .get(EXPIRATION)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite());
        let sink_id = fields.get(SINK_ID).and_then(|v| v.trim().parse().ok());
        Some(Self { expiration, sink_id })
    }

    /// Encode as hash fields. Missing values are left out.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::with_capacity(2);
        if let Some(expiration) = self.expiration {
            fields.push((EXPIRATION, expiration.to_string()));
        }
        if let Some(sink_id) = self.sink_id {
            fields.push((SINK_ID, sink_id.to_string()));
        }
        fields
    }

    /// Whether the record carries a usable expiration.
    ///
    /// A stored `0` is the "never authenticated" marker, same as a missing
    /// field.
    pub fn is_issued(&self) -> bool {
        matches!(self.expiration, Some(expiration) if expiration != 0.0)
    }

    /// Expired at `now`; a record that was never issued is always expired.
    pub fn is_expired(&self, now: f64) -> bool {
        match self.expiration {
            Some(expiration) if self.is_issued() => now > expiration,
            _ => true,
        }
    }

    /// Whether `sink` owns this credential.
    pub fn is_owned_by(&self, sink: SinkId) -> bool {
        self.sink_id == Some(sink)
    }
}
