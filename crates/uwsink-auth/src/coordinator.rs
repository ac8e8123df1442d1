//! Authentication Coordinator - first-receiver election and credential checks.
//!
//! This module provides the [`AuthCoordinator`], one per sink. It drives the
//! shared protocol through a [`CoordinationStore`]; it keeps no protocol state
//! of its own besides counters, so any number of sinks can run it against
//! the same store.
//!
//! # Election
//!
//! A broadcast or relayed copy of one transmission may reach several sinks.
//! Each sink calls [`elect`](AuthCoordinator::elect) with the packet's
//! `(source, seq)`; the store's atomic create guarantees exactly one winner.
//! Only the winner traces the packet and runs the authentication step.
//!
//! # Credentials
//!
//! Credentials are never revoked. A source roams between sinks and staleness
//! is detected lazily by comparing stored expiration times with the clock:
//!
//! ```text
//! AUTH_REQUEST            → write auth(S) = {now + key_expiry, me}   → AUTH_GRANT
//! HANDOFF / DATA, no auth → REAUTH_CHALLENGE
//! HANDOFF / DATA, expired → REAUTH_CHALLENGE
//! HANDOFF / DATA, mine    → (nothing)
//! HANDOFF, other sink     → write reAuth(S, me) = {now + reauth_expiry} → REAUTH_ACK
//! DATA, other sink        → reAuth(S, me) valid ? (nothing) : HANDOFF_CHALLENGE
//! ```

use tracing::debug;
use uwsink_store::{AuthRecord, CoordinationStore, NodeAddr, ReAuthRecord, RecordKey, SinkId};

use crate::error::Result;
use crate::role::{RequestRole, ResponseRole};

/// Configuration for an authentication coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthConfig {
    /// Lifetime of a credential issued on `AUTH_REQUEST`, in seconds.
    pub key_expiry: f64,

    /// Lifetime of a hand-off record, in seconds.
    pub reauth_expiry: f64,

    /// Size of an `AUTH_GRANT` packet in bytes.
    pub grant_size: u32,

    /// Size of a challenge packet in bytes.
    pub challenge_size: u32,

    /// Size of a `REAUTH_ACK` packet in bytes.
    pub ack_size: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            key_expiry: 0.0,
            reauth_expiry: 100.0,
            grant_size: 48,
            challenge_size: 10,
            ack_size: 8,
        }
    }
}

impl AuthConfig {
    /// Set the credential lifetime.
    #[must_use]
    pub fn with_key_expiry(mut self, seconds: f64) -> Self {
        self.key_expiry = seconds;
        self
    }

    /// Set the hand-off record lifetime.
    #[must_use]
    pub fn with_reauth_expiry(mut self, seconds: f64) -> Self {
        self.reauth_expiry = seconds;
        self
    }

    /// Set the `AUTH_GRANT` packet size.
    #[must_use]
    pub fn with_grant_size(mut self, bytes: u32) -> Self {
        self.grant_size = bytes;
        self
    }
}

/// Outcome of the authentication step for one packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Credential issued to the source, owned by this sink.
    Granted { expiration: f64 },
    /// No credential (or one without expiration) exists.
    NotAuthenticated,
    /// The credential exists but has expired.
    Expired,
    /// Valid credential owned by this sink.
    Owned,
    /// Hand-off from another sink recorded for this sink.
    HandoffAcknowledged { expiration: f64 },
    /// Valid credential elsewhere and a valid hand-off to this sink.
    HandedOff,
    /// Valid credential elsewhere, but no valid hand-off to this sink.
    HandoffRequired,
}

impl Decision {
    /// The packet to answer with, if any.
    pub const fn response(&self) -> Option<ResponseRole> {
        match self {
            Self::Granted { .. } => Some(ResponseRole::AuthGrant),
            Self::NotAuthenticated | Self::Expired => Some(ResponseRole::ReauthChallenge),
            Self::HandoffAcknowledged { .. } => Some(ResponseRole::ReauthAck),
            Self::HandoffRequired => Some(ResponseRole::HandoffChallenge),
            Self::Owned | Self::HandedOff => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Granted { .. } => write!(f, "Granted"),
            Self::NotAuthenticated => write!(f, "NotAuthenticated"),
            Self::Expired => write!(f, "Expired"),
            Self::Owned => write!(f, "Owned"),
            Self::HandoffAcknowledged { .. } => write!(f, "HandoffAcknowledged"),
            Self::HandedOff => write!(f, "HandedOff"),
            Self::HandoffRequired => write!(f, "HandoffRequired"),
        }
    }
}

/// Per-sink driver of the shared authentication protocol.
#[derive(Debug, Clone)]
pub struct AuthCoordinator {
    sink_id: SinkId,
    config: AuthConfig,
    cross_cluster_handoffs: u64,
    auth_requests_served: u64,
}

impl AuthCoordinator {
    /// Create a coordinator for sink `sink_id`.
    #[must_use]
    pub fn new(sink_id: SinkId, config: AuthConfig) -> Self {
        debug!(
            sink_id,
            key_expiry = config.key_expiry,
            reauth_expiry = config.reauth_expiry,
            "Created authentication coordinator"
        );
        Self {
            sink_id,
            config,
            cross_cluster_handoffs: 0,
            auth_requests_served: 0,
        }
    }

    pub fn sink_id(&self) -> SinkId {
        self.sink_id
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Checks that found a credential owned by another sink.
    pub fn cross_cluster_handoffs(&self) -> u64 {
        self.cross_cluster_handoffs
    }

    /// `AUTH_REQUEST`s answered with a grant.
    pub fn auth_requests_served(&self) -> u64 {
        self.auth_requests_served
    }

    /// Size in bytes of a response packet with the given role.
    pub fn response_size(&self, role: ResponseRole) -> u32 {
        match role {
            ResponseRole::AuthGrant => self.config.grant_size,
            ResponseRole::ReauthChallenge | ResponseRole::HandoffChallenge => self.config.challenge_size,
            ResponseRole::ReauthAck => self.config.ack_size,
        }
    }

    /// Try to become first receiver of packet `(source, seq)`.
    ///
    /// Returns `true` for exactly one caller across all sinks sharing the
    /// store.
    pub fn elect<S>(&self, store: &mut S, source: NodeAddr, seq: u32) -> Result<bool>
    where
        S: CoordinationStore + ?Sized,
    {
        let key = RecordKey::FirstReceiver { source, seq };
        let won = store.set_if_absent(&key, &self.sink_id.to_string())?;
        debug!(sink_id = self.sink_id, source, seq, won, "First-receiver election");
        Ok(won)
    }

    /// Run the authentication step for a packet this sink won the election
    /// for.
    ///
    /// A store error abandons the step; writes already made stay in place
    /// and are safe to repeat on the source's next packet.
    pub fn authenticate<S>(&mut self, store: &mut S, source: NodeAddr, role: RequestRole, now: f64) -> Result<Decision>
    where
        S: CoordinationStore + ?Sized,
    {
        let decision = match role {
            RequestRole::AuthRequest => self.grant(store, source, now)?,
            RequestRole::HandoffReauthRequest | RequestRole::DataAuthCheck => {
                self.check(store, source, role, now)?
            }
        };
        debug!(sink_id = self.sink_id, source, ?role, %decision, "Authentication step");
        Ok(decision)
    }

    fn grant<S>(&mut self, store: &mut S, source: NodeAddr, now: f64) -> Result<Decision>
    where
        S: CoordinationStore + ?Sized,
    {
        let expiration = now + self.config.key_expiry;
        let record = AuthRecord::issue(expiration, self.sink_id);
        store.write_fields(&RecordKey::Auth { source }, &record.to_fields())?;
        self.auth_requests_served += 1;
        Ok(Decision::Granted { expiration })
    }

    fn check<S>(&mut self, store: &mut S, source: NodeAddr, role: RequestRole, now: f64) -> Result<Decision>
    where
        S: CoordinationStore + ?Sized,
    {
        let fields = store.read_fields(&RecordKey::Auth { source })?;
        let record = match AuthRecord::from_fields(&fields) {
            Some(record) if record.is_issued() => record,
            _ => return Ok(Decision::NotAuthenticated),
        };

        let owned = record.is_owned_by(self.sink_id);
        if !owned {
            self.cross_cluster_handoffs += 1;
        }

        if record.is_expired(now) {
            return Ok(Decision::Expired);
        }
        if owned {
            return Ok(Decision::Owned);
        }

        let reauth_key = RecordKey::ReAuth {
            source,
            sink: self.sink_id,
        };
        match role {
            RequestRole::HandoffReauthRequest => {
                let expiration = now + self.config.reauth_expiry;
                let reauth = ReAuthRecord::issue(expiration, self.sink_id);
                store.write_fields(&reauth_key, &reauth.to_fields())?;
                Ok(Decision::HandoffAcknowledged { expiration })
            }
            _ => {
                let fields = store.read_fields(&reauth_key)?;
                match ReAuthRecord::from_fields(&fields) {
                    Some(reauth) if !reauth.is_expired(now) => Ok(Decision::HandedOff),
                    _ => Ok(Decision::HandoffRequired),
                }
            }
        }
    }
}
