//! Role tags carried by authentication traffic.

use crate::error::Error;

/// Wire values of the role tag.
///
/// Requests and responses share the numeric space; a tag is interpreted by
/// direction.
pub mod tags {
    pub const AUTH_REQUEST: u32 = 5;
    pub const HANDOFF_REAUTH_REQUEST: u32 = 8;
    pub const DATA_AUTH_CHECK: u32 = 10;

    pub const AUTH_GRANT: u32 = 5;
    pub const REAUTH_CHALLENGE: u32 = 6;
    pub const HANDOFF_CHALLENGE: u32 = 7;
    pub const REAUTH_ACK: u32 = 8;
}

/// Inbound roles that trigger authentication logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RequestRole {
    /// Source asks for a fresh credential.
    AuthRequest,
    /// Source that holds a credential from another sink announces itself.
    HandoffReauthRequest,
    /// Data packet whose source must be authenticated.
    DataAuthCheck,
}

impl RequestRole {
    /// Decode an inbound tag. `None` for traffic without authentication
    /// semantics.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            tags::AUTH_REQUEST => Some(Self::AuthRequest),
            tags::HANDOFF_REAUTH_REQUEST => Some(Self::HandoffReauthRequest),
            tags::DATA_AUTH_CHECK => Some(Self::DataAuthCheck),
            _ => None,
        }
    }

    pub const fn tag(self) -> u32 {
        match self {
            Self::AuthRequest => tags::AUTH_REQUEST,
            Self::HandoffReauthRequest => tags::HANDOFF_REAUTH_REQUEST,
            Self::DataAuthCheck => tags::DATA_AUTH_CHECK,
        }
    }
}

impl TryFrom<u32> for RequestRole {
    type Error = Error;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        Self::from_tag(tag).ok_or(Error::UnknownRole(tag))
    }
}

/// Roles of the packets a sink answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ResponseRole {
    /// Credential issued.
    AuthGrant,
    /// No valid credential: authenticate again.
    ReauthChallenge,
    /// Valid credential elsewhere, but no hand-off to this sink yet.
    HandoffChallenge,
    /// Hand-off to this sink recorded.
    ReauthAck,
}

impl ResponseRole {
    pub const fn tag(self) -> u32 {
        match self {
            Self::AuthGrant => tags::AUTH_GRANT,
            Self::ReauthChallenge => tags::REAUTH_CHALLENGE,
            Self::HandoffChallenge => tags::HANDOFF_CHALLENGE,
            Self::ReauthAck => tags::REAUTH_ACK,
        }
    }

    /// Whether the source is asked to (re-)authenticate.
    pub const fn is_challenge(self) -> bool {
        matches!(self, Self::ReauthChallenge | Self::HandoffChallenge)
    }
}

impl std::fmt::Display for ResponseRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthGrant => write!(f, "AUTH_GRANT"),
            Self::ReauthChallenge => write!(f, "REAUTH_CHALLENGE"),
            Self::HandoffChallenge => write!(f, "HANDOFF_CHALLENGE"),
            Self::ReauthAck => write!(f, "REAUTH_ACK"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_tags_decode() {
        assert_eq!(RequestRole::from_tag(5), Some(RequestRole::AuthRequest));
        assert_eq!(RequestRole::from_tag(8), Some(RequestRole::HandoffReauthRequest));
        assert_eq!(RequestRole::from_tag(10), Some(RequestRole::DataAuthCheck));
        assert_eq!(RequestRole::from_tag(0), None);
        assert_eq!(RequestRole::from_tag(6), None);
    }

    #[test]
    fn request_tags_roundtrip() {
        for role in [
            RequestRole::AuthRequest,
            RequestRole::HandoffReauthRequest,
            RequestRole::DataAuthCheck,
        ] {
            assert_eq!(RequestRole::try_from(role.tag()).unwrap(), role);
        }
        assert!(matches!(RequestRole::try_from(3), Err(Error::UnknownRole(3))));
    }

    #[test]
    fn response_tags() {
        assert_eq!(ResponseRole::AuthGrant.tag(), 5);
        assert_eq!(ResponseRole::ReauthChallenge.tag(), 6);
        assert_eq!(ResponseRole::HandoffChallenge.tag(), 7);
        assert_eq!(ResponseRole::ReauthAck.tag(), 8);
        assert!(ResponseRole::HandoffChallenge.is_challenge());
        assert!(!ResponseRole::ReauthAck.is_challenge());
    }

    #[test]
    fn response_display() {
        assert_eq!(format!("{}", ResponseRole::ReauthChallenge), "REAUTH_CHALLENGE");
    }
}
