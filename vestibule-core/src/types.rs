//! Core data structures for the session lifecycle
//!
//! These types mirror the wire contract of the account service: opaque
//! bearer credentials, public user profiles, and the auth endpoint payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque bearer token issued by the server
///
/// No client-side structure is assumed beyond "non-empty string". The token
/// is redacted from debug output so it never leaks into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token, rejecting empty or whitespace-only input
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// The raw token, for building an `Authorization: Bearer` header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Public profile of an authenticated user
///
/// Login responses may carry a partial principal (id and name only); the
/// authoritative value is whatever `/auth/me` returns, so everything beyond
/// the identifier is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

/// Session lifecycle state
///
/// `Invalid` is transient: it is published while a rejected credential is
/// being cleaned up and collapses to `Unauthenticated` within the same
/// operation. A cached principal is never exposed as `Authenticated`; only a
/// successful identity check in the current process produces that state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    /// Boot-time or explicit refresh in flight
    Resolving,
    Authenticated(Principal),
    /// Credential present but rejected by the server
    Invalid,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            SessionState::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }
}

/// Body of `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub secret: String,
}

/// Body of `POST /auth/signup`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub secret: String,
}

/// Success payload of login and signup
///
/// `access` is required by contract but modeled as optional so a protocol
/// violation (2xx without a token) surfaces as a typed error instead of a
/// deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub user: Option<Principal>,
}

/// Success payload of `GET /auth/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MePayload {
    pub user: Principal,
}

/// Error body the server attaches to 4xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
