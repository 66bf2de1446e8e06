//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API wire models
//! (which use camelCase field names).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issuer embedded in every token minted by this server.
pub const TOKEN_ISSUER: &str = "nekolc";

/// Kind of a minted token. Fixed at issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            other => Err(format!("unknown token kind '{other}'")),
        }
    }
}

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: username or device identifier.
    pub sub: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp). Always greater than `iat`.
    pub exp: i64,
    /// Access or refresh.
    pub kind: TokenKind,
    /// Unique id per issuance.
    pub jti: String,
    /// Issuer (`nekolc`).
    pub iss: String,
}

impl TokenClaims {
    /// Expiry as a timestamp; out-of-range values collapse to the epoch (already expired).
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

/// Device signature assertion presented at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSignatureAssertion {
    pub identifier: String,
    /// Unix timestamp chosen by the device when signing.
    pub timestamp: i64,
    /// Lowercase hex SHA-256 of `identifier ‖ timestamp ‖ secret`.
    pub signature: String,
}

/// Issued token record held by a revocation store.
///
/// `token_hash` is the content hash of the bearer token, never the token itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedTokenRecord {
    pub token_hash: String,
    pub kind: TokenKind,
    pub subject: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
}

impl IssuedTokenRecord {
    /// Build a fresh, non-revoked record.
    pub fn new(
        token_hash: String,
        kind: TokenKind,
        subject: &str,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token_hash,
            kind,
            subject: subject.to_string(),
            expires_at,
            created_at,
            revoked: false,
        }
    }

    /// Whether the record is honorable at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}
