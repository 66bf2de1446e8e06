//! Access/refresh token minting.
//!
//! The issuer only signs; recording issued tokens is the caller's job.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::claims::{ClaimsCodec, ClaimsError};
use crate::models::auth::{TOKEN_ISSUER, TokenClaims, TokenKind};

/// Access token lifetime: 1 hour.
pub const DEFAULT_ACCESS_TOKEN_EXPIRY_SECS: i64 = 60 * 60;

/// Refresh token lifetime: 30 days.
pub const DEFAULT_REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

/// Token renewal errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IssueError {
    #[error("token is not a refresh token")]
    NotARefreshToken,

    #[error(transparent)]
    Claims(#[from] ClaimsError),
}

/// A signed token together with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

/// Token pair handed out at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Mints access and refresh tokens with configured lifetimes.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    codec: ClaimsCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Issuer with the default lifetimes (1 hour / 30 days).
    pub fn new(codec: ClaimsCodec) -> Self {
        Self::with_lifetimes(
            codec,
            Duration::seconds(DEFAULT_ACCESS_TOKEN_EXPIRY_SECS),
            Duration::days(DEFAULT_REFRESH_TOKEN_EXPIRY_DAYS),
        )
    }

    pub fn with_lifetimes(codec: ClaimsCodec, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            codec,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn codec(&self) -> &ClaimsCodec {
        &self.codec
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Mint an access + refresh pair for `subject`.
    pub fn issue_pair(&self, subject: &str, now: DateTime<Utc>) -> Result<IssuedPair, ClaimsError> {
        Ok(IssuedPair {
            access: self.mint(subject, TokenKind::Access, now)?,
            refresh: self.mint(subject, TokenKind::Refresh, now)?,
        })
    }

    /// Mint a new access token from a refresh token's subject.
    ///
    /// The refresh token's signature and kind are checked; its expiry and
    /// revocation state are not.
    pub fn renew_access(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, IssueError> {
        let claims = self.codec.decode(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(IssueError::NotARefreshToken);
        }
        Ok(self.mint(&claims.sub, TokenKind::Access, now)?)
    }

    fn mint(
        &self,
        subject: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, ClaimsError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let iat = now.timestamp();
        let exp = now
            .checked_add_signed(ttl)
            .map(|at| at.timestamp())
            .filter(|exp| *exp > iat)
            .ok_or_else(|| ClaimsError::Encoding(format!("{kind} token lifetime out of range")))?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat,
            exp,
            kind,
            jti: Uuid::new_v4().to_string(),
            iss: TOKEN_ISSUER.to_string(),
        };
        let token = self.codec.encode(&claims)?;
        Ok(IssuedToken { token, claims })
    }
}
