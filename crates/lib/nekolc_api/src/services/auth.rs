//! Authentication service: login, validate, refresh and logout flows over
//! the `nekolc_core` token primitives and a revocation store.

use std::sync::Arc;

use nekolc_core::auth::{
    ClaimsCodec, CredentialBackend, IssuedPair, IssuedToken, ReplayGuard, TokenIssuer,
    content_hash,
};
use nekolc_core::clock::Clock;
use nekolc_core::models::auth::{
    DeviceSignatureAssertion, IssuedTokenRecord, TokenClaims, TokenKind,
};
use nekolc_core::store::RevocationStore;
use tracing::{debug, info, warn};

use crate::config::{AuthSettings, ConfigError};
use crate::error::{AppError, AppResult};
use crate::models::AuthInfo;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_ACCESS_TOKEN: &str = "Invalid or expired access token";
const INVALID_REFRESH_TOKEN: &str = "Invalid or expired refresh token";

/// Shared auth facade. One instance per process, held in `AppState`.
pub struct AuthService {
    enabled: bool,
    codec: ClaimsCodec,
    guard: ReplayGuard,
    issuer: TokenIssuer,
    credentials: Arc<dyn CredentialBackend>,
    store: Arc<dyn RevocationStore>,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    /// Fails when a configured lifetime is non-positive or out of range.
    pub fn new(
        settings: &AuthSettings,
        credentials: Arc<dyn CredentialBackend>,
        store: Arc<dyn RevocationStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let secret = settings.jwt_secret.as_bytes();
        let codec = ClaimsCodec::new(secret);
        let issuer =
            TokenIssuer::with_lifetimes(codec.clone(), settings.access_ttl()?, settings.refresh_ttl()?);
        let window = settings.replay_window()?;
        Ok(Self {
            enabled: settings.enabled,
            codec,
            guard: ReplayGuard::with_window(secret, window.num_seconds()),
            issuer,
            credentials,
            store,
            clock,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fails with `NotImplemented` when authentication is switched off.
    pub fn ensure_enabled(&self) -> AppResult<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(AppError::NotImplemented(
                "Authentication system not implemented".into(),
            ))
        }
    }

    /// Resolve the subject from credentials or a device signature, then issue
    /// and record a token pair.
    pub async fn login(&self, input: &AuthInfo) -> AppResult<IssuedPair> {
        self.ensure_enabled()?;
        let now = self.clock.now();

        let subject = if !input.username.is_empty() && !input.password.is_empty() {
            if !self.credentials.verify(&input.username, &input.password) {
                warn!(username = %input.username, "password login rejected");
                return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
            }
            input.username.clone()
        } else if !input.identifier.is_empty() && !input.signature.is_empty() {
            let assertion = DeviceSignatureAssertion {
                identifier: input.identifier.clone(),
                timestamp: input.timestamp,
                signature: input.signature.clone(),
            };
            if !self.guard.verify(&assertion, now) {
                return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
            }
            assertion.identifier
        } else {
            return Err(AppError::InvalidRequest(
                "Either username/password or identifier/signature is required".into(),
            ));
        };

        let pair = self.issuer.issue_pair(&subject, now)?;
        // Both records must be durable before either token is handed out.
        self.record(&pair.access).await?;
        self.record(&pair.refresh).await?;

        info!(subject = %subject, "issued token pair");
        Ok(pair)
    }

    /// Succeeds iff the token verifies and its record is live.
    pub async fn validate(&self, access_token: &str) -> AppResult<()> {
        self.ensure_enabled()?;
        self.lookup(access_token, INVALID_ACCESS_TOKEN).await?;
        Ok(())
    }

    /// Mint a new access token from a live refresh token.
    ///
    /// The refresh token itself stays valid.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<IssuedToken> {
        self.ensure_enabled()?;
        if refresh_token.is_empty() {
            return Err(AppError::Unauthorized(INVALID_REFRESH_TOKEN.into()));
        }

        let now = self.clock.now();
        let record = self
            .store
            .get(&content_hash(refresh_token))
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_REFRESH_TOKEN.into()))?;
        if record.kind != TokenKind::Refresh || now > record.expires_at {
            warn!(subject = %record.subject, kind = %record.kind, "refresh rejected");
            return Err(AppError::Unauthorized(INVALID_REFRESH_TOKEN.into()));
        }

        let access = self.issuer.renew_access(refresh_token, now)?;
        self.record(&access).await?;

        info!(subject = %access.claims.sub, "renewed access token");
        Ok(access)
    }

    /// Revoke whichever of the two tokens are present. Store failures are
    /// logged, never returned.
    pub async fn logout(&self, access_token: &str, refresh_token: &str) -> AppResult<()> {
        self.ensure_enabled()?;
        for (kind, token) in [
            (TokenKind::Access, access_token),
            (TokenKind::Refresh, refresh_token),
        ] {
            if token.is_empty() {
                continue;
            }
            if let Err(e) = self.store.revoke(&content_hash(token)).await {
                warn!(%kind, error = %e, "failed to revoke token at logout");
            }
        }
        Ok(())
    }

    /// Revoke every live token of `subject`.
    pub async fn revoke_all(&self, subject: &str) -> AppResult<u64> {
        self.ensure_enabled()?;
        Ok(self.store.revoke_all_for_subject(subject).await?)
    }

    /// Bearer check for protected routes: the token must verify, be an
    /// access token, and have a live record.
    pub async fn authenticate(&self, bearer: &str) -> AppResult<TokenClaims> {
        self.ensure_enabled()?;
        let claims = self.lookup(bearer, "Invalid or expired token").await?;
        if claims.kind != TokenKind::Access {
            return Err(AppError::Unauthorized("Access token required".into()));
        }
        Ok(claims)
    }

    /// Decode, then confirm the record is live. Every failure is `Unauthorized`
    /// with `message`; store errors stay internal.
    async fn lookup(&self, token: &str, message: &str) -> AppResult<TokenClaims> {
        if token.is_empty() {
            return Err(AppError::Unauthorized(message.into()));
        }
        let claims = self.codec.decode(token).map_err(|e| {
            debug!(error = %e, "token failed to decode");
            AppError::Unauthorized(message.into())
        })?;
        match self.store.get(&content_hash(token)).await? {
            Some(_) => Ok(claims),
            None => {
                debug!(subject = %claims.sub, "token not live in store");
                Err(AppError::Unauthorized(message.into()))
            }
        }
    }

    async fn record(&self, issued: &IssuedToken) -> AppResult<()> {
        let record = IssuedTokenRecord::new(
            content_hash(&issued.token),
            issued.claims.kind,
            &issued.claims.sub,
            issued.claims.expires_at(),
            self.clock.now(),
        );
        self.store.put(&record).await.map_err(|e| {
            AppError::Internal(format!("failed to record {} token: {e}", issued.claims.kind))
        })
    }
}
