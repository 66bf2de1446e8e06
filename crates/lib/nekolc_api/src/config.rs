//! API configuration.

use chrono::{Duration, Utc};
use nekolc_core::auth::issuer::{DEFAULT_ACCESS_TOKEN_EXPIRY_SECS, DEFAULT_REFRESH_TOKEN_EXPIRY_DAYS};
use nekolc_core::auth::signature::DEFAULT_REPLAY_WINDOW_SECS;
use thiserror::Error;

/// Secret used when nothing else is configured.
pub const DEFAULT_JWT_SECRET: &str = "default-secret-change-this";

/// Configuration for the API layer.
#[derive(Clone, Debug, Default)]
pub struct ApiConfig {
    /// Version information echoed in every `meta` block.
    pub versions: VersionInfo,
    /// Authentication settings.
    pub auth: AuthSettings,
    /// Exposes the `/v0/testing` diagnostics beyond `ping`.
    pub debug: bool,
}

/// Rejected configuration value.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be a positive duration that fits the calendar, got {value}")]
    InvalidLifetime { field: &'static str, value: i64 },
}

/// Version fields reported to clients.
#[derive(Clone, Debug)]
pub struct VersionInfo {
    pub api_version: String,
    pub min_api_version: String,
    pub build_version: String,
    pub release_date: String,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            api_version: "1.0.0".into(),
            min_api_version: "1.0.0".into(),
            build_version: "20240601".into(),
            release_date: "2024-06-01T12:00:00Z".into(),
        }
    }
}

/// Token lifecycle settings.
#[derive(Clone)]
pub struct AuthSettings {
    /// When false every auth operation answers `NotImplemented`.
    pub enabled: bool,
    /// HMAC key for tokens and device signatures.
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_days: i64,
    /// Accepted clock skew for device signatures, in seconds.
    pub replay_window_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            jwt_secret: DEFAULT_JWT_SECRET.into(),
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_EXPIRY_SECS,
            refresh_token_ttl_days: DEFAULT_REFRESH_TOKEN_EXPIRY_DAYS,
            replay_window_secs: DEFAULT_REPLAY_WINDOW_SECS,
        }
    }
}

impl AuthSettings {
    pub fn access_ttl(&self) -> Result<Duration, ConfigError> {
        lifetime("access_token_ttl_secs", self.access_token_ttl_secs, Duration::try_seconds)
    }

    pub fn refresh_ttl(&self) -> Result<Duration, ConfigError> {
        lifetime("refresh_token_ttl_days", self.refresh_token_ttl_days, Duration::try_days)
    }

    pub fn replay_window(&self) -> Result<Duration, ConfigError> {
        lifetime("replay_window_secs", self.replay_window_secs, Duration::try_seconds)
    }

    /// Check every lifetime at once; used before the service is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.access_ttl()?;
        self.refresh_ttl()?;
        self.replay_window()?;
        Ok(())
    }
}

/// A lifetime must be positive and still yield a valid instant when added
/// to the current time.
fn lifetime(
    field: &'static str,
    value: i64,
    convert: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    let invalid = ConfigError::InvalidLifetime { field, value };
    if value <= 0 {
        return Err(invalid);
    }
    let duration = convert(value).ok_or_else(|| invalid.clone())?;
    Utc::now().checked_add_signed(duration).ok_or(invalid)?;
    Ok(duration)
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("enabled", &self.enabled)
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_days", &self.refresh_token_ttl_days)
            .field("replay_window_secs", &self.replay_window_secs)
            .finish()
    }
}
