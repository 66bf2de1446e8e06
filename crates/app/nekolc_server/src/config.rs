//! Application configuration.
//!
//! Loaded from `<config dir>/app.json`, then overridden by environment
//! variables and command-line flags (flags win). A missing or unparsable
//! file falls back to the built-in defaults.

use std::path::Path;

use nekolc_api::config::{
    ApiConfig, AuthSettings, ConfigError as AuthConfigError, DEFAULT_JWT_SECRET, VersionInfo,
};
use nekolc_core::store::StoreConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Name of the application config file inside the config directory.
pub const APP_CONFIG_FILE: &str = "app.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("invalid authentication settings: {0}")]
    Auth(#[from] AuthConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub port: String,
    pub api_version: String,
    pub min_api_version: String,
    pub build_version: String,
    pub release_date: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let versions = VersionInfo::default();
        Self {
            port: "8080".into(),
            api_version: versions.api_version,
            min_api_version: versions.min_api_version,
            build_version: versions.build_version,
            release_date: versions.release_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthenticationConfig {
    pub enabled: bool,
    pub jwt_secret: String,
    pub token_expiration_sec: i64,
    pub refresh_token_expiration_days: i64,
    pub replay_window_sec: i64,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        let auth = AuthSettings::default();
        Self {
            enabled: auth.enabled,
            jwt_secret: DEFAULT_JWT_SECRET.into(),
            token_expiration_sec: auth.access_token_ttl_secs,
            refresh_token_expiration_days: auth.refresh_token_ttl_days,
            replay_window_sec: auth.replay_window_secs,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebugConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    /// `sqlite` or `file`.
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            kind: "sqlite".into(),
            path: "./data/nekolc.db".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub base_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: "./data".into(),
        }
    }
}

/// Contents of `app.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub authentication: AuthenticationConfig,
    pub debug: DebugConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub debug: Option<bool>,
    pub enable_auth: Option<bool>,
    pub jwt_secret: Option<String>,
    pub database_type: Option<String>,
    pub database_path: Option<String>,
    pub api_version: Option<String>,
    pub build_version: Option<String>,
}

impl AppConfig {
    /// Read `app.json` from `config_dir`, falling back to defaults.
    pub fn load(config_dir: &Path) -> Self {
        let path = config_dir.join(APP_CONFIG_FILE);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                info!(path = %path.display(), error = %e, "no app config, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_slice(&data) {
            Ok(config) => {
                info!(path = %path.display(), "loaded app config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid app config, using defaults");
                Self::default()
            }
        }
    }

    /// Apply overrides. Empty strings leave the loaded value alone.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(port) = overrides.port.filter(|p| *p > 0) {
            self.server.port = port.to_string();
        }
        if let Some(debug) = overrides.debug {
            self.debug.enabled = debug;
        }
        if let Some(enabled) = overrides.enable_auth {
            self.authentication.enabled = enabled;
        }
        set_non_empty(&mut self.authentication.jwt_secret, &overrides.jwt_secret);
        set_non_empty(&mut self.database.kind, &overrides.database_type);
        set_non_empty(&mut self.database.path, &overrides.database_path);
        set_non_empty(&mut self.server.api_version, &overrides.api_version);
        set_non_empty(&mut self.server.build_version, &overrides.build_version);
        self
    }

    pub fn port(&self) -> Result<u16, ConfigError> {
        self.server
            .port
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPort(self.server.port.clone()))
    }

    /// API settings, with token lifetimes and the replay window checked.
    pub fn api_config(&self) -> Result<ApiConfig, ConfigError> {
        let config = ApiConfig {
            versions: VersionInfo {
                api_version: self.server.api_version.clone(),
                min_api_version: self.server.min_api_version.clone(),
                build_version: self.server.build_version.clone(),
                release_date: self.server.release_date.clone(),
            },
            auth: AuthSettings {
                enabled: self.authentication.enabled,
                jwt_secret: self.authentication.jwt_secret.clone(),
                access_token_ttl_secs: self.authentication.token_expiration_sec,
                refresh_token_ttl_days: self.authentication.refresh_token_expiration_days,
                replay_window_secs: self.authentication.replay_window_sec,
            },
            debug: self.debug.enabled,
        };
        config.auth.validate()?;
        Ok(config)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            kind: self.database.kind.clone(),
            path: self.database.path.clone(),
            base_path: self.storage.base_path.clone(),
        }
    }

    /// Whether the signing secret is still the shipped default.
    pub fn uses_default_secret(&self) -> bool {
        self.authentication.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn set_non_empty(target: &mut String, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        *target = v.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig::load(tmp.path());
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port().unwrap(), 8080);
        assert!(!config.authentication.enabled);
        assert_eq!(config.authentication.jwt_secret, "default-secret-change-this");
        assert_eq!(config.database.kind, "sqlite");
        assert_eq!(config.database.path, "./data/nekolc.db");
        assert_eq!(config.storage.base_path, "./data");
    }

    #[test]
    fn invalid_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(APP_CONFIG_FILE), "{ nope").unwrap();
        assert_eq!(AppConfig::load(tmp.path()), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(APP_CONFIG_FILE),
            r#"{
                "server": {"port": "9090"},
                "authentication": {"enabled": true, "jwtSecret": "s1", "tokenExpirationSec": 600},
                "database": {"type": "file", "path": ""}
            }"#,
        )
        .unwrap();

        let config = AppConfig::load(tmp.path());
        assert_eq!(config.port().unwrap(), 9090);
        assert!(config.authentication.enabled);
        assert_eq!(config.authentication.refresh_token_expiration_days, 30);

        let api = config.api_config().unwrap();
        assert!(!api.debug);
        assert_eq!(api.auth.jwt_secret, "s1");
        assert_eq!(api.auth.access_token_ttl_secs, 600);
        assert_eq!(api.auth.replay_window_secs, 300);

        let store = config.store_config();
        assert_eq!(store.kind, "file");
        assert_eq!(store.base_path, "./data");
    }

    #[test]
    fn overrides_replace_non_empty_values_only() {
        let config = AppConfig::default().with_overrides(&Overrides {
            port: Some(3000),
            enable_auth: Some(true),
            jwt_secret: Some(String::new()),
            database_type: Some("file".into()),
            build_version: Some("20251017".into()),
            ..Overrides::default()
        });
        assert_eq!(config.port().unwrap(), 3000);
        assert!(config.authentication.enabled);
        assert!(config.uses_default_secret());
        assert_eq!(config.database.kind, "file");
        assert_eq!(config.server.build_version, "20251017");
    }

    #[test]
    fn zero_port_is_ignored() {
        let config = AppConfig::default().with_overrides(&Overrides {
            port: Some(0),
            ..Overrides::default()
        });
        assert_eq!(config.port().unwrap(), 8080);
    }

    #[test]
    fn bad_port_is_reported() {
        let mut config = AppConfig::default();
        config.server.port = "eighty".into();
        assert!(matches!(config.port(), Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    fn debug_flag_reaches_api_config() {
        let config = AppConfig::default().with_overrides(&Overrides {
            debug: Some(true),
            ..Overrides::default()
        });
        assert!(config.api_config().unwrap().debug);
    }

    #[test]
    fn out_of_range_lifetimes_are_reported() {
        for value in [0, -30, i64::MAX] {
            let mut config = AppConfig::default();
            config.authentication.token_expiration_sec = value;
            assert!(matches!(config.api_config(), Err(ConfigError::Auth(_))), "{value}");

            let mut config = AppConfig::default();
            config.authentication.refresh_token_expiration_days = value;
            assert!(matches!(config.api_config(), Err(ConfigError::Auth(_))), "{value}");

            let mut config = AppConfig::default();
            config.authentication.replay_window_sec = value;
            assert!(matches!(config.api_config(), Err(ConfigError::Auth(_))), "{value}");
        }
    }
}
