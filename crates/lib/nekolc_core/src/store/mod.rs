//! Revocation ledger for issued tokens.
//!
//! Records are keyed by the token's content hash and are never deleted:
//! revocation flips a flag, expiry is evaluated on read. Two backends
//! implement the same contract:
//!
//! - [`SqlTokenStore`]: SQLite via sqlx, one row per record.
//! - [`FileTokenStore`]: one JSON file per record.
//!
//! Both serialize writes that touch the same subject, so a bulk revoke
//! racing with an issuance either sweeps the new record or leaves it as the
//! newest live one.

pub mod file;
pub mod sql;

#[cfg(test)]
mod contract_tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::clock::Clock;
use crate::models::auth::IssuedTokenRecord;

pub use file::FileTokenStore;
pub use sql::SqlTokenStore;

/// Revocation store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token record already exists")]
    Conflict,

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Unsupported storage type: {0}")]
    Unsupported(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistent mapping from token content hash to issuance metadata.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::Conflict`] if the hash exists.
    async fn put(&self, record: &IssuedTokenRecord) -> Result<()>;

    /// Fetch a record that is neither revoked nor expired.
    async fn get(&self, token_hash: &str) -> Result<Option<IssuedTokenRecord>>;

    /// Mark a record revoked. Unknown hashes are a no-op.
    async fn revoke(&self, token_hash: &str) -> Result<()>;

    /// Revoke every live record owned by `subject`, returning how many were swept.
    async fn revoke_all_for_subject(&self, subject: &str) -> Result<u64>;

    /// Release backend resources.
    async fn close(&self) -> Result<()>;
}

/// Backend selection, as read from the application config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// `sqlite` or `file`.
    pub kind: String,
    /// SQLite database file, or the file store directory.
    pub path: String,
    /// Fallback directory for the file store when `path` is empty.
    pub base_path: String,
}

impl StoreConfig {
    fn file_dir(&self) -> &str {
        if self.path.is_empty() {
            &self.base_path
        } else {
            &self.path
        }
    }
}

/// Open the backend named by `config`.
pub async fn open_store(
    config: &StoreConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn RevocationStore>> {
    match config.kind.as_str() {
        "sqlite" => {
            let store = SqlTokenStore::open(Path::new(&config.path)).await?;
            info!(path = %config.path, "opened sqlite token store");
            Ok(Arc::new(store.with_clock(clock)))
        }
        "file" => {
            let store = FileTokenStore::open(config.file_dir()).await?;
            info!(path = %config.file_dir(), "opened file token store");
            Ok(Arc::new(store.with_clock(clock)))
        }
        "mysql" => Err(StoreError::Unsupported(
            "mysql storage is not implemented".into(),
        )),
        other => Err(StoreError::Unsupported(other.to_string())),
    }
}

/// Create the directory the configured backend writes into.
pub fn ensure_data_dir(config: &StoreConfig) -> Result<()> {
    let dir = match config.kind.as_str() {
        "sqlite" => Path::new(&config.path)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
        "file" => PathBuf::from(config.file_dir()),
        _ => return Ok(()),
    };
    if !dir.as_os_str().is_empty() && dir != Path::new(".") {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn config(kind: &str, path: String, base_path: String) -> StoreConfig {
        StoreConfig {
            kind: kind.into(),
            path,
            base_path,
        }
    }

    #[tokio::test]
    async fn unknown_and_mysql_backends_are_rejected() {
        for kind in ["mysql", "redis"] {
            let result = open_store(&config(kind, String::new(), String::new()), Arc::new(SystemClock)).await;
            assert!(matches!(result, Err(StoreError::Unsupported(_))), "{kind}");
        }
    }

    #[test]
    fn ensure_data_dir_creates_sqlite_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("nested").join("nekolc.db");
        ensure_data_dir(&config("sqlite", db.display().to_string(), String::new())).unwrap();
        assert!(tmp.path().join("nested").is_dir());
    }

    #[test]
    fn ensure_data_dir_uses_base_path_for_file_store() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("data");
        ensure_data_dir(&config("file", String::new(), base.display().to_string())).unwrap();
        assert!(base.is_dir());
    }

    #[tokio::test]
    async fn factory_opens_both_backends() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("nekolc.db");
        let sqlite = open_store(
            &config("sqlite", db.display().to_string(), String::new()),
            Arc::new(SystemClock),
        )
        .await
        .unwrap();
        assert!(sqlite.get("00").await.unwrap().is_none());
        sqlite.close().await.unwrap();

        let files = open_store(
            &config("file", String::new(), tmp.path().join("files").display().to_string()),
            Arc::new(SystemClock),
        )
        .await
        .unwrap();
        assert!(files.get("00").await.unwrap().is_none());
        assert!(tmp.path().join("files").join("tokens").is_dir());
    }
}
