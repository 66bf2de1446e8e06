//! SQLite-backed revocation store.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::{debug, info};

use super::{Result, RevocationStore, StoreError};
use crate::clock::{Clock, SystemClock};
use crate::migrate::migrate;
use crate::models::auth::IssuedTokenRecord;

/// Maximum pooled connections for a file-backed database.
const MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits for SQLite's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type RecordRow = (String, String, String, i64, i64, bool);

/// Token records in the `auth_tokens` table.
pub struct SqlTokenStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqlTokenStore {
    /// Open (creating if needed) the database file at `path` and migrate it.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database, mainly for tests.
    ///
    /// Pinned to one connection that never idles out, since every SQLite
    /// in-memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, running migrations first.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        migrate(&pool).await?;
        Ok(Self {
            pool,
            clock: Arc::new(SystemClock),
        })
    }

    /// Evaluate expiry against `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn record_from_row(row: RecordRow) -> Result<IssuedTokenRecord> {
    let (token_hash, kind, subject, expires_at, created_at, revoked) = row;
    Ok(IssuedTokenRecord {
        kind: kind.parse().map_err(StoreError::Corrupt)?,
        expires_at: timestamp(expires_at)?,
        created_at: timestamp(created_at)?,
        token_hash,
        subject,
        revoked,
    })
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {secs}")))
}

#[async_trait]
impl RevocationStore for SqlTokenStore {
    async fn put(&self, record: &IssuedTokenRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO auth_tokens (token_hash, kind, subject, expires_at, created_at, revoked) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&record.token_hash)
        .bind(record.kind.as_str())
        .bind(&record.subject)
        .bind(record.expires_at.timestamp())
        .bind(record.created_at.timestamp())
        .bind(record.revoked)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Conflict,
            other => StoreError::Db(other),
        })?;
        debug!(subject = %record.subject, kind = %record.kind, "stored token record");
        Ok(())
    }

    async fn get(&self, token_hash: &str) -> Result<Option<IssuedTokenRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(
            "SELECT token_hash, kind, subject, expires_at, created_at, revoked \
             FROM auth_tokens \
             WHERE token_hash = ?1 \
               AND revoked = FALSE \
               AND expires_at > ?2",
        )
        .bind(token_hash)
        .bind(self.clock.now().timestamp())
        .fetch_optional(&self.pool)
        .await?;
        row.map(record_from_row).transpose()
    }

    async fn revoke(&self, token_hash: &str) -> Result<()> {
        sqlx::query(
            "UPDATE auth_tokens SET revoked = TRUE \
             WHERE token_hash = ?1 AND revoked = FALSE",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_all_for_subject(&self, subject: &str) -> Result<u64> {
        // SQLite holds the database write lock until commit, so no insert for
        // this subject can land between the sweep and the commit.
        let mut tx = self.pool.begin().await?;
        let swept = sqlx::query(
            "UPDATE auth_tokens SET revoked = TRUE \
             WHERE subject = ?1 AND revoked = FALSE",
        )
        .bind(subject)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        tx.commit().await?;

        info!(subject, swept, "revoked all tokens for subject");
        Ok(swept)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::auth::TokenKind;

    #[tokio::test]
    async fn records_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nekolc.db");
        let now = Utc::now();
        let record = IssuedTokenRecord::new(
            "ab".repeat(32),
            TokenKind::Refresh,
            "admin",
            now + chrono::Duration::days(30),
            now,
        );

        let store = SqlTokenStore::open(&path).await.unwrap();
        store.put(&record).await.unwrap();
        store.close().await.unwrap();

        let reopened = SqlTokenStore::open(&path).await.unwrap();
        let found = reopened.get(&record.token_hash).await.unwrap().unwrap();
        assert_eq!(found.subject, "admin");
        assert_eq!(found.kind, TokenKind::Refresh);
        assert_eq!(found.expires_at.timestamp(), record.expires_at.timestamp());
    }

    #[tokio::test]
    async fn expiry_follows_injected_clock() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = SqlTokenStore::in_memory()
            .await
            .unwrap()
            .with_clock(clock.clone());
        let now = clock.now();
        let record = IssuedTokenRecord::new(
            "cd".repeat(32),
            TokenKind::Access,
            "admin",
            now + chrono::Duration::seconds(3600),
            now,
        );
        store.put(&record).await.unwrap();
        assert!(store.get(&record.token_hash).await.unwrap().is_some());

        clock.advance(chrono::Duration::seconds(3600));
        assert!(store.get(&record.token_hash).await.unwrap().is_none());
    }
}
