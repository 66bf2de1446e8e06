//! Flat-file revocation store.
//!
//! Each record lives in `<base>/tokens/token_<hash>.json`. New records are
//! written to a temp file and hard-linked into place, which fails if the
//! target exists. Updates are written to a temp file and renamed over the
//! record. Writers for the same subject hold that subject's async mutex.
//! File contents are synced before they are linked or renamed into place,
//! and the directory is synced afterwards.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Result, RevocationStore, StoreError};
use crate::clock::{Clock, SystemClock};
use crate::models::auth::IssuedTokenRecord;

const TOKEN_DIR: &str = "tokens";

/// Token records stored as individual JSON files.
pub struct FileTokenStore {
    dir: PathBuf,
    subject_locks: DashMap<String, Arc<Mutex<()>>>,
    clock: Arc<dyn Clock>,
}

impl FileTokenStore {
    /// Open a store rooted at `base_path`, creating `tokens/` beneath it.
    pub async fn open(base_path: impl AsRef<Path>) -> Result<Self> {
        let dir = base_path.as_ref().join(TOKEN_DIR);
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            subject_locks: DashMap::new(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Evaluate expiry against `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Path of the record for `token_hash`. Only hex hashes map to a path.
    fn record_path(&self, token_hash: &str) -> Option<PathBuf> {
        if token_hash.is_empty() || !token_hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(self.dir.join(format!("token_{token_hash}.json")))
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!(".tmp-{}", Uuid::new_v4()))
    }

    fn subject_lock(&self, subject: &str) -> Arc<Mutex<()>> {
        self.subject_locks
            .entry(subject.to_string())
            .or_default()
            .clone()
    }

    /// Drop the subject's mutex once nobody else holds or awaits it.
    /// Callers must have dropped their own `Arc` first.
    fn release_subject_lock(&self, subject: &str) {
        self.subject_locks
            .remove_if(subject, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn read_record(path: &Path) -> Result<Option<IssuedTokenRecord>> {
        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))
    }

    async fn write_temp(&self, record: &IssuedTokenRecord) -> Result<PathBuf> {
        let data = serde_json::to_vec(record)
            .map_err(|e| StoreError::Corrupt(format!("serialize record: {e}")))?;
        let tmp = self.temp_path();
        if let Err(e) = Self::write_synced(&tmp, &data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(tmp)
    }

    async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(data).await?;
        file.sync_all().await
    }

    /// Persist directory entries created by link or rename.
    #[cfg(unix)]
    async fn sync_dir(&self) -> Result<()> {
        fs::File::open(&self.dir).await?.sync_all().await?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn sync_dir(&self) -> Result<()> {
        Ok(())
    }

    /// Atomically replace an existing record.
    async fn overwrite(&self, path: &Path, record: &IssuedTokenRecord) -> Result<()> {
        let tmp = self.write_temp(record).await?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        self.sync_dir().await
    }

    /// Link a fully written temp file to `path`; fails if `path` exists.
    async fn create(&self, path: &Path, record: &IssuedTokenRecord) -> Result<()> {
        let tmp = self.write_temp(record).await?;
        let linked = fs::hard_link(&tmp, path).await;
        let _ = fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => self.sync_dir().await,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    /// Mark the record at `path` revoked. Caller holds the subject lock.
    async fn revoke_at(&self, path: &Path) -> Result<bool> {
        match Self::read_record(path).await? {
            Some(mut record) if !record.revoked => {
                record.revoked = true;
                self.overwrite(path, &record).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Revoke every live record of `subject`. Caller holds the subject lock.
    async fn sweep(&self, subject: &str) -> Result<u64> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut swept = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !(name.starts_with("token_") && name.ends_with(".json")) {
                continue;
            }

            let path = entry.path();
            let record = match Self::read_record(&path).await {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable token record");
                    continue;
                }
            };
            if record.subject == subject && self.revoke_at(&path).await? {
                swept += 1;
            }
        }
        Ok(swept)
    }
}

#[async_trait]
impl RevocationStore for FileTokenStore {
    async fn put(&self, record: &IssuedTokenRecord) -> Result<()> {
        let path = self.record_path(&record.token_hash).ok_or_else(|| {
            StoreError::Corrupt(format!("invalid token hash '{}'", record.token_hash))
        })?;

        let lock = self.subject_lock(&record.subject);
        let created = {
            let _guard = lock.lock().await;
            self.create(&path, record).await
        };
        drop(lock);
        self.release_subject_lock(&record.subject);

        created?;
        debug!(subject = %record.subject, kind = %record.kind, "stored token record");
        Ok(())
    }

    async fn get(&self, token_hash: &str) -> Result<Option<IssuedTokenRecord>> {
        let Some(path) = self.record_path(token_hash) else {
            return Ok(None);
        };
        let now = self.clock.now();
        Ok(Self::read_record(&path)
            .await?
            .filter(|record| record.is_live(now)))
    }

    async fn revoke(&self, token_hash: &str) -> Result<()> {
        let Some(path) = self.record_path(token_hash) else {
            return Ok(());
        };
        let Some(record) = Self::read_record(&path).await? else {
            return Ok(());
        };

        let lock = self.subject_lock(&record.subject);
        let revoked = {
            let _guard = lock.lock().await;
            self.revoke_at(&path).await
        };
        drop(lock);
        self.release_subject_lock(&record.subject);
        revoked.map(|_| ())
    }

    async fn revoke_all_for_subject(&self, subject: &str) -> Result<u64> {
        let lock = self.subject_lock(subject);
        let swept = {
            let _guard = lock.lock().await;
            self.sweep(subject).await
        };
        drop(lock);
        self.release_subject_lock(subject);

        let swept = swept?;
        info!(subject, swept, "revoked all tokens for subject");
        Ok(swept)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
