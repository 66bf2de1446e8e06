//! Contract tests run against every backend.

use std::sync::Arc;

use chrono::Duration;
use tempfile::TempDir;

use crate::auth::content_hash;
use crate::clock::{Clock, ManualClock};
use crate::models::auth::{IssuedTokenRecord, TokenKind};
use crate::store::{FileTokenStore, RevocationStore, SqlTokenStore, StoreError};

struct Backend {
    name: &'static str,
    store: Arc<dyn RevocationStore>,
    clock: Arc<ManualClock>,
    _dir: TempDir,
}

async fn backends() -> Vec<Backend> {
    let sql_dir = tempfile::tempdir().unwrap();
    let sql_clock = Arc::new(ManualClock::starting_now());
    let sql = SqlTokenStore::open(&sql_dir.path().join("nekolc.db"))
        .await
        .unwrap()
        .with_clock(sql_clock.clone());

    let file_dir = tempfile::tempdir().unwrap();
    let file_clock = Arc::new(ManualClock::starting_now());
    let file = FileTokenStore::open(file_dir.path())
        .await
        .unwrap()
        .with_clock(file_clock.clone());

    vec![
        Backend {
            name: "sqlite",
            store: Arc::new(sql),
            clock: sql_clock,
            _dir: sql_dir,
        },
        Backend {
            name: "file",
            store: Arc::new(file),
            clock: file_clock,
            _dir: file_dir,
        },
    ]
}

fn record(clock: &ManualClock, token: &str, subject: &str) -> IssuedTokenRecord {
    let now = clock.now();
    IssuedTokenRecord::new(
        content_hash(token),
        TokenKind::Access,
        subject,
        now + Duration::hours(1),
        now,
    )
}

#[tokio::test]
async fn put_then_get_returns_record() {
    for b in backends().await {
        let rec = record(&b.clock, "token-a", "admin");
        b.store.put(&rec).await.unwrap();

        let found = b.store.get(&rec.token_hash).await.unwrap();
        assert_eq!(found.as_ref().map(|r| r.subject.as_str()), Some("admin"), "{}", b.name);
        assert_eq!(found.unwrap().kind, TokenKind::Access, "{}", b.name);
    }
}

#[tokio::test]
async fn duplicate_put_conflicts_and_keeps_original() {
    for b in backends().await {
        let rec = record(&b.clock, "token-a", "admin");
        b.store.put(&rec).await.unwrap();

        let mut clash = rec.clone();
        clash.subject = "mallory".into();
        assert!(
            matches!(b.store.put(&clash).await, Err(StoreError::Conflict)),
            "{}",
            b.name
        );
        let kept = b.store.get(&rec.token_hash).await.unwrap().unwrap();
        assert_eq!(kept.subject, "admin", "{}", b.name);
    }
}

#[tokio::test]
async fn unknown_hash_is_absent() {
    for b in backends().await {
        assert!(b.store.get(&content_hash("nope")).await.unwrap().is_none(), "{}", b.name);
    }
}

#[tokio::test]
async fn revoke_hides_record_and_is_idempotent() {
    for b in backends().await {
        let rec = record(&b.clock, "token-a", "admin");
        b.store.put(&rec).await.unwrap();

        b.store.revoke(&rec.token_hash).await.unwrap();
        assert!(b.store.get(&rec.token_hash).await.unwrap().is_none(), "{}", b.name);
        b.store.revoke(&rec.token_hash).await.unwrap();
        b.store.revoke(&content_hash("never-issued")).await.unwrap();
    }
}

#[tokio::test]
async fn expired_record_is_absent() {
    for b in backends().await {
        let rec = record(&b.clock, "token-a", "admin");
        b.store.put(&rec).await.unwrap();

        b.clock.advance(Duration::minutes(59));
        assert!(b.store.get(&rec.token_hash).await.unwrap().is_some(), "{}", b.name);
        b.clock.advance(Duration::minutes(1));
        assert!(b.store.get(&rec.token_hash).await.unwrap().is_none(), "{}", b.name);
    }
}

#[tokio::test]
async fn revoke_all_only_touches_subject() {
    for b in backends().await {
        let mine: Vec<_> = (0..3)
            .map(|i| record(&b.clock, &format!("admin-{i}"), "admin"))
            .collect();
        let theirs = record(&b.clock, "dev-42-token", "dev-42");
        for rec in mine.iter().chain(std::iter::once(&theirs)) {
            b.store.put(rec).await.unwrap();
        }
        b.store.revoke(&mine[0].token_hash).await.unwrap();

        assert_eq!(b.store.revoke_all_for_subject("admin").await.unwrap(), 2, "{}", b.name);
        for rec in &mine {
            assert!(b.store.get(&rec.token_hash).await.unwrap().is_none(), "{}", b.name);
        }
        assert!(b.store.get(&theirs.token_hash).await.unwrap().is_some(), "{}", b.name);
        assert_eq!(b.store.revoke_all_for_subject("nobody").await.unwrap(), 0, "{}", b.name);
    }
}

#[tokio::test]
async fn put_after_revoke_all_leaves_only_new_token_live() {
    for b in backends().await {
        let old: Vec<_> = (0..4)
            .map(|i| record(&b.clock, &format!("old-{i}"), "admin"))
            .collect();
        for rec in &old {
            b.store.put(rec).await.unwrap();
        }

        b.store.revoke_all_for_subject("admin").await.unwrap();
        let fresh = record(&b.clock, "fresh", "admin");
        b.store.put(&fresh).await.unwrap();

        for rec in &old {
            assert!(b.store.get(&rec.token_hash).await.unwrap().is_none(), "{}", b.name);
        }
        assert!(b.store.get(&fresh.token_hash).await.unwrap().is_some(), "{}", b.name);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_puts_and_sweep_lose_no_revocation() {
    for b in backends().await {
        let pre: Vec<_> = (0..8)
            .map(|i| record(&b.clock, &format!("pre-{i}"), "admin"))
            .collect();
        for rec in &pre {
            b.store.put(rec).await.unwrap();
        }

        let racing: Vec<_> = (0..16)
            .map(|i| record(&b.clock, &format!("race-{i}"), "admin"))
            .collect();
        let mut handles = Vec::new();
        for rec in racing.clone() {
            let store = b.store.clone();
            handles.push(tokio::spawn(async move { store.put(&rec).await }));
        }
        let sweeper = {
            let store = b.store.clone();
            tokio::spawn(async move { store.revoke_all_for_subject("admin").await })
        };

        for h in handles {
            h.await.unwrap().unwrap();
        }
        let swept = sweeper.await.unwrap().unwrap();

        // Every pre-existing token was swept; every racing token was either
        // swept or is still live, and the counts add up.
        for rec in &pre {
            assert!(b.store.get(&rec.token_hash).await.unwrap().is_none(), "{}", b.name);
        }
        let mut live = 0u64;
        for rec in &racing {
            if b.store.get(&rec.token_hash).await.unwrap().is_some() {
                live += 1;
            }
        }
        assert_eq!(swept + live, (pre.len() + racing.len()) as u64, "{}", b.name);

        // A follow-up sweep catches whatever the race left live.
        assert_eq!(b.store.revoke_all_for_subject("admin").await.unwrap(), live, "{}", b.name);
        for rec in &racing {
            assert!(b.store.get(&rec.token_hash).await.unwrap().is_none(), "{}", b.name);
        }
    }
}

#[tokio::test]
async fn close_is_clean() {
    for b in backends().await {
        b.store.close().await.unwrap();
    }
}
