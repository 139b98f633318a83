//! Cached copy of the whole user directory.
//!
//! Readers clone an `Arc` to the published [`Snapshot`]; a refresh builds a
//! new list from the store and swaps the pointer. The read lock is held only
//! long enough to clone the pointer, so readers never wait on the store.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::users::repo::{StoreError, UserStore};
use crate::users::repo_types::UserRecord;

#[derive(Debug, Clone)]
pub struct Snapshot {
    users: Vec<UserRecord>,
    loaded_at: OffsetDateTime,
}

impl Snapshot {
    /// Builds a snapshot, dropping rows with an empty or repeated key.
    pub fn from_records(records: Vec<UserRecord>, loaded_at: OffsetDateTime) -> Self {
        let mut seen = HashSet::with_capacity(records.len());
        let mut users = Vec::with_capacity(records.len());
        for r in records {
            if r.human_user.is_empty() {
                warn!("skipping user row with empty humanUser");
                continue;
            }
            if !seen.insert(r.human_user.clone()) {
                warn!(user = %r.human_user, "skipping duplicate user row");
                continue;
            }
            users.push(r);
        }
        Self { users, loaded_at }
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn loaded_at(&self) -> OffsetDateTime {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

pub struct SnapshotCache {
    store: Arc<dyn UserStore>,
    published: RwLock<Arc<Snapshot>>,
    // Keeps a slow refresh from publishing over a newer one.
    refresh_gate: tokio::sync::Mutex<()>,
}

impl SnapshotCache {
    /// Initial load. Failing here leaves nothing to serve.
    pub async fn load(store: Arc<dyn UserStore>) -> Result<Self, StoreError> {
        let records = store.load_all().await?;
        let snapshot = Snapshot::from_records(records, OffsetDateTime::now_utc());
        info!(users = snapshot.len(), loaded_at = %snapshot.loaded_at(), "loaded user directory");
        Ok(Self {
            store,
            published: RwLock::new(Arc::new(snapshot)),
            refresh_gate: tokio::sync::Mutex::new(()),
        })
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.published.read().clone()
    }

    /// Reloads everything from the store. On error the published snapshot is
    /// left untouched.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, StoreError> {
        let _gate = self.refresh_gate.lock().await;
        let records = match self.store.load_all().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "directory refresh failed; keeping previous snapshot");
                return Err(e);
            }
        };
        let next = Arc::new(Snapshot::from_records(records, OffsetDateTime::now_utc()));
        *self.published.write() = Arc::clone(&next);
        info!(users = next.len(), loaded_at = %next.loaded_at(), "refreshed user directory");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo::MemoryUserStore;
    use crate::users::repo_types::MfaStatus;

    fn user(name: &str) -> UserRecord {
        UserRecord {
            human_user: name.into(),
            create_date: "Jan 1 2023".into(),
            password_changed_date: "Mar 15 2024".into(),
            last_access_date: "May 10 2025".into(),
            mfa_enabled: MfaStatus::Yes,
        }
    }

    fn generation(gen: usize, size: usize) -> Vec<UserRecord> {
        (0..size).map(|i| user(&format!("g{gen}-{i}"))).collect()
    }

    #[test]
    fn snapshot_drops_empty_and_duplicate_keys() {
        let snap = Snapshot::from_records(
            vec![user("a"), user(""), user("b"), user("a")],
            OffsetDateTime::now_utc(),
        );
        let names: Vec<_> = snap.users().iter().map(|u| u.human_user.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[tokio::test]
    async fn initial_load_fails_when_store_is_down() {
        let store = Arc::new(MemoryUserStore::new(vec![user("a")]));
        store.set_offline(true);
        assert!(SnapshotCache::load(store).await.is_err());
    }

    #[tokio::test]
    async fn refresh_publishes_new_records() {
        let store = Arc::new(MemoryUserStore::new(vec![user("a")]));
        let cache = SnapshotCache::load(store.clone()).await.unwrap();
        let before = cache.current();

        store.replace_all(vec![user("a"), user("b")]);
        let after = cache.refresh().await.unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
        assert!(after.loaded_at() >= before.loaded_at());
        assert_eq!(cache.current().len(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let store = Arc::new(MemoryUserStore::new(vec![user("a"), user("b")]));
        let cache = SnapshotCache::load(store.clone()).await.unwrap();
        let before = cache.current();

        store.set_offline(true);
        assert!(matches!(cache.refresh().await, Err(StoreError::Unavailable(_))));

        let after = cache.current();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_a_mixed_snapshot() {
        const SIZE: usize = 50;
        let store = Arc::new(MemoryUserStore::new(generation(0, SIZE)));
        let cache = Arc::new(SnapshotCache::load(store.clone()).await.unwrap());

        let mut readers = Vec::new();
        for _ in 0..4 {
            let cache = cache.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..2_000 {
                    let snap = cache.current();
                    assert_eq!(snap.len(), SIZE);
                    let prefix = snap.users()[0].human_user.split('-').next().unwrap().to_string();
                    assert!(snap
                        .users()
                        .iter()
                        .all(|u| u.human_user.starts_with(&format!("{prefix}-"))));
                    tokio::task::yield_now().await;
                }
            }));
        }

        for gen in 1..=100 {
            store.replace_all(generation(gen, SIZE));
            cache.refresh().await.unwrap();
        }

        for r in readers {
            r.await.unwrap();
        }
        assert!(cache.current().users()[0].human_user.starts_with("g100-"));
    }
}
