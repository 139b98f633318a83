use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::PgPool;
use tracing::debug;

use crate::users::repo_types::{UserRecord, UserRow};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Unavailable(String),

    /// A record with this key already exists.
    #[error("duplicate key {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Durable keyed collection of users, keyed by `human_user`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<UserRecord>, StoreError>;
    async fn insert(&self, user: &UserRecord) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn load_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT human_user, create_date, password_changed_date, last_access_date, mfa_enabled
            FROM users_table
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        debug!(rows = rows.len(), "loaded users_table");
        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    async fn insert(&self, user: &UserRecord) -> Result<(), StoreError> {
        let res = sqlx::query(
            r#"
            INSERT INTO users_table (human_user, create_date, password_changed_date, last_access_date, mfa_enabled)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&user.human_user)
        .bind(&user.create_date)
        .bind(&user.password_changed_date)
        .bind(&user.last_access_date)
        .bind(user.mfa_enabled.as_bool())
        .execute(&self.db)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Conflict(user.human_user.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store. Enforces key uniqueness like the table's primary key and
/// can be switched offline to exercise failure paths.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<UserRecord>>,
    offline: AtomicBool,
}

impl MemoryUserStore {
    pub fn new(rows: Vec<UserRecord>) -> Self {
        Self {
            rows: Mutex::new(rows),
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Replace the whole table content.
    pub fn replace_all(&self, rows: Vec<UserRecord>) {
        *self.rows.lock() = rows;
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn load_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.check_online()?;
        Ok(self.rows.lock().clone())
    }

    async fn insert(&self, user: &UserRecord) -> Result<(), StoreError> {
        self.check_online()?;
        let mut rows = self.rows.lock();
        if rows.iter().any(|r| r.human_user == user.human_user) {
            return Err(StoreError::Conflict(user.human_user.clone()));
        }
        rows.push(user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::MfaStatus;

    fn user(name: &str) -> UserRecord {
        UserRecord {
            human_user: name.into(),
            create_date: "Jan 1 2023".into(),
            password_changed_date: "Jan 1 2023".into(),
            last_access_date: "Jan 1 2023".into(),
            mfa_enabled: MfaStatus::No,
        }
    }

    #[tokio::test]
    async fn memory_store_rejects_duplicate_keys() {
        let store = MemoryUserStore::new(vec![user("alice")]);
        let err = store.insert(&user("alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref k) if k == "alice"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn memory_store_offline_fails_both_operations() {
        let store = MemoryUserStore::new(vec![user("alice")]);
        store.set_offline(true);
        assert!(matches!(store.load_all().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.insert(&user("bob")).await, Err(StoreError::Unavailable(_))));
        store.set_offline(false);
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }
}
