use crate::config::AppConfig;
use crate::db;
use crate::users::repo::{MemoryUserStore, PgUserStore, StoreError, UserStore};
use crate::users::repo_types::UserRecord;
use crate::users::snapshot::SnapshotCache;
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn UserStore>,
    pub directory: Arc<SnapshotCache>,
}

impl AppState {
    /// Connects to Postgres, prepares `users_table` and loads the directory.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config).await?;
        db::initialize(&pool, config.seed_on_create).await?;

        let store = Arc::new(PgUserStore::new(pool)) as Arc<dyn UserStore>;
        let state = Self::from_store(config, store)
            .await
            .context("initial user directory load")?;
        Ok(state)
    }

    pub async fn from_store(
        config: AppConfig,
        store: Arc<dyn UserStore>,
    ) -> Result<Self, StoreError> {
        let directory = SnapshotCache::load(store.clone()).await?;
        Ok(Self {
            config: Arc::new(config),
            store,
            directory: Arc::new(directory),
        })
    }

    /// State backed by a [`MemoryUserStore`]; the store handle is returned so
    /// callers can inspect it or take it offline.
    pub async fn in_memory(
        records: Vec<UserRecord>,
    ) -> Result<(Self, Arc<MemoryUserStore>), StoreError> {
        let store = Arc::new(MemoryUserStore::new(records));
        let state = Self::from_store(AppConfig::local(), store.clone()).await?;
        Ok((state, store))
    }
}
