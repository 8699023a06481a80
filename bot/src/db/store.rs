use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::models::subscriptions::{WatchKey, WatchPair};
use crate::watcher::SubscriptionStore;

/// SQLite-backed implementation of the watcher's store seam.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl SubscriptionStore for SqliteStore {
    async fn snapshot(&self) -> Result<Vec<WatchPair>> {
        super::subscriptions::snapshot(&self.pool).await
    }

    async fn load_notified_sets(&self) -> Result<HashMap<WatchKey, Vec<String>>> {
        super::notified::load_notified_sets(&self.pool).await
    }

    async fn record_notified(
        &self,
        updates: &HashMap<WatchKey, Vec<String>>,
        cap: usize,
    ) -> Result<()> {
        super::notified::record_notified(&self.pool, updates, cap).await?;
        Ok(())
    }
}
