//! Background cleanup of orphaned object-storage assets.
//!
//! Deleting a creator or product must eventually delete the images backing
//! it, but storage calls never run on the request path. Instead the
//! deleting transaction writes outbox rows (`asset_cleanup`) and this
//! worker drains them: derive the public id from the stored URL, ask the
//! store to delete it, remove the row on success, and bump the attempt
//! counter on failure. Rows that keep failing are dropped with an error
//! log after `cleanup.max_attempts`.

use anyhow::Result;
use sqlx::{Sqlite, Transaction};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use super::{public_id_from_url, AssetStore};
use crate::config::CleanupConfig;
use crate::DbPool;

/// Queue an asset for deletion within the caller's transaction.
///
/// URLs that no public id can be derived from (placeholders, empty
/// strings) are skipped, so callers can pass row values unfiltered.
pub async fn enqueue(
    tx: &mut Transaction<'_, Sqlite>,
    asset_url: &str,
) -> Result<(), sqlx::Error> {
    if public_id_from_url(asset_url).is_none() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO asset_cleanup (id, asset_url, attempts, created_at) VALUES (?, ?, 0, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(asset_url)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub deleted: usize,
    pub failed: usize,
    pub dropped: usize,
}

/// Drains the asset-cleanup outbox on a fixed interval.
pub struct AssetCleanup {
    db: DbPool,
    store: Arc<dyn AssetStore>,
    config: CleanupConfig,
}

impl AssetCleanup {
    pub fn new(db: DbPool, store: Arc<dyn AssetStore>, config: CleanupConfig) -> Self {
        Self { db, store, config }
    }

    /// Run the drain loop forever. Spawned as a background task at startup.
    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(self.config.interval_secs));
        loop {
            ticker.tick().await;
            match self.run_cycle().await {
                Ok(stats) if stats.deleted + stats.failed + stats.dropped > 0 => {
                    info!(
                        deleted = stats.deleted,
                        failed = stats.failed,
                        dropped = stats.dropped,
                        "Asset cleanup cycle finished"
                    );
                }
                Ok(_) => debug!("Asset cleanup cycle finished, nothing to do"),
                Err(e) => warn!(error = %e, "Asset cleanup cycle failed"),
            }
        }
    }

    /// Attempt every pending outbox row once.
    pub async fn run_cycle(&self) -> Result<CleanupStats> {
        let mut stats = CleanupStats::default();

        let pending: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT id, asset_url, attempts FROM asset_cleanup ORDER BY created_at",
        )
        .fetch_all(&self.db)
        .await?;

        for (id, asset_url, attempts) in pending {
            // enqueue() only accepts derivable URLs, but rows may predate
            // a config change; drop anything we can no longer resolve
            let Some(public_id) = public_id_from_url(&asset_url) else {
                warn!(asset_url, "Dropping cleanup row with underivable public id");
                self.remove_row(&id).await?;
                stats.dropped += 1;
                continue;
            };

            match self.store.delete(&public_id).await {
                Ok(()) => {
                    debug!(public_id, "Deleted orphaned asset");
                    self.remove_row(&id).await?;
                    stats.deleted += 1;
                }
                Err(e) if attempts + 1 >= self.config.max_attempts => {
                    error!(
                        public_id,
                        attempts = attempts + 1,
                        error = %e,
                        "Giving up on asset deletion, storage object may leak"
                    );
                    self.remove_row(&id).await?;
                    stats.dropped += 1;
                }
                Err(e) => {
                    warn!(public_id, error = %e, "Asset deletion failed, will retry");
                    sqlx::query("UPDATE asset_cleanup SET attempts = attempts + 1 WHERE id = ?")
                        .bind(&id)
                        .execute(&self.db)
                        .await?;
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }

    async fn remove_row(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM asset_cleanup WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::storage::{StorageError, UploadedAsset};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    /// Records deletions; fails every call while `failing` is set.
    struct RecordingStore {
        deleted: Mutex<Vec<String>>,
        failing: bool,
    }

    impl RecordingStore {
        fn new(failing: bool) -> Self {
            Self {
                deleted: Mutex::new(Vec::new()),
                failing,
            }
        }
    }

    #[async_trait]
    impl AssetStore for RecordingStore {
        async fn upload(
            &self,
            _file_stem: &str,
            _content_type: &str,
            _data: Bytes,
        ) -> Result<UploadedAsset, StorageError> {
            Err(StorageError::NotConfigured)
        }

        async fn delete(&self, public_id: &str) -> Result<(), StorageError> {
            if self.failing {
                return Err(StorageError::Rejected {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            self.deleted.lock().unwrap().push(public_id.to_string());
            Ok(())
        }
    }

    async fn enqueue_url(pool: &DbPool, url: &str) {
        let mut tx = pool.begin().await.unwrap();
        enqueue(&mut tx, url).await.unwrap();
        tx.commit().await.unwrap();
    }

    async fn pending_count(pool: &DbPool) -> i64 {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM asset_cleanup")
            .fetch_one(pool)
            .await
            .unwrap();
        n
    }

    #[tokio::test]
    async fn test_cycle_deletes_and_clears_rows() {
        let pool = db::init_in_memory().await.unwrap();
        enqueue_url(&pool, "https://images.example.com/atelier/product_1.png").await;
        enqueue_url(&pool, "https://images.example.com/atelier/product_2.png").await;

        let store = Arc::new(RecordingStore::new(false));
        let cleanup = AssetCleanup::new(pool.clone(), store.clone(), CleanupConfig::default());

        let stats = cleanup.run_cycle().await.unwrap();
        assert_eq!(stats.deleted, 2);
        assert_eq!(pending_count(&pool).await, 0);

        let deleted = store.deleted.lock().unwrap();
        assert!(deleted.contains(&"atelier/product_1".to_string()));
        assert!(deleted.contains(&"atelier/product_2".to_string()));
    }

    #[tokio::test]
    async fn test_failed_deletions_are_retried_then_dropped() {
        let pool = db::init_in_memory().await.unwrap();
        enqueue_url(&pool, "https://images.example.com/atelier/product_9.png").await;

        let config = CleanupConfig {
            interval_secs: 60,
            max_attempts: 2,
        };
        let cleanup =
            AssetCleanup::new(pool.clone(), Arc::new(RecordingStore::new(true)), config);

        // First cycle fails and keeps the row
        let stats = cleanup.run_cycle().await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(pending_count(&pool).await, 1);

        // Second cycle exhausts the attempts and drops it
        let stats = cleanup.run_cycle().await.unwrap();
        assert_eq!(stats.dropped, 1);
        assert_eq!(pending_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_enqueue_skips_placeholder_urls() {
        let pool = db::init_in_memory().await.unwrap();
        enqueue_url(&pool, "").await;
        assert_eq!(pending_count(&pool).await, 0);
    }
}
