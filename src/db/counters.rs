//! Denormalized aggregate counters.
//!
//! The `counts` table holds one row per tracked entity kind so the index
//! endpoint can read the totals without scanning the entity tables. Every
//! insert/delete of a tracked row adjusts the matching counter inside the
//! same transaction as the row mutation; a reconciliation pass recomputes
//! the counters from `COUNT(*)` to repair drift (it runs at startup).

use anyhow::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::warn;

/// Entity kinds tracked by the `counts` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Creators,
    Products,
}

impl CounterKind {
    /// The `counts.kind` key for this entity kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterKind::Creators => "creator_table",
            CounterKind::Products => "product_table",
        }
    }

    /// The table whose rows this counter mirrors.
    fn table(&self) -> &'static str {
        match self {
            CounterKind::Creators => "creators",
            CounterKind::Products => "products",
        }
    }
}

/// Adjust a counter by `delta` within the caller's transaction.
///
/// Callers must run this in the same transaction as the row mutation it
/// mirrors so the pair commits or rolls back together.
pub async fn adjust(
    tx: &mut Transaction<'_, Sqlite>,
    kind: CounterKind,
    delta: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE counts SET count = count + ? WHERE kind = ?")
        .bind(delta)
        .bind(kind.as_str())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Read a single counter.
pub async fn read(pool: &SqlitePool, kind: CounterKind) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT count FROM counts WHERE kind = ?")
        .bind(kind.as_str())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Recompute both counters from `COUNT(*)` and overwrite the stored values.
///
/// Logs any drift it repairs. Safe to run at any time the system is not
/// mid-transaction.
pub async fn reconcile_counters(pool: &SqlitePool) -> Result<()> {
    for kind in [CounterKind::Creators, CounterKind::Products] {
        let (actual,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", kind.table()))
                .fetch_one(pool)
                .await?;
        let stored = read(pool, kind).await?;

        if stored != actual {
            warn!(
                kind = kind.as_str(),
                stored, actual, "Counter drift detected, repairing"
            );
            sqlx::query("UPDATE counts SET count = ? WHERE kind = ?")
                .bind(actual)
                .bind(kind.as_str())
                .execute(pool)
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_counters_start_at_zero() {
        let pool = db::init_in_memory().await.unwrap();
        assert_eq!(read(&pool, CounterKind::Creators).await.unwrap(), 0);
        assert_eq!(read(&pool, CounterKind::Products).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_adjust_commits_with_transaction() {
        let pool = db::init_in_memory().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        adjust(&mut tx, CounterKind::Creators, 1).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(read(&pool, CounterKind::Creators).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_adjust_rolls_back_with_transaction() {
        let pool = db::init_in_memory().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        adjust(&mut tx, CounterKind::Products, 5).await.unwrap();
        drop(tx); // rollback

        assert_eq!(read(&pool, CounterKind::Products).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_repairs_drift() {
        let pool = db::init_in_memory().await.unwrap();

        // Force drift: counter says 7 but the table is empty
        sqlx::query("UPDATE counts SET count = 7 WHERE kind = 'creator_table'")
            .execute(&pool)
            .await
            .unwrap();

        reconcile_counters(&pool).await.unwrap();
        assert_eq!(read(&pool, CounterKind::Creators).await.unwrap(), 0);
    }
}
