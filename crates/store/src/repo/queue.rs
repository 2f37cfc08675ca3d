use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{QueueRow, payload_hash, to_millis, to_stored_size};
use crate::record::{QueuedWrite, Totals};
use exn::ResultExt;
use sqlx::SqlitePool;

/// Repository for uploads waiting to be replayed against the remote store.
///
/// [`get_all`](Self::get_all) returns records ordered by `queued_at`, with
/// ties broken by insertion order. Overwriting an existing id keeps the
/// record's original position.
#[derive(Debug, Clone)]
pub struct QueueRepository {
    pool: SqlitePool,
}
impl From<&Database> for QueueRepository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl QueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a queued write, replacing any existing entry with the same id.
    pub async fn put(&self, write: &QueuedWrite) -> Result<()> {
        sqlx::query(include_str!("../../queries/queue_upsert.sql"))
            .bind(write.id.as_str())
            .bind(write.name.as_str())
            .bind(write.mime_type.as_str())
            .bind(to_stored_size(write.size_bytes)?)
            .bind(write.payload.as_slice())
            .bind(payload_hash(&write.payload))
            .bind(write.target_folder_id.as_deref())
            .bind(to_millis(write.queued_at)?)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        Ok(())
    }

    pub async fn get(&self, id: impl AsRef<str>) -> Result<Option<QueuedWrite>> {
        let row: Option<QueueRow> = sqlx::query_as(include_str!("../../queries/queue_get.sql"))
            .bind(id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        row.map(QueuedWrite::try_from).transpose()
    }

    /// Every queued write, oldest first.
    pub async fn get_all(&self) -> Result<Vec<QueuedWrite>> {
        let rows: Vec<QueueRow> = sqlx::query_as(include_str!("../../queries/queue_list.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        rows.into_iter().map(QueuedWrite::try_from).collect()
    }

    /// Returns `true` if an entry was removed. Deleting an absent id is not
    /// an error.
    pub async fn delete(&self, id: impl AsRef<str>) -> Result<bool> {
        let result = sqlx::query(include_str!("../../queries/queue_delete.sql"))
            .bind(id.as_ref())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        let removed = result.rows_affected() > 0;
        if removed {
            super::reclaim(&self.pool).await;
        }
        Ok(removed)
    }

    /// Remove every queued write, returning how many were removed.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query(include_str!("../../queries/queue_clear.sql"))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        if result.rows_affected() > 0 {
            super::reclaim(&self.pool).await;
        }
        Ok(result.rows_affected())
    }

    pub async fn totals(&self) -> Result<Totals> {
        let row: (i64, i64) = sqlx::query_as(include_str!("../../queries/queue_totals.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        super::totals(row)
    }
}
