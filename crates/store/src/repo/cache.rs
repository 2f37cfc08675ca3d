use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{CacheRow, payload_hash, to_millis, to_stored_size};
use crate::record::{CachedFile, Totals};
use exn::ResultExt;
use sqlx::SqlitePool;

/// Repository for files mirrored locally for offline reading.
///
/// Listing order is unspecified. There is no eviction: a full disk surfaces
/// as [`ErrorKind::Unavailable`] from [`put`](Self::put).
#[derive(Debug, Clone)]
pub struct CacheRepository {
    pool: SqlitePool,
}
impl From<&Database> for CacheRepository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl CacheRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a cached file, replacing any existing entry with the same id.
    pub async fn put(&self, file: &CachedFile) -> Result<()> {
        sqlx::query(include_str!("../../queries/cache_upsert.sql"))
            .bind(file.id.as_str())
            .bind(file.name.as_str())
            .bind(file.mime_type.as_str())
            .bind(to_stored_size(file.size_bytes)?)
            .bind(file.payload.as_slice())
            .bind(payload_hash(&file.payload))
            .bind(to_millis(file.cached_at)?)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        Ok(())
    }

    pub async fn get(&self, id: impl AsRef<str>) -> Result<Option<CachedFile>> {
        let row: Option<CacheRow> = sqlx::query_as(include_str!("../../queries/cache_get.sql"))
            .bind(id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        row.map(CachedFile::try_from).transpose()
    }

    pub async fn get_all(&self) -> Result<Vec<CachedFile>> {
        let rows: Vec<CacheRow> = sqlx::query_as(include_str!("../../queries/cache_list.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        rows.into_iter().map(CachedFile::try_from).collect()
    }

    /// List the ids of every cached file without loading any payloads.
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(include_str!("../../queries/cache_list_ids.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        Ok(ids)
    }

    /// Returns `true` if an entry was removed. Deleting an absent id is not
    /// an error.
    pub async fn delete(&self, id: impl AsRef<str>) -> Result<bool> {
        let result = sqlx::query(include_str!("../../queries/cache_delete.sql"))
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

    /// Remove every cached file, returning how many were removed.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query(include_str!("../../queries/cache_clear.sql"))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        if result.rows_affected() > 0 {
            super::reclaim(&self.pool).await;
        }
        Ok(result.rows_affected())
    }

    pub async fn totals(&self) -> Result<Totals> {
        let row: (i64, i64) = sqlx::query_as(include_str!("../../queries/cache_totals.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        super::totals(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::UtcDateTime;

    fn cached(id: &str, payload: &[u8]) -> CachedFile {
        CachedFile {
            id: id.to_string(),
            name: format!("{id}.txt"),
            mime_type: "text/plain".to_string(),
            size_bytes: payload.len() as u64,
            payload: payload.to_vec(),
            cached_at: UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.cache();
        repo.put(&cached("a", b"alpha")).await.unwrap();
        assert_eq!(repo.get("a").await.unwrap(), Some(cached("a", b"alpha")));
        assert_eq!(repo.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites_by_id() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.cache();
        repo.put(&cached("a", b"first")).await.unwrap();
        repo.put(&cached("a", b"second")).await.unwrap();
        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].payload, b"second");
    }

    #[tokio::test]
    async fn test_delete_is_a_no_op_when_absent() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.cache();
        repo.put(&cached("a", b"alpha")).await.unwrap();
        assert!(repo.delete("a").await.unwrap());
        assert!(!repo.delete("a").await.unwrap());
        assert!(repo.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_and_totals() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.cache();
        assert_eq!(repo.totals().await.unwrap(), Totals::default());
        repo.put(&cached("a", b"12345")).await.unwrap();
        repo.put(&cached("b", b"123")).await.unwrap();
        assert_eq!(repo.totals().await.unwrap(), Totals { count: 2, bytes: 8 });
        let mut ids = repo.list_ids().await.unwrap();
        ids.sort();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(repo.clear().await.unwrap(), 2);
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        let db = Database::connect(&path).await.unwrap();
        db.cache().put(&cached("a", b"persisted")).await.unwrap();
        db.close().await;
        let db = Database::connect(&path).await.unwrap();
        assert_eq!(db.cache().get("a").await.unwrap().unwrap().payload, b"persisted");
        db.close().await;
    }

    #[tokio::test]
    async fn test_closed_store_is_unavailable_not_empty() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.cache();
        db.close().await;
        let err = repo.get_all().await.unwrap_err();
        assert_eq!(*err, ErrorKind::Unavailable);
        let err = repo.put(&cached("a", b"alpha")).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Unavailable);
    }

    async fn free_pages(db: &Database) -> i64 {
        let row: (i64,) = sqlx::query_as("PRAGMA freelist_count").fetch_one(db.pool()).await.unwrap();
        row.0
    }

    #[tokio::test]
    async fn test_removed_payloads_give_space_back() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path().join("store.sqlite")).await.unwrap();
        let repo = db.cache();
        let big = vec![0x5a; 256 * 1024];
        for id in ["a", "b", "c"] {
            repo.put(&cached(id, &big)).await.unwrap();
        }

        assert!(repo.delete("a").await.unwrap());
        assert_eq!(free_pages(&db).await, 0);
        assert_eq!(repo.clear().await.unwrap(), 2);
        assert_eq!(free_pages(&db).await, 0);
        // INCREMENTAL = 2
        let mode: (i64,) = sqlx::query_as("PRAGMA auto_vacuum").fetch_one(db.pool()).await.unwrap();
        assert_eq!(mode.0, 2);
        db.close().await;
    }

    #[tokio::test]
    async fn test_put_stores_hash_of_payload() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.cache();
        repo.put(&cached("a", b"alpha")).await.unwrap();
        let row: (Vec<u8>, String) = sqlx::query_as("SELECT payload, payload_hash FROM cache WHERE id = 'a'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(row.0, b"alpha");
        assert_eq!(row.1, blake3::hash(b"alpha").to_string());
    }
}
