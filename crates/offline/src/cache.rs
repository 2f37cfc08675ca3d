//! Offline cache manager.

use crate::error::{ErrorKind, Result};
use cumulus_store::{CacheRepository, CachedFile, Database, Totals};
use exn::ResultExt;
use time::UtcDateTime;

/// Cached copies of remote files, readable while disconnected.
///
/// Entries are keyed by the remote file id and live until removed. There is
/// no expiry and no eviction: if the disk fills up, writes fail with
/// [`StorageUnavailable`](ErrorKind::StorageUnavailable).
#[derive(Debug, Clone)]
pub struct OfflineCache {
    repo: CacheRepository,
}
impl From<&Database> for OfflineCache {
    fn from(db: &Database) -> Self {
        Self { repo: db.cache() }
    }
}
impl OfflineCache {
    /// Store a copy of a remote file, replacing any previous copy with the
    /// same id.
    #[tracing::instrument(skip(self, name, payload, mime_type), fields(size = size_bytes))]
    pub async fn save_offline(
        &self,
        id: &str,
        name: impl Into<String>,
        payload: Vec<u8>,
        mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Result<()> {
        let file = CachedFile {
            id: id.to_string(),
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            payload,
            cached_at: UtcDateTime::now(),
        };
        self.repo.put(&file).await.or_raise(|| ErrorKind::StorageUnavailable)?;
        tracing::debug!("saved for offline use");
        Ok(())
    }

    /// Drop a cached copy. Returns whether anything was removed; removing an
    /// id that isn't cached is not an error.
    pub async fn remove_offline(&self, id: &str) -> Result<bool> {
        self.repo.delete(id).await.or_raise(|| ErrorKind::StorageUnavailable)
    }

    pub async fn read_offline(&self, id: &str) -> Result<Option<CachedFile>> {
        self.repo.get(id).await.or_raise(|| ErrorKind::StorageUnavailable)
    }

    pub async fn list_offline(&self) -> Result<Vec<CachedFile>> {
        self.repo.get_all().await.or_raise(|| ErrorKind::StorageUnavailable)
    }

    /// Ids of every cached file, without loading payloads.
    pub async fn ids(&self) -> Result<Vec<String>> {
        self.repo.list_ids().await.or_raise(|| ErrorKind::StorageUnavailable)
    }

    /// Sum of the declared sizes of every cached file.
    pub async fn aggregate_size(&self) -> Result<u64> {
        Ok(self.totals().await?.bytes)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(self.totals().await?.count)
    }

    pub async fn totals(&self) -> Result<Totals> {
        self.repo.totals().await.or_raise(|| ErrorKind::StorageUnavailable)
    }

    /// Remove every cached file. Returns how many were removed.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self) -> Result<u64> {
        let removed = self.repo.clear().await.or_raise(|| ErrorKind::StorageUnavailable)?;
        tracing::info!(removed, "cleared offline cache");
        Ok(removed)
    }
}
