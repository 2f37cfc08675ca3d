//! Upload queue manager.

use crate::error::{ErrorKind, Result};
use cumulus_store::{Database, QueueRepository, QueuedWrite, Totals};
use exn::ResultExt;
use time::UtcDateTime;
use uuid::Uuid;

/// An upload the caller wants to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUpload {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub payload: Vec<u8>,
    /// `None` means the storage root.
    pub target_folder_id: Option<String>,
}
impl NewUpload {
    /// An upload to the storage root, sized from the payload.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: payload.len() as u64,
            payload,
            target_folder_id: None,
        }
    }

    pub fn in_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.target_folder_id = Some(folder_id.into());
        self
    }
}

/// Uploads recorded while disconnected, replayed in arrival order.
///
/// Callers can add to the queue, read it and clear it, but only
/// reconciliation removes single entries, and only once the remote store has
/// both stored the payload and recorded its metadata.
#[derive(Debug, Clone)]
pub struct UploadQueue {
    repo: QueueRepository,
}
impl From<&Database> for UploadQueue {
    fn from(db: &Database) -> Self {
        Self { repo: db.queue() }
    }
}
impl UploadQueue {
    /// Record an upload for later replay and return its freshly generated id.
    #[tracing::instrument(skip_all, fields(name = %upload.name, size = upload.size_bytes))]
    pub async fn enqueue(&self, upload: NewUpload) -> Result<String> {
        let write = QueuedWrite {
            id: Uuid::now_v7().to_string(),
            name: upload.name,
            mime_type: upload.mime_type,
            size_bytes: upload.size_bytes,
            payload: upload.payload,
            target_folder_id: upload.target_folder_id,
            queued_at: UtcDateTime::now(),
        };
        self.repo.put(&write).await.or_raise(|| ErrorKind::StorageUnavailable)?;
        tracing::info!(id = %write.id, "queued upload for reconciliation");
        Ok(write.id)
    }

    /// Every queued upload, oldest first. Ties on timestamp keep arrival
    /// order.
    pub async fn list_queued(&self) -> Result<Vec<QueuedWrite>> {
        self.repo.get_all().await.or_raise(|| ErrorKind::StorageUnavailable)
    }

    /// Only for reconciliation, after a confirmed replay.
    pub(crate) async fn dequeue(&self, id: &str) -> Result<()> {
        self.repo.delete(id).await.or_raise(|| ErrorKind::StorageUnavailable)?;
        Ok(())
    }

    /// Sum of the declared sizes of every queued upload.
    pub async fn aggregate_size(&self) -> Result<u64> {
        Ok(self.totals().await?.bytes)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(self.totals().await?.count)
    }

    pub async fn totals(&self) -> Result<Totals> {
        self.repo.totals().await.or_raise(|| ErrorKind::StorageUnavailable)
    }

    /// Discard every queued upload without replaying it.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self) -> Result<u64> {
        let removed = self.repo.clear().await.or_raise(|| ErrorKind::StorageUnavailable)?;
        tracing::warn!(removed, "discarded queued uploads");
        Ok(removed)
    }
}
