use super::{DrainReport, SyncEngine};
use crate::error::{ErrorKind, Result};
use cumulus_remote::{NewFileRecord, derive_storage_path};
use cumulus_store::QueuedWrite;
use exn::ResultExt;
use std::path::PathBuf;
use time::UtcDateTime;

impl SyncEngine {
    /// Replay a snapshot of the queue, oldest first, one at a time.
    ///
    /// The snapshot is taken once by the caller. Uploads queued while this
    /// runs wait for the next run.
    pub(super) async fn drain(&self, snapshot: Vec<QueuedWrite>) -> Result<DrainReport> {
        let total = snapshot.len() as u64;
        let mut report = DrainReport::default();
        for write in snapshot {
            if let Err(error) = self.replay(&write).await {
                // Stop here: uploading later items now would make them visible
                // before this one.
                tracing::warn!(id = %write.id, name = %write.name, ?error, "replay failed; stopping drain");
                report.failed = 1;
                break;
            }
            self.queue.dequeue(&write.id).await?;
            report.succeeded += 1;
        }
        report.remaining = total - report.succeeded;
        tracing::info!(succeeded = report.succeeded, remaining = report.remaining, "queue drained");
        Ok(report)
    }

    #[tracing::instrument(skip_all, fields(id = %write.id))]
    async fn replay(&self, write: &QueuedWrite) -> Result<PathBuf> {
        let upload = Upload {
            name: &write.name,
            mime_type: &write.mime_type,
            size_bytes: write.size_bytes,
            payload: &write.payload,
            folder_id: write.target_folder_id.as_deref(),
        };
        self.push(upload).await
    }

    /// Upload a blob under a fresh path, then record its metadata.
    ///
    /// If the metadata insert fails, the uploaded blob stays behind as an
    /// orphan: the remote contract has no delete. A retry uploads again under
    /// a new path.
    pub(crate) async fn push(&self, upload: Upload<'_>) -> Result<PathBuf> {
        let storage_path = derive_storage_path(&self.identity, upload.name, UtcDateTime::now())
            .or_raise(|| ErrorKind::RemoteUploadFailed)?;
        self.bounded(self.remote.upload_blob(&storage_path, upload.payload), ErrorKind::RemoteUploadFailed).await?;
        let record = NewFileRecord {
            name: upload.name.to_string(),
            size_bytes: upload.size_bytes,
            mime_type: upload.mime_type.to_string(),
            folder_id: upload.folder_id.map(str::to_string),
            owner: self.identity.clone(),
            storage_path,
        };
        if let Err(error) =
            self.bounded(self.remote.insert_file_metadata(&record), ErrorKind::RemoteMetadataFailed).await
        {
            tracing::warn!(path = %record.storage_path.display(), "blob uploaded without metadata; left orphaned");
            return Err(error);
        }
        tracing::debug!(path = %record.storage_path.display(), "uploaded");
        Ok(record.storage_path)
    }
}

/// Borrowed view of everything a two-phase write needs.
pub(crate) struct Upload<'a> {
    pub name: &'a str,
    pub mime_type: &'a str,
    pub size_bytes: u64,
    pub payload: &'a [u8],
    pub folder_id: Option<&'a str>,
}
