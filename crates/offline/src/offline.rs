use crate::cache::OfflineCache;
use crate::connectivity::{ConnectivityMonitor, Reconnected};
use crate::error::{ErrorKind, Result};
use crate::queue::{NewUpload, UploadQueue};
use crate::sync::{Summary, SyncEngine, Upload};
use cumulus_remote::RemoteHandle;
use cumulus_store::{CachedFile, Database, QueuedWrite};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;

/// Counts and declared sizes of both collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub cached_files: u64,
    pub cached_bytes: u64,
    pub queued_files: u64,
    pub queued_bytes: u64,
}

/// Where an [`Offline::upload`] ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Stored remotely at this path.
    Uploaded(PathBuf),
    /// Queued for the next reconciliation, under this local id.
    Queued(String),
}

/// Everything the application layer needs to keep working offline.
///
/// # Examples
///
/// ```no_run
/// use cumulus_offline::{ConnectivityMonitor, ConnectivityState, NewUpload, Offline};
/// use cumulus_remote::backend::LocalRemote;
/// use cumulus_store::Database;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Database::connect("/var/lib/cumulus/offline.db").await?;
/// let remote = Arc::new(LocalRemote::new("share", "/mnt/share")?);
/// let monitor = Arc::new(ConnectivityMonitor::new(ConnectivityState::Offline));
/// let offline = Arc::new(Offline::new(&db, remote, monitor, "user-1", Duration::from_secs(30)));
/// let _task = offline.spawn();
///
/// offline.upload(NewUpload::new("notes.txt", "text/plain", b"hello".to_vec())).await?;
/// # Ok(())
/// # }
/// ```
pub struct Offline {
    cache: OfflineCache,
    queue: UploadQueue,
    monitor: Arc<ConnectivityMonitor>,
    engine: SyncEngine,
}
impl Offline {
    pub fn new(
        db: &Database,
        remote: RemoteHandle,
        monitor: Arc<ConnectivityMonitor>,
        identity: impl Into<String>,
        remote_timeout: Duration,
    ) -> Self {
        let cache = OfflineCache::from(db);
        let queue = UploadQueue::from(db);
        let engine = SyncEngine::new(cache.clone(), queue.clone(), remote, identity).with_timeout(remote_timeout);
        Self {
            cache,
            queue,
            monitor,
            engine,
        }
    }

    pub fn cache(&self) -> &OfflineCache {
        &self.cache
    }

    pub fn queue(&self) -> &UploadQueue {
        &self.queue
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Queue an upload regardless of connectivity.
    pub async fn enqueue_offline_write(&self, upload: NewUpload) -> Result<String> {
        self.queue.enqueue(upload).await
    }

    pub async fn save_for_offline(
        &self,
        id: &str,
        name: impl Into<String>,
        payload: Vec<u8>,
        mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Result<()> {
        self.cache.save_offline(id, name, payload, mime_type, size_bytes).await
    }

    pub async fn remove_from_offline(&self, id: &str) -> Result<bool> {
        self.cache.remove_offline(id).await
    }

    pub async fn read_offline(&self, id: &str) -> Result<Option<CachedFile>> {
        self.cache.read_offline(id).await
    }

    pub async fn list_offline(&self) -> Result<Vec<CachedFile>> {
        self.cache.list_offline().await
    }

    pub async fn list_queued(&self) -> Result<Vec<QueuedWrite>> {
        self.queue.list_queued().await
    }

    pub async fn clear_offline(&self) -> Result<u64> {
        self.cache.clear().await
    }

    pub async fn clear_queue(&self) -> Result<u64> {
        self.queue.clear().await
    }

    pub async fn stats(&self) -> Result<Stats> {
        let cached = self.cache.totals().await?;
        let queued = self.queue.totals().await?;
        Ok(Stats {
            cached_files: cached.count,
            cached_bytes: cached.bytes,
            queued_files: queued.count,
            queued_bytes: queued.bytes,
        })
    }

    /// Reconcile now instead of waiting for the next reconnection.
    ///
    /// Fails with [`NotConnected`](ErrorKind::NotConnected) while offline.
    /// Returns `Ok(None)` if a run was already in progress.
    pub async fn trigger_reconciliation(&self) -> Result<Option<Summary>> {
        if !self.monitor.is_online() {
            exn::bail!(ErrorKind::NotConnected);
        }
        self.engine.reconcile().await
    }

    /// Upload straight to the remote store when online, otherwise queue.
    ///
    /// A remote failure while online also queues the upload, so the caller's
    /// write is never lost. Only a local storage failure is returned.
    ///
    /// A direct upload does not wait for the queue: while older queued writes
    /// are still draining, this file can appear remotely before them.
    #[tracing::instrument(skip_all, fields(name = %upload.name))]
    pub async fn upload(&self, upload: NewUpload) -> Result<UploadOutcome> {
        if self.monitor.is_online() {
            let attempt = Upload {
                name: &upload.name,
                mime_type: &upload.mime_type,
                size_bytes: upload.size_bytes,
                payload: &upload.payload,
                folder_id: upload.target_folder_id.as_deref(),
            };
            match self.engine.push(attempt).await {
                Ok(path) => return Ok(UploadOutcome::Uploaded(path)),
                Err(error) => tracing::warn!(?error, "direct upload failed; queueing instead"),
            }
        }
        Ok(UploadOutcome::Queued(self.queue.enqueue(upload).await?))
    }

    /// Reconcile on every reconnection until the returned task is aborted.
    ///
    /// Runs never overlap. Reconnections that arrive while a run is in
    /// progress collapse into a single follow-up run, so a write queued
    /// during a gap inside a run is still replayed.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut events = self.monitor.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => tracing::debug!(at = ?event.at, "reconnected"),
                    Err(RecvError::Lagged(missed)) => tracing::debug!(missed, "reconnection events lagged"),
                    Err(RecvError::Closed) => break,
                }
                loop {
                    this.reconcile_in_background().await;
                    match take_pending(&mut events) {
                        Some(true) => tracing::debug!("reconnected during the run; running again"),
                        Some(false) => break,
                        None => return,
                    }
                }
            }
        })
    }

    async fn reconcile_in_background(&self) {
        match self.engine.reconcile().await {
            Ok(Some(summary)) => tracing::info!(
                succeeded = summary.drain.succeeded,
                remaining = summary.drain.remaining,
                "synced after reconnecting"
            ),
            Ok(None) => {},
            Err(error) => tracing::error!(?error, "reconciliation aborted; will retry on next reconnect"),
        }
    }
}

/// Empty the event channel without waiting. Returns whether any reconnection
/// was waiting, or `None` once the monitor is gone.
fn take_pending(events: &mut broadcast::Receiver<Reconnected>) -> Option<bool> {
    let mut seen = false;
    loop {
        match events.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => seen = true,
            Err(TryRecvError::Empty) => return Some(seen),
            Err(TryRecvError::Closed) => return None,
        }
    }
}
