//! Reconciliation after a connectivity gap.
//!
//! One run of [`SyncEngine::reconcile`] makes two independent passes:
//!
//! 1. **Audit**: compares the ids in the offline cache with the ids the remote
//!    store says are flagged for offline use. Read-only. Entries the remote no
//!    longer flags are reported, never deleted.
//! 2. **Drain**: replays queued uploads one at a time, oldest first. Each
//!    replay is a two-phase write (upload the blob, then insert its metadata)
//!    and an entry leaves the queue only once both phases succeed. The first
//!    failure stops the drain for this run so later uploads never become
//!    visible before earlier ones.
//!
//! A remote failure in one pass doesn't affect the other. A local storage
//! failure aborts the whole run.

mod audit;
mod drain;

pub(crate) use self::drain::Upload;

use crate::cache::OfflineCache;
use crate::error::{ErrorKind, Result};
use crate::queue::UploadQueue;
use cumulus_remote::RemoteHandle;
use cumulus_remote::error::Result as RemoteResult;
use exn::ResultExt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;

/// Applied to every remote call when none is configured.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of the cache audit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// Files in the offline cache.
    pub local: u64,
    /// Cached files the remote still flags for offline use.
    pub confirmed: u64,
    /// Cached files the remote no longer flags. Left in place.
    pub local_only: Vec<String>,
}

/// Outcome of the queue drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Uploads replayed and removed from the queue.
    pub succeeded: u64,
    /// Uploads from this run's snapshot still in the queue.
    pub remaining: u64,
    /// Uploads whose replay failed. At most one, since a failure stops the
    /// drain.
    pub failed: u64,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// `None` if the remote flag query failed.
    pub audit: Option<AuditReport>,
    pub drain: DrainReport,
}

/// Brings local state back in line with the remote store.
///
/// The only component that talks to both the local store and the remote
/// store.
pub struct SyncEngine {
    cache: OfflineCache,
    queue: UploadQueue,
    remote: RemoteHandle,
    identity: String,
    timeout: Duration,
    running: Mutex<()>,
}
impl SyncEngine {
    /// `identity` owns every file the drain uploads.
    pub fn new(cache: OfflineCache, queue: UploadQueue, remote: RemoteHandle, identity: impl Into<String>) -> Self {
        Self {
            cache,
            queue,
            remote,
            identity: identity.into(),
            timeout: DEFAULT_REMOTE_TIMEOUT,
            running: Mutex::new(()),
        }
    }

    /// Per-call limit for remote operations. A call that runs over counts as
    /// a failure of that call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one reconciliation.
    ///
    /// Returns `Ok(None)` without doing anything if another run is already in
    /// progress. Remote failures are logged and show up as counts in the
    /// [`Summary`]; only local storage failures are returned as errors.
    #[tracing::instrument(skip(self), fields(remote = self.remote.name()))]
    pub async fn reconcile(&self) -> Result<Option<Summary>> {
        let Ok(_running) = self.running.try_lock() else {
            tracing::info!("reconciliation already running; coalescing");
            return Ok(None);
        };
        // Both local reads happen before any remote call: if the store is
        // gone, nothing has been sent.
        let cached_ids = self.cache.ids().await?;
        let snapshot = self.queue.list_queued().await?;
        tracing::info!(cached = cached_ids.len(), queued = snapshot.len(), "reconciliation started");

        let audit = self.audit(cached_ids).await;
        let drain = self.drain(snapshot).await?;
        tracing::info!(
            confirmed = audit.as_ref().map(|a| a.confirmed),
            succeeded = drain.succeeded,
            remaining = drain.remaining,
            "reconciliation finished"
        );
        Ok(Some(Summary { audit, drain }))
    }

    /// Whether a run is in progress right now.
    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    async fn bounded<T>(&self, call: impl Future<Output = RemoteResult<T>>, kind: ErrorKind) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.or_raise(|| kind),
            Err(elapsed) => Err(elapsed).or_raise(|| kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::NewUpload;
    use cumulus_remote::backend::MockRemote;
    use cumulus_store::Database;
    use std::sync::Arc;

    async fn engine(remote: Arc<MockRemote>) -> (SyncEngine, UploadQueue) {
        let db = Database::connect_in_memory().await.unwrap();
        let queue = UploadQueue::from(&db);
        let engine = SyncEngine::new(OfflineCache::from(&db), queue.clone(), remote, "user-1");
        (engine, queue)
    }

    #[tokio::test]
    async fn test_empty_run() {
        let (engine, _) = engine(Arc::new(MockRemote::default())).await;
        let summary = engine.reconcile().await.unwrap().unwrap();
        assert_eq!(summary.drain, DrainReport::default());
        assert_eq!(summary.audit, Some(AuditReport::default()));
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_timeout_is_a_step_failure() {
        let remote = Arc::new(MockRemote::default());
        remote.delay_upload_for("slow.txt", Duration::from_secs(60)).await;
        let (engine, queue) = engine(remote.clone()).await;
        let engine = engine.with_timeout(Duration::from_millis(50));
        queue.enqueue(NewUpload::new("slow.txt", "text/plain", b"s".to_vec())).await.unwrap();

        let summary = engine.reconcile().await.unwrap().unwrap();
        assert_eq!(summary.drain, DrainReport { succeeded: 0, remaining: 1, failed: 1 });
        assert_eq!(queue.count().await.unwrap(), 1);
        assert!(remote.files().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_aborts_before_remote_calls() {
        let remote = Arc::new(MockRemote::default());
        let db = Database::connect_in_memory().await.unwrap();
        let engine = SyncEngine::new(OfflineCache::from(&db), UploadQueue::from(&db), remote.clone(), "user-1");
        db.close().await;
        let err = engine.reconcile().await.unwrap_err();
        assert_eq!(*err, ErrorKind::StorageUnavailable);
        assert!(remote.calls().await.is_empty());
    }
}
