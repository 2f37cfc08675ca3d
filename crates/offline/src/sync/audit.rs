use super::{AuditReport, SyncEngine};
use crate::error::ErrorKind;

impl SyncEngine {
    /// Cross-check cached ids against the remote's offline flags.
    ///
    /// Never touches the cache. A cached file the remote no longer flags may
    /// still be wanted for reading, so it is reported and kept.
    pub(super) async fn audit(&self, cached_ids: Vec<String>) -> Option<AuditReport> {
        let flagged = match self.bounded(self.remote.query_offline_flagged_ids(), ErrorKind::RemoteQueryFailed).await {
            Ok(flagged) => flagged,
            Err(error) => {
                tracing::warn!(?error, "skipping cache audit");
                return None;
            },
        };
        let local = cached_ids.len() as u64;
        let (confirmed, local_only): (Vec<_>, Vec<_>) = cached_ids.into_iter().partition(|id| flagged.contains(id));
        if !local_only.is_empty() {
            tracing::info!(count = local_only.len(), "cached files no longer flagged offline; keeping them");
        }
        tracing::info!(confirmed = confirmed.len(), "offline files confirmed in sync");
        Some(AuditReport {
            local,
            confirmed: confirmed.len() as u64,
            local_only,
        })
    }
}
