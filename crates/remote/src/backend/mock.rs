//! In-memory remote store for testing.

use crate::error::{ErrorKind, Result};
use crate::models::{FileRecord, NewFileRecord};
use crate::{RemoteStore, validate_path};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::UtcDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One call made against a [`MockRemote`], in the order it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    UploadBlob(PathBuf),
    InsertFileMetadata { name: String, storage_path: PathBuf },
    QueryOfflineFlaggedIds,
}

#[derive(Default)]
struct State {
    calls: Vec<RemoteCall>,
    blobs: HashMap<PathBuf, Vec<u8>>,
    files: Vec<FileRecord>,
    flagged: HashSet<String>,
    fail_query: bool,
    fail_upload: HashSet<String>,
    fail_metadata: HashSet<String>,
    delay_upload: HashMap<String, Duration>,
    delay_metadata: HashMap<String, Duration>,
}

/// In-memory remote store for testing.
///
/// Every call is recorded, and failures or delays can be injected per file
/// name. Upload injection is matched against the end of the storage path, so
/// it only works for names that survive slugging unchanged (`a.txt`, not
/// `My File.TXT`).
///
/// # Examples
///
/// ```
/// use cumulus_remote::backend::{MockRemote, RemoteCall};
/// use cumulus_remote::RemoteStore;
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let remote = MockRemote::default().with_flagged(["f-1"]);
/// remote.fail_upload_for("broken.txt").await;
///
/// assert!(remote.upload_blob(Path::new("u/1-x-broken.txt"), b"..").await.is_err());
/// assert!(remote.query_offline_flagged_ids().await.unwrap().contains("f-1"));
/// assert_eq!(remote.calls().await.len(), 2);
/// # }
/// ```
pub struct MockRemote {
    name: String,
    state: RwLock<State>,
}
impl Default for MockRemote {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            state: RwLock::new(State::default()),
        }
    }
}
impl MockRemote {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Pre-populate the set of ids flagged as wanted offline.
    pub fn with_flagged(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.state.get_mut().flagged = ids.into_iter().map(Into::into).collect();
        self
    }

    pub async fn set_flagged(&self, ids: impl IntoIterator<Item = impl Into<String>>) {
        self.state.write().await.flagged = ids.into_iter().map(Into::into).collect();
    }

    pub async fn fail_query(&self, fail: bool) {
        self.state.write().await.fail_query = fail;
    }

    pub async fn fail_upload_for(&self, name: impl Into<String>) {
        self.state.write().await.fail_upload.insert(name.into());
    }

    pub async fn fail_metadata_for(&self, name: impl Into<String>) {
        self.state.write().await.fail_metadata.insert(name.into());
    }

    pub async fn delay_upload_for(&self, name: impl Into<String>, delay: Duration) {
        self.state.write().await.delay_upload.insert(name.into(), delay);
    }

    pub async fn delay_metadata_for(&self, name: impl Into<String>, delay: Duration) {
        self.state.write().await.delay_metadata.insert(name.into(), delay);
    }

    /// Remove every injected failure and delay.
    pub async fn heal(&self) {
        let mut state = self.state.write().await;
        state.fail_query = false;
        state.fail_upload.clear();
        state.fail_metadata.clear();
        state.delay_upload.clear();
        state.delay_metadata.clear();
    }

    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.state.read().await.calls.clone()
    }

    /// Files whose metadata was successfully inserted, in insertion order.
    pub async fn files(&self) -> Vec<FileRecord> {
        self.state.read().await.files.clone()
    }

    pub async fn blob(&self, path: &Path) -> Option<Vec<u8>> {
        self.state.read().await.blobs.get(path).cloned()
    }

    pub async fn blob_count(&self) -> usize {
        self.state.read().await.blobs.len()
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload_blob(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        let shown = path.to_string_lossy().to_string();
        let (delay, fail) = {
            let mut state = self.state.write().await;
            state.calls.push(RemoteCall::UploadBlob(path.clone()));
            (
                state.delay_upload.iter().find(|(name, _)| shown.ends_with(name.as_str())).map(|(_, d)| *d),
                state.fail_upload.iter().any(|name| shown.ends_with(name.as_str())),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            exn::bail!(ErrorKind::Rejected(format!("injected upload failure for {shown}")));
        }
        self.state.write().await.blobs.insert(path, bytes.to_vec());
        Ok(())
    }

    async fn insert_file_metadata(&self, record: &NewFileRecord) -> Result<()> {
        let (delay, fail) = {
            let mut state = self.state.write().await;
            state.calls.push(RemoteCall::InsertFileMetadata {
                name: record.name.clone(),
                storage_path: record.storage_path.clone(),
            });
            (state.delay_metadata.get(&record.name).copied(), state.fail_metadata.contains(&record.name))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            exn::bail!(ErrorKind::Rejected(format!("injected metadata failure for {}", record.name)));
        }
        let file = FileRecord::new(Uuid::now_v7().to_string(), record.clone(), UtcDateTime::now().unix_timestamp());
        self.state.write().await.files.push(file);
        Ok(())
    }

    async fn query_offline_flagged_ids(&self) -> Result<HashSet<String>> {
        let mut state = self.state.write().await;
        state.calls.push(RemoteCall::QueryOfflineFlaggedIds);
        if state.fail_query {
            exn::bail!(ErrorKind::Rejected("injected query failure".to_string()));
        }
        Ok(state.flagged.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> NewFileRecord {
        NewFileRecord {
            name: name.to_string(),
            size_bytes: 1,
            mime_type: "text/plain".to_string(),
            folder_id: None,
            owner: "u".to_string(),
            storage_path: PathBuf::from(format!("u/1-x-{name}")),
        }
    }

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let remote = MockRemote::default();
        remote.upload_blob(Path::new("u/1-x-a.txt"), b"a").await.unwrap();
        remote.insert_file_metadata(&record("a.txt")).await.unwrap();
        remote.query_offline_flagged_ids().await.unwrap();
        assert_eq!(
            remote.calls().await,
            vec![
                RemoteCall::UploadBlob(PathBuf::from("u/1-x-a.txt")),
                RemoteCall::InsertFileMetadata {
                    name: "a.txt".to_string(),
                    storage_path: PathBuf::from("u/1-x-a.txt"),
                },
                RemoteCall::QueryOfflineFlaggedIds,
            ]
        );
        assert_eq!(remote.files().await.len(), 1);
        assert_eq!(remote.blob(Path::new("u/1-x-a.txt")).await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_injected_failures_and_heal() {
        let remote = MockRemote::default();
        remote.fail_upload_for("a.txt").await;
        remote.fail_metadata_for("b.txt").await;
        remote.fail_query(true).await;
        assert!(remote.upload_blob(Path::new("u/1-x-a.txt"), b"a").await.is_err());
        assert!(remote.insert_file_metadata(&record("b.txt")).await.is_err());
        assert!(remote.query_offline_flagged_ids().await.is_err());
        assert_eq!(remote.blob_count().await, 0);
        assert!(remote.files().await.is_empty());

        remote.heal().await;
        assert!(remote.upload_blob(Path::new("u/1-x-a.txt"), b"a").await.is_ok());
        assert!(remote.insert_file_metadata(&record("b.txt")).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_delay() {
        let remote = MockRemote::default();
        remote.delay_upload_for("slow.txt", Duration::from_secs(30)).await;
        let started = tokio::time::Instant::now();
        remote.upload_blob(Path::new("u/1-x-slow.txt"), b"s").await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_flagged_ids() {
        let remote = MockRemote::default().with_flagged(["f-1", "f-2"]);
        assert_eq!(remote.query_offline_flagged_ids().await.unwrap().len(), 2);
        remote.set_flagged(["f-3"]).await;
        assert_eq!(remote.query_offline_flagged_ids().await.unwrap(), HashSet::from(["f-3".to_string()]));
    }
}
