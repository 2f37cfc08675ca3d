//! Remote store trait and implementations.
//!
//! This module defines the `RemoteStore` trait: the narrow slice of the
//! networked file registry that offline reconciliation depends on. Anything
//! that can store a blob, record a file, and report which files the user
//! flagged for offline use can sit behind it.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalRemote;
#[cfg(feature = "mock")]
pub use self::mock::{MockRemote, RemoteCall};
use crate::error::Result;
use crate::models::NewFileRecord;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;

/// Interface to the remote file store.
///
/// Uploading a file is a two-phase write: [`upload_blob`](Self::upload_blob)
/// stores the bytes, then [`insert_file_metadata`](Self::insert_file_metadata)
/// makes them visible as a file. The contract offers no way to delete a blob,
/// so a blob whose metadata insert failed stays behind as an orphan.
///
/// # Examples
///
/// ```
/// use cumulus_remote::{NewFileRecord, RemoteStore, derive_storage_path, error::Result};
/// use time::UtcDateTime;
///
/// async fn upload(remote: &dyn RemoteStore, owner: &str, name: &str, bytes: &[u8]) -> Result<()> {
///     let path = derive_storage_path(owner, name, UtcDateTime::now())?;
///     remote.upload_blob(&path, bytes).await?;
///     remote
///         .insert_file_metadata(&NewFileRecord {
///             name: name.to_string(),
///             size_bytes: bytes.len() as u64,
///             mime_type: "application/octet-stream".to_string(),
///             folder_id: None,
///             owner: owner.to_string(),
///             storage_path: path,
///         })
///         .await
/// }
/// ```
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Name of the configured remote, used for logging only.
    fn name(&self) -> &str;

    /// Store `bytes` at `path`, relative to the store root.
    ///
    /// Paths are expected to come from
    /// [`derive_storage_path`](crate::derive_storage_path) and are never
    /// reused, so implementations may refuse to overwrite.
    async fn upload_blob(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Record a previously uploaded blob as a file.
    async fn insert_file_metadata(&self, record: &NewFileRecord) -> Result<()>;

    /// Ids of every file the user has flagged as wanted offline.
    async fn query_offline_flagged_ids(&self) -> Result<HashSet<String>>;
}
