//! Local filesystem remote.
//!
//! Stands in for a networked store when running the CLI against a directory
//! (a mounted share, a sync folder, a scratch dir). Blobs live under
//! `<root>/blobs/` and file records in a JSON index at `<root>/files.json`.

use crate::error::{ErrorKind, Result};
use crate::models::{FileRecord, NewFileRecord};
use crate::{RemoteStore, validate_path};
use async_trait::async_trait;
use exn::ResultExt;
use std::collections::HashSet;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

const BLOB_DIR: &str = "blobs";
const INDEX_FILE: &str = "files.json";
const INDEX_TEMP: &str = "files.json.tmp";

/// Filesystem-backed remote store.
///
/// # Examples
///
/// ```no_run
/// use cumulus_remote::backend::LocalRemote;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let remote = LocalRemote::new("share", "/mnt/share/cumulus")?;
/// # Ok(())
/// # }
/// ```
pub struct LocalRemote {
    name: String,
    root: PathBuf,
    /// Serialises read-modify-write cycles on the index file.
    index: Mutex<()>,
}
impl LocalRemote {
    /// Create a remote rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists and is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Only happens once at startup; not worth an async constructor.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self {
            name: name.into(),
            root,
            index: Mutex::new(()),
        })
    }

    fn blob_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(BLOB_DIR).join(validated))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.display().to_string()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Callers must hold the index lock.
    async fn load_index(&self) -> Result<Vec<FileRecord>> {
        let bytes = match fs::read(self.root.join(INDEX_FILE)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => exn::bail!(ErrorKind::Io(e)),
        };
        serde_json::from_slice(&bytes).or_raise(|| ErrorKind::Index)
    }

    /// Callers must hold the index lock. Readers never see a partial index.
    async fn store_index(&self, records: &[FileRecord]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(records).or_raise(|| ErrorKind::Index)?;
        let temp = self.root.join(INDEX_TEMP);
        fs::write(&temp, bytes).await.map_err(ErrorKind::Io)?;
        fs::rename(&temp, self.root.join(INDEX_FILE)).await.map_err(ErrorKind::Io)?;
        Ok(())
    }

    /// Every recorded file, oldest first.
    pub async fn list_files(&self) -> Result<Vec<FileRecord>> {
        let _guard = self.index.lock().await;
        self.load_index().await
    }

    /// Mark a file as wanted (or no longer wanted) offline.
    pub async fn set_offline_flag(&self, id: &str, enabled: bool) -> Result<()> {
        let _guard = self.index.lock().await;
        let mut records = self.load_index().await?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(id.to_string())))?;
        record.offline_enabled = enabled;
        self.store_index(&records).await
    }

    pub async fn read_blob(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.blob_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }
}

#[async_trait]
impl RemoteStore for LocalRemote {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, bytes), fields(remote = %self.name, size = bytes.len()))]
    async fn upload_blob(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let abs_path = self.blob_path(path)?;
        if fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)? {
            exn::bail!(ErrorKind::Rejected(format!("blob already exists at {}", path.display())));
        }
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        Ok(fs::write(&abs_path, bytes).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    #[tracing::instrument(skip(self, record), fields(remote = %self.name, name = %record.name))]
    async fn insert_file_metadata(&self, record: &NewFileRecord) -> Result<()> {
        let _guard = self.index.lock().await;
        let mut records = self.load_index().await?;
        let id = Uuid::now_v7().to_string();
        tracing::debug!(%id, path = %record.storage_path.display(), "recording file");
        records.push(FileRecord::new(id, record.clone(), UtcDateTime::now().unix_timestamp()));
        self.store_index(&records).await
    }

    async fn query_offline_flagged_ids(&self) -> Result<HashSet<String>> {
        let _guard = self.index.lock().await;
        let records = self.load_index().await?;
        Ok(records.into_iter().filter(|r| r.offline_enabled).map(|r| r.id).collect())
    }
}
