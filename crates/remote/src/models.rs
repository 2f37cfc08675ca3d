//! Remote file records.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata for a blob that has just been uploaded, ready to be recorded as
/// a file in the remote registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileRecord {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    /// `None` means the storage root.
    pub folder_id: Option<String>,
    /// Identity the file belongs to.
    pub owner: String,
    /// Where the blob was uploaded, relative to the store root.
    pub storage_path: PathBuf,
}

/// A file as recorded by the remote registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    pub owner: String,
    pub storage_path: PathBuf,
    /// User-controlled flag marking the file as wanted for offline reading.
    #[serde(default)]
    pub offline_enabled: bool,
    /// Unix seconds.
    pub created_at: i64,
}
impl FileRecord {
    pub fn new(id: impl Into<String>, record: NewFileRecord, created_at: i64) -> Self {
        Self {
            id: id.into(),
            name: record.name,
            size_bytes: record.size_bytes,
            mime_type: record.mime_type,
            folder_id: record.folder_id,
            owner: record.owner,
            storage_path: record.storage_path,
            offline_enabled: false,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_row_shape() {
        let record = FileRecord::new(
            "f-1",
            NewFileRecord {
                name: "report.pdf".to_string(),
                size_bytes: 2048,
                mime_type: "application/pdf".to_string(),
                folder_id: None,
                owner: "user-1".to_string(),
                storage_path: PathBuf::from("user-1/1700000000000-abc-report.pdf"),
            },
            1_700_000_000,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("folder_id").is_none());
        assert_eq!(json["offline_enabled"], false);
        let parsed: FileRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }
}
