use crate::error::{Error, ErrorKind};
use crate::models::{from_millis, verify_payload};
use crate::record::QueuedWrite;
use exn::ResultExt;

#[derive(sqlx::FromRow)]
pub(crate) struct QueueRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) mime_type: String,
    pub(crate) size_bytes: i64,
    pub(crate) payload: Vec<u8>,
    pub(crate) payload_hash: String,
    #[sqlx(default)]
    pub(crate) target_folder_id: Option<String>,
    pub(crate) queued_at: i64,
}
impl TryFrom<QueueRow> for QueuedWrite {
    type Error = Error;
    fn try_from(row: QueueRow) -> Result<Self, Self::Error> {
        verify_payload(&row.payload, &row.payload_hash)?;
        Ok(Self {
            id: row.id,
            name: row.name,
            mime_type: row.mime_type,
            size_bytes: u64::try_from(row.size_bytes).or_raise(|| ErrorKind::Corrupt("size"))?,
            payload: row.payload,
            target_folder_id: row.target_folder_id,
            queued_at: from_millis(row.queued_at)?,
        })
    }
}
