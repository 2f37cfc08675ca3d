use crate::error::{Error, ErrorKind};
use crate::models::{from_millis, verify_payload};
use crate::record::CachedFile;
use exn::ResultExt;

#[derive(sqlx::FromRow)]
pub(crate) struct CacheRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) mime_type: String,
    pub(crate) size_bytes: i64,
    pub(crate) payload: Vec<u8>,
    pub(crate) payload_hash: String,
    pub(crate) cached_at: i64,
}
impl TryFrom<CacheRow> for CachedFile {
    type Error = Error;
    fn try_from(row: CacheRow) -> Result<Self, Self::Error> {
        verify_payload(&row.payload, &row.payload_hash)?;
        Ok(Self {
            id: row.id,
            name: row.name,
            mime_type: row.mime_type,
            size_bytes: u64::try_from(row.size_bytes).or_raise(|| ErrorKind::Corrupt("size"))?,
            payload: row.payload,
            cached_at: from_millis(row.cached_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{payload_hash, to_millis, to_stored_size};
    use time::UtcDateTime;

    fn holiday_photo() -> CachedFile {
        CachedFile {
            id: "f-100".to_string(),
            name: "lisbon.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            size_bytes: 4,
            payload: vec![0xff, 0xd8, 0xff, 0xe0],
            cached_at: UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        }
    }

    /// The row `CacheRepository::put` writes for `file`.
    fn stored(file: &CachedFile) -> CacheRow {
        CacheRow {
            id: file.id.clone(),
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: to_stored_size(file.size_bytes).unwrap(),
            payload: file.payload.clone(),
            payload_hash: payload_hash(&file.payload),
            cached_at: to_millis(file.cached_at).unwrap(),
        }
    }

    #[test]
    fn test_row_to_model() {
        let row = stored(&holiday_photo());
        assert_eq!(CachedFile::try_from(row).unwrap(), holiday_photo());
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let mut row = stored(&holiday_photo());
        row.payload[0] = 0x00;
        let err = CachedFile::try_from(row).unwrap_err();
        assert_eq!(*err, ErrorKind::Corrupt("payload"));
    }

    #[test]
    fn test_negative_size_is_rejected() {
        let mut row = stored(&holiday_photo());
        row.size_bytes = -1;
        assert!(CachedFile::try_from(row).is_err());
    }
}
