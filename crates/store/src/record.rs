//! Records held by the two collections.
//!
//! Payload bytes are owned by the record and, once written, by the store.
//! Nothing else keeps a copy: if you need the bytes again, read the record
//! again.

use time::UtcDateTime;

/// A local mirror of a remote file, kept for reading while offline.
///
/// `id` is the remote file's primary key and the join key between local and
/// remote state. At most one entry exists per `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub payload: Vec<u8>,
    /// Display and diagnostics only. Never used for expiry.
    pub cached_at: UtcDateTime,
}

/// An upload that could not reach the remote store when it was attempted.
///
/// Entries are immutable once queued; they are removed only after the remote
/// store has both stored the payload and recorded its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedWrite {
    /// Locally generated; unrelated to any remote id.
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub payload: Vec<u8>,
    /// `None` means the storage root.
    pub target_folder_id: Option<String>,
    pub queued_at: UtcDateTime,
}

/// Number of records in a collection and the sum of their declared sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub count: u64,
    pub bytes: u64,
}
