//! Offline Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Failures from the local store and
//! the remote store are wrapped with `or_raise`, so the original cause stays
//! in the tree for logging while callers match on the kind.

use derive_more::{Display, Error};

/// An offline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for offline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Local Errors
/// - [`ErrorKind::StorageUnavailable`]
///
/// ### Remote Errors
/// - [`ErrorKind::RemoteUploadFailed`]
/// - [`ErrorKind::RemoteMetadataFailed`]
/// - [`ErrorKind::RemoteQueryFailed`]
/// - [`ErrorKind::NotConnected`]
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The local store could not be opened, read or written, or a record in
    /// it failed its integrity check. Never means "empty".
    #[display("local storage unavailable")]
    StorageUnavailable,
    /// Storing a payload in the remote store failed or timed out.
    #[display("remote upload failed")]
    RemoteUploadFailed,
    /// Recording file metadata in the remote store failed or timed out.
    #[display("remote metadata insert failed")]
    RemoteMetadataFailed,
    /// Asking the remote store which files are flagged offline failed or
    /// timed out.
    #[display("remote offline flag query failed")]
    RemoteQueryFailed,
    /// A remote-only operation was attempted while offline. Route the write
    /// to the upload queue instead.
    #[display("not connected")]
    NotConnected,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Remote failures are retried on the next reconnection, never in a
    /// tight loop.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteUploadFailed | Self::RemoteMetadataFailed | Self::RemoteQueryFailed)
    }
}
