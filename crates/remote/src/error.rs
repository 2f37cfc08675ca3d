//! Remote Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A remote store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for remote store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Path contains invalid characters or escapes root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Blob or file record does not exist
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// The metadata index could not be read or written
    #[display("metadata index error")]
    Index,
    /// The remote store refused the request
    #[display("rejected by remote: {_0}")]
    Rejected(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Index | Self::Rejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::InvalidPath(PathBuf::from("../x")).to_string(), "invalid path: ../x");
        assert_eq!(ErrorKind::Rejected("quota exceeded".to_string()).to_string(), "rejected by remote: quota exceeded");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::InvalidPath(PathBuf::from("..")).is_retryable());
        assert!(!ErrorKind::NotFound("f-1".to_string()).is_retryable());
        assert!(ErrorKind::Rejected("busy".to_string()).is_retryable());
    }
}
