//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Every variant means the same thing to a caller: the local store can't be
//! trusted for this operation. Nothing here should ever be treated as "no
//! records".

use derive_more::{Display, Error};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The database could not be opened, queried or written to.
    #[display("storage unavailable")]
    Unavailable,
    #[display("database migration error")]
    Migration,
    /// A stored record could not be decoded, or its payload no longer matches
    /// the hash recorded when it was written.
    #[display("corrupt record: {_0}")]
    Corrupt(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Unavailable.to_string(), "storage unavailable");
        assert_eq!(ErrorKind::Corrupt("payload").to_string(), "corrupt record: payload");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Unavailable.is_retryable());
        assert!(!ErrorKind::Migration.is_retryable());
        assert!(!ErrorKind::Corrupt("size").is_retryable());
    }

    #[test]
    fn error_from_result() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only filesystem"));
        let err: Result<()> = result.or_raise(|| ErrorKind::Unavailable);
        assert_eq!(*err.unwrap_err(), ErrorKind::Unavailable);
    }
}
