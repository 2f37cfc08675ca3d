//! Storage path validation and derivation.
//!
//! Every blob uploaded to the remote store lives at a path relative to the
//! store root. Paths handed in from outside are validated so they can't
//! escape that root, and paths for new uploads are derived so that no two
//! uploads ever share one.

use rslug::slugify;
use std::path::{Component, Path, PathBuf};
use time::UtcDateTime;
use uuid::Uuid;

use crate::error::{ErrorKind, Result};

/// Used when slugging a file name leaves nothing behind (e.g. `"???.txt"`).
const FALLBACK_STEM: &str = "file";

/// Checks a storage path handed in from outside and returns it in canonical
/// form.
///
/// Storage paths are always relative to the store root and never need to
/// climb: every one this crate produces is `identity/leaf`. So `.` segments
/// and repeated separators are dropped, while `..`, a leading `/`, a Windows
/// prefix, a NUL byte or an empty result are rejected outright.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use cumulus_remote::validate_path;
/// assert_eq!(validate_path("user-1/.//report.pdf").unwrap(), Path::new("user-1/report.pdf"));
/// // Anything that could reach another user's files, or the index beside
/// // the blob directory, is refused even if it would resolve back inside.
/// assert!(validate_path("user-2/../user-1/report.pdf").is_err());
/// assert!(validate_path("../files.json").is_err());
/// assert!(validate_path("/user-1/report.pdf").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let segments: Option<Vec<_>> = path
        .components()
        .filter(|c| *c != Component::CurDir)
        .map(|c| match c {
            Component::Normal(segment) if !segment.as_encoded_bytes().contains(&0) => Some(segment),
            _ => None,
        })
        .collect();
    match segments {
        Some(segments) if !segments.is_empty() => Ok(segments.into_iter().collect()),
        _ => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
    }
}

/// Derives a fresh storage path for an upload owned by `identity`.
///
/// The layout is `{identity}/{unix millis}-{uuid v7}-{slug}.{ext}`. The UUID
/// makes every call unique even for the same file name in the same
/// millisecond, so an upload never lands on a path another writer (or an
/// earlier, half-finished attempt) already used.
///
/// ```
/// use cumulus_remote::derive_storage_path;
/// use time::UtcDateTime;
///
/// let at = UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap();
/// let path = derive_storage_path("user-42", "Q3 Report.PDF", at).unwrap();
/// let name = path.file_name().unwrap().to_str().unwrap();
/// assert!(path.starts_with("user-42"));
/// assert!(name.starts_with("1700000000000-"));
/// assert!(name.ends_with("-q3-report.pdf"));
/// ```
pub fn derive(identity: &str, file_name: &str, now: UtcDateTime) -> Result<PathBuf> {
    let owner = validate(identity)?;
    if owner.components().count() != 1 {
        exn::bail!(ErrorKind::InvalidPath(owner));
    }
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let token = Uuid::now_v7().simple();
    let leaf = format!("{millis}-{token}-{}", slugged_name(file_name));
    validate(owner.join(leaf))
}

fn slugged_name(file_name: &str) -> String {
    let path = Path::new(file_name);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase);
    // Without a usable extension, the whole name is the stem.
    let stem = match extension {
        Some(_) => path.file_stem().and_then(|s| s.to_str()).unwrap_or_default(),
        None => file_name,
    };
    let stem = match slugify!(stem) {
        s if s.is_empty() => FALLBACK_STEM.to_string(),
        s => s,
    };
    match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_valid_paths() {
        assert_eq!(validate(Path::new("user/file.pdf")).unwrap(), Path::new("user/file.pdf"));
        assert_eq!(validate(Path::new("simple.txt")).unwrap(), Path::new("simple.txt"));
    }

    #[test]
    fn test_path_normalization() {
        assert_eq!(validate(Path::new("a//b//c")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("a/./b/./c")).unwrap(), Path::new("a/b/c"));
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate(Path::new("../etc/passwd")).is_err());
        assert!(validate(Path::new("a/../../b")).is_err());
        assert!(validate(Path::new("..")).is_err());
        // Climbing is refused even when it would land back inside the root.
        assert!(validate(Path::new("a/b/..")).is_err());
        assert!(validate(Path::new("user-2/../user-1/a.txt")).is_err());
        assert!(validate(Path::new("/leading/slash")).is_err());
    }

    #[test]
    fn test_invalid_and_empty() {
        assert!(validate(Path::new("a\0b")).is_err());
        assert!(validate(Path::new("")).is_err());
        assert!(validate(Path::new("./.")).is_err());
        assert!(validate(Path::new("//")).is_err());
    }

    #[rstest]
    #[case("report.pdf", "report.pdf")]
    #[case("Q3 Report.PDF", "q3-report.pdf")]
    #[case("archive.tar.gz", "archive-tar.gz")]
    #[case("README", "readme")]
    #[case("???.txt", "file.txt")]
    #[case("notes.t xt", "notes-t-xt")]
    #[case(".hidden", "hidden")]
    fn test_slugged_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugged_name(input), expected);
    }

    #[test]
    fn test_derive_never_repeats() {
        let at = UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let first = derive("user-1", "report.pdf", at).unwrap();
        let second = derive("user-1", "report.pdf", at).unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("user-1"));
        assert_eq!(first.components().count(), 2);
    }

    #[rstest]
    #[case("")]
    #[case("..")]
    #[case("team/alice")]
    fn test_derive_rejects_bad_identity(#[case] identity: &str) {
        let at = UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert!(derive(identity, "report.pdf", at).is_err());
    }
}
