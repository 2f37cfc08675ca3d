mod cached;
mod queued;

pub(crate) use self::cached::CacheRow;
pub(crate) use self::queued::QueueRow;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use time::UtcDateTime;

const NANOS_PER_MILLI: i128 = 1_000_000;

/// Timestamps are stored as Unix milliseconds; seconds are too coarse to
/// order a burst of uploads queued by the same user.
pub(crate) fn to_millis(at: UtcDateTime) -> Result<i64> {
    i64::try_from(at.unix_timestamp_nanos() / NANOS_PER_MILLI).or_raise(|| ErrorKind::Corrupt("timestamp"))
}

pub(crate) fn from_millis(millis: i64) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp_nanos(i128::from(millis) * NANOS_PER_MILLI)
        .or_raise(|| ErrorKind::Corrupt("timestamp"))
}

pub(crate) fn to_stored_size(size: u64) -> Result<i64> {
    i64::try_from(size).or_raise(|| ErrorKind::Corrupt("size"))
}

pub(crate) fn payload_hash(payload: &[u8]) -> String {
    blake3::hash(payload).to_string()
}

/// Refuse to hand back bytes that differ from what was written.
pub(crate) fn verify_payload(payload: &[u8], expected: &str) -> Result<()> {
    if payload_hash(payload) != expected {
        exn::bail!(ErrorKind::Corrupt("payload"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(1_700_000_000_123)]
    #[case(-86_400_000)]
    fn test_millis_survive_storage(#[case] millis: i64) {
        assert_eq!(to_millis(from_millis(millis).unwrap()).unwrap(), millis);
    }

    #[test]
    fn test_sub_millisecond_precision_is_dropped() {
        let at = UtcDateTime::from_unix_timestamp_nanos(1_700_000_000_123_456_789).unwrap();
        assert_eq!(to_millis(at).unwrap(), 1_700_000_000_123);
    }

    #[test]
    fn test_verify_payload() {
        let hash = payload_hash(b"quarterly report");
        assert!(verify_payload(b"quarterly report", &hash).is_ok());
        let err = verify_payload(b"quarterly rep0rt", &hash).unwrap_err();
        assert_eq!(*err, ErrorKind::Corrupt("payload"));
    }
}
