//! One repository per collection.
//!
//! Both collections are keyed by a string id and support the same five
//! operations: `put` (insert or overwrite), `get`, `get_all`, `delete` and
//! `clear`. They differ only in ordering: the queue hands records back in
//! arrival order, the cache makes no promise.

mod cache;
mod queue;

pub use self::cache::CacheRepository;
pub use self::queue::QueueRepository;
use crate::error::{ErrorKind, Result};
use crate::record::Totals;
use exn::ResultExt;
use sqlx::SqlitePool;

fn totals(row: (i64, i64)) -> Result<Totals> {
    Ok(Totals {
        count: u64::try_from(row.0).or_raise(|| ErrorKind::Corrupt("count"))?,
        bytes: u64::try_from(row.1).or_raise(|| ErrorKind::Corrupt("size"))?,
    })
}

/// Hand pages freed by a delete back to the filesystem.
///
/// The rows are already gone when this runs, so a failure here is logged and
/// the file is left at its old size until the next removal.
async fn reclaim(pool: &SqlitePool) {
    if let Err(error) = sqlx::query("PRAGMA incremental_vacuum").execute(pool).await {
        tracing::warn!(?error, "could not reclaim free pages");
    }
}
