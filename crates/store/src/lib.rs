//! Durable local store for offline operation.
//!
//! A single SQLite database holding two independent collections:
//! - **cache**: [`CachedFile`]s, local mirrors of remote files kept for
//!   reading while disconnected. Keyed by the remote file id.
//! - **queue**: [`QueuedWrite`]s, uploads attempted while disconnected and
//!   waiting to be replayed. Keyed by a locally generated id, returned in
//!   arrival order.
//!
//! A `put` that returns `Ok` has been synced to disk. If the database can't
//! be opened or read, or a record fails its integrity check, operations fail
//! with an [`ErrorKind`](error::ErrorKind) instead of returning nothing.

mod db;
pub mod error;
mod models;
mod record;
mod repo;

pub use crate::db::Database;
pub use crate::record::{CachedFile, QueuedWrite, Totals};
pub use crate::repo::{CacheRepository, QueueRepository};
