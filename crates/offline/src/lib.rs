//! Offline resilience for the cumulus client.
//!
//! Keeps the client useful while the remote store is unreachable:
//! - [`OfflineCache`] holds copies of remote files for reading.
//! - [`UploadQueue`] holds uploads attempted while disconnected.
//! - [`ConnectivityMonitor`] turns reachability signals into a single
//!   [`Reconnected`] event per offline to online edge.
//! - [`SyncEngine`] replays the queue and audits the cache when connectivity
//!   returns.
//!
//! [`Offline`] ties them together for the application layer.

mod cache;
mod connectivity;
pub mod error;
mod offline;
mod probe;
mod queue;
mod sync;

pub use crate::cache::OfflineCache;
pub use crate::connectivity::{
    ConnectivityMonitor, ConnectivityState, Reachability, ReachabilitySource, ReachabilityStream, Reconnected,
};
pub use crate::offline::{Offline, Stats, UploadOutcome};
pub use crate::probe::TcpProbe;
pub use crate::queue::{NewUpload, UploadQueue};
pub use crate::sync::{AuditReport, DEFAULT_REMOTE_TIMEOUT, DrainReport, Summary, SyncEngine};
