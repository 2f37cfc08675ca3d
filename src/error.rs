//! CLI Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not open the local store")]
    Store,
    #[display("remote store error")]
    Remote,
    #[display("offline operation failed")]
    Offline,
    #[display("could not read or write {}", _0.display())]
    File(#[error(not(source))] PathBuf),
    #[display("no offline copy of {_0}")]
    NotCached(#[error(not(source))] String),
}
