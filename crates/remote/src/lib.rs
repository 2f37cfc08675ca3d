pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::RemoteStore;
pub use crate::models::{FileRecord, NewFileRecord};
pub use crate::path::{derive as derive_storage_path, validate as validate_path};
use std::sync::Arc;

pub type RemoteHandle = Arc<dyn RemoteStore + Send + Sync>;
