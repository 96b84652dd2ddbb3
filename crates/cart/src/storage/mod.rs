//! Device storage for the persisted cart.
//!
//! The store needs exactly two things from storage: read a string by key and
//! replace the string under a key. [`CartStorage`] is that capability.
//!
//! ## Backends
//!
//! - [`FileStorage`] - one file per key in a data directory
//! - [`MemoryStorage`] - in-process map, with switches to fail or hold writes

mod file;
mod memory;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Errors from a storage backend.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// The backend refused the write.
    #[error("Write rejected: {0}")]
    Rejected(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

/// Key-value string storage addressed by a single well-known key.
///
/// `set` replaces the whole value; there are no partial or merge writes.
pub trait CartStorage: Send + Sync + 'static {
    /// Read the value under `key`, `None` if nothing was ever written.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}
