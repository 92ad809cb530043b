pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use config::{Credentials, WebDAVConfig};
pub use errors::{ErrorKind, StorageError, StorageResult};
pub use services::webdav::run_diagnostics;
pub use storage::{
    create_storage_backend, AtomicRenameCopy, Capability, CapabilitySet, StorageBackend,
    StorageReader, StorageWriter, WebDAVStorageBackend,
};
