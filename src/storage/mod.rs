//! Capability-typed storage backend abstraction
//!
//! A backend advertises the operation groups it supports through
//! [`StorageBackend::as_reader`], [`StorageBackend::as_writer`] and
//! [`StorageBackend::as_atomic`]. Callers branch on the presence of a
//! capability, never on which backend they are talking to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::WebDAVConfig;
use crate::errors::{StorageError, StorageResult};
use crate::models::{
    BatchResult, DirectoryListing, Existence, OperationResult, ResourceEntry, ResourceStat,
    TransferItem,
};
use crate::services::webdav::{ByteStream, UploadPayload};

pub mod webdav;

pub use webdav::WebDAVStorageBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Reader,
    Writer,
    AtomicRenameCopy,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Reader,
        Capability::Writer,
        Capability::AtomicRenameCopy,
    ];

    fn bit(self) -> u8 {
        match self {
            Capability::Reader => 0b001,
            Capability::Writer => 0b010,
            Capability::AtomicRenameCopy => 0b100,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Reader => write!(f, "reader"),
            Capability::Writer => write!(f, "writer"),
            Capability::AtomicRenameCopy => write!(f, "atomic_rename_copy"),
        }
    }
}

/// Closed set of [`Capability`] tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.0 |= capability.bit();
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

/// Identity and capability discovery shared by every storage backend
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get a human-readable identifier for this storage backend type
    fn storage_type(&self) -> &'static str;

    fn as_reader(&self) -> Option<&dyn StorageReader> {
        None
    }

    fn as_writer(&self) -> Option<&dyn StorageWriter> {
        None
    }

    fn as_atomic(&self) -> Option<&dyn AtomicRenameCopy> {
        None
    }

    /// Derived from the accessors so the two can never disagree
    fn capabilities(&self) -> CapabilitySet {
        let mut set = CapabilitySet::empty();
        if self.as_reader().is_some() {
            set = set.with(Capability::Reader);
        }
        if self.as_writer().is_some() {
            set = set.with(Capability::Writer);
        }
        if self.as_atomic().is_some() {
            set = set.with(Capability::AtomicRenameCopy);
        }
        set
    }

    fn require(&self, capability: Capability) -> StorageResult<()> {
        if self.capabilities().contains(capability) {
            Ok(())
        } else {
            Err(StorageError::unsupported(format!(
                "{} capability on {} storage",
                capability,
                self.storage_type()
            )))
        }
    }

    async fn presigned_url(&self, _path: &str, _expires_in: Duration) -> StorageResult<String> {
        Err(StorageError::unsupported(format!(
            "presigned_url on {} storage",
            self.storage_type()
        )))
    }

    async fn abort_multipart_upload(&self, _path: &str, _upload_id: &str) -> StorageResult<()> {
        Err(StorageError::unsupported(format!(
            "abort_multipart_upload on {} storage",
            self.storage_type()
        )))
    }
}

#[async_trait]
pub trait StorageReader: Send + Sync {
    async fn list(&self, path: &str) -> StorageResult<DirectoryListing>;

    async fn get(&self, path: &str) -> StorageResult<ByteStream>;

    async fn get_info(&self, path: &str) -> StorageResult<ResourceEntry>;

    async fn stat(&self, path: &str) -> StorageResult<ResourceStat>;

    /// `false` for anything but a confirmed hit, including transport failures
    async fn exists(&self, path: &str) -> bool;

    async fn check_existence(&self, path: &str) -> Existence;
}

#[async_trait]
pub trait StorageWriter: Send + Sync {
    async fn put(&self, path: &str, data: UploadPayload) -> StorageResult<OperationResult>;

    async fn mkdir(&self, path: &str) -> StorageResult<OperationResult>;

    async fn delete(&self, path: &str) -> StorageResult<OperationResult>;

    async fn batch_delete(&self, paths: &[String]) -> BatchResult;
}

#[async_trait]
pub trait AtomicRenameCopy: Send + Sync {
    async fn rename(&self, source: &str, destination: &str) -> StorageResult<OperationResult>;

    async fn copy(&self, source: &str, destination: &str) -> StorageResult<OperationResult>;

    async fn batch_copy(&self, items: &[TransferItem]) -> BatchResult;

    async fn batch_move(&self, items: &[TransferItem]) -> BatchResult;
}

/// Create a WebDAV storage backend from configuration
pub fn create_storage_backend(config: &WebDAVConfig) -> StorageResult<Arc<dyn StorageBackend>> {
    config
        .validate()
        .map_err(|e| StorageError::internal(format!("Invalid WebDAV configuration: {}", e)))?;
    Ok(Arc::new(WebDAVStorageBackend::from_config(config)?))
}
