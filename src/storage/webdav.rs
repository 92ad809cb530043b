//! WebDAV storage backend: the driver facade over the operation modules

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::config::{Credentials, WebDAVConfig};
use crate::errors::StorageResult;
use crate::models::{
    BatchResult, DirectoryListing, Existence, OperationResult, ResourceEntry, ResourceStat,
    TransferItem,
};
use crate::services::webdav::{
    ByteStream, TransferOptions, UploadOptions, UploadPayload, WebDAVClient, WebDAVOperations,
};

use super::{AtomicRenameCopy, StorageBackend, StorageReader, StorageWriter};

/// Single-tenant driver instance. Reconfiguring means building a new one.
#[derive(Debug, Clone)]
pub struct WebDAVStorageBackend {
    operations: WebDAVOperations,
    transfer_options: TransferOptions,
}

impl WebDAVStorageBackend {
    pub fn new(credentials: Credentials, connect_timeout: Duration, timeout: Duration) -> StorageResult<Self> {
        info!(
            "Creating WebDAV storage backend for {} (user: {})",
            credentials.server_base_url(),
            credentials.username()
        );
        let client = WebDAVClient::new(credentials, connect_timeout, timeout)?;
        Ok(Self {
            operations: WebDAVOperations::new(client),
            transfer_options: TransferOptions::default(),
        })
    }

    pub fn from_config(config: &WebDAVConfig) -> StorageResult<Self> {
        Self::new(config.credentials(), config.connect_timeout(), config.read_timeout())
    }

    /// Transfer options used by rename/copy and their batch forms
    pub fn with_transfer_options(mut self, options: TransferOptions) -> Self {
        self.transfer_options = options;
        self
    }

    pub fn operations(&self) -> &WebDAVOperations {
        &self.operations
    }

    /// Upload with an explicit content type or other options
    pub async fn put_with_options(
        &self,
        path: &str,
        data: UploadPayload,
        options: UploadOptions,
    ) -> StorageResult<OperationResult> {
        self.operations.upload_file(path, data, options).await
    }

    /// Replace the content of an existing file
    pub async fn update_file(&self, path: &str, data: UploadPayload) -> StorageResult<OperationResult> {
        self.operations.update_file(path, data).await
    }
}

#[async_trait]
impl StorageBackend for WebDAVStorageBackend {
    fn storage_type(&self) -> &'static str {
        "webdav"
    }

    fn as_reader(&self) -> Option<&dyn StorageReader> {
        Some(self)
    }

    fn as_writer(&self) -> Option<&dyn StorageWriter> {
        Some(self)
    }

    fn as_atomic(&self) -> Option<&dyn AtomicRenameCopy> {
        Some(self)
    }
}

#[async_trait]
impl StorageReader for WebDAVStorageBackend {
    async fn list(&self, path: &str) -> StorageResult<DirectoryListing> {
        self.operations.list_directory(path).await
    }

    async fn get(&self, path: &str) -> StorageResult<ByteStream> {
        self.operations.download(path).await
    }

    async fn get_info(&self, path: &str) -> StorageResult<ResourceEntry> {
        let descriptor = self.operations.get_info(path).await?;
        Ok(self.operations.project(&descriptor))
    }

    async fn stat(&self, path: &str) -> StorageResult<ResourceStat> {
        let descriptor = self.operations.get_info(path).await?;
        let entry_path = self.operations.entry_path(&descriptor);
        Ok(ResourceStat::from_descriptor(&descriptor, entry_path))
    }

    async fn exists(&self, path: &str) -> bool {
        self.operations.exists(path).await
    }

    async fn check_existence(&self, path: &str) -> Existence {
        self.operations.check_existence(path).await
    }
}

#[async_trait]
impl StorageWriter for WebDAVStorageBackend {
    async fn put(&self, path: &str, data: UploadPayload) -> StorageResult<OperationResult> {
        self.operations.upload_file(path, data, UploadOptions::default()).await
    }

    async fn mkdir(&self, path: &str) -> StorageResult<OperationResult> {
        self.operations.create_directory(path).await
    }

    async fn delete(&self, path: &str) -> StorageResult<OperationResult> {
        self.operations.delete(path).await
    }

    async fn batch_delete(&self, paths: &[String]) -> BatchResult {
        self.operations.batch_delete(paths).await
    }
}

#[async_trait]
impl AtomicRenameCopy for WebDAVStorageBackend {
    async fn rename(&self, source: &str, destination: &str) -> StorageResult<OperationResult> {
        self.operations
            .move_resource(source, destination, self.transfer_options)
            .await
    }

    async fn copy(&self, source: &str, destination: &str) -> StorageResult<OperationResult> {
        self.operations
            .copy_resource(source, destination, self.transfer_options)
            .await
    }

    async fn batch_copy(&self, items: &[TransferItem]) -> BatchResult {
        self.operations.batch_copy(items, self.transfer_options).await
    }

    async fn batch_move(&self, items: &[TransferItem]) -> BatchResult {
        self.operations.batch_move(items, self.transfer_options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Capability;

    #[test]
    fn test_webdav_backend_declares_all_capabilities() {
        let backend = WebDAVStorageBackend::from_config(&WebDAVConfig::new(
            "https://dav.example.com",
            "alice",
            "secret",
        ))
        .expect("backend should build");

        assert_eq!(backend.storage_type(), "webdav");
        for capability in Capability::ALL {
            assert!(backend.capabilities().contains(capability));
            assert!(backend.require(capability).is_ok());
        }
    }
}
