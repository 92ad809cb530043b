//! Per-item file, directory and upload operations.
//!
//! Each operation sends one request through [`WebDAVClient`] and turns the
//! HTTP status into either a domain value or exactly one [`StorageError`]
//! kind, always qualified with the driver path involved.

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::ETAG;
use reqwest::{Body, Response, StatusCode};
use tracing::{debug, error, info, warn};

use crate::errors::{StorageError, StorageResult};
use crate::models::{
    DirectoryListing, Existence, OperationResult, ResourceDescriptor, ResourceEntry,
};
use crate::utils::path;

use super::client::{content_headers, Depth, WebDAVClient};
use super::common::clean_etag;
use super::xml_parser::parse_multistatus;

/// Body of a downloaded resource, passed through unmodified
pub type ByteStream = BoxStream<'static, StorageResult<Bytes>>;

pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Options shared by MOVE and COPY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Sent as `Overwrite: T|F`
    pub overwrite: bool,
    /// Only meaningful for COPY
    pub depth: Depth,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            depth: Depth::Infinity,
        }
    }
}

impl TransferOptions {
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }
}

/// The representations an upload accepts
#[derive(Debug, Clone)]
pub enum UploadPayload {
    /// Binary data that may already know its media type
    Blob {
        data: bytes::Bytes,
        content_type: Option<String>,
    },
    Bytes(Vec<u8>),
    Text(String),
}

impl UploadPayload {
    /// Size in bytes as sent on the wire (UTF-8 length for text)
    pub fn len(&self) -> u64 {
        match self {
            UploadPayload::Blob { data, .. } => data.len() as u64,
            UploadPayload::Bytes(data) => data.len() as u64,
            UploadPayload::Text(text) => text.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn inferred_content_type(&self) -> &str {
        match self {
            UploadPayload::Blob {
                content_type: Some(content_type),
                ..
            } if !content_type.trim().is_empty() => content_type.as_str(),
            UploadPayload::Blob { .. } | UploadPayload::Bytes(_) => {
                crate::models::DEFAULT_FILE_CONTENT_TYPE
            }
            UploadPayload::Text(_) => TEXT_CONTENT_TYPE,
        }
    }

    fn into_body(self) -> Body {
        match self {
            UploadPayload::Blob { data, .. } => Body::from(data),
            UploadPayload::Bytes(data) => Body::from(data),
            UploadPayload::Text(text) => Body::from(text),
        }
    }
}

impl From<Vec<u8>> for UploadPayload {
    fn from(data: Vec<u8>) -> Self {
        UploadPayload::Bytes(data)
    }
}

impl From<String> for UploadPayload {
    fn from(text: String) -> Self {
        UploadPayload::Text(text)
    }
}

impl From<&str> for UploadPayload {
    fn from(text: &str) -> Self {
        UploadPayload::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Always wins over the payload's inferred type
    pub content_type: Option<String>,
}

impl UploadOptions {
    pub fn with_content_type(content_type: &str) -> Self {
        Self {
            content_type: Some(content_type.to_string()),
        }
    }
}

/// Normalized driver path plus its wire form. A trailing '/' marks a collection.
fn target(raw: &str) -> (String, String) {
    let normalized = path::normalize(raw, raw.ends_with('/'));
    let encoded = path::encode(&normalized);
    (normalized, encoded)
}

#[derive(Debug, Clone)]
pub struct WebDAVOperations {
    client: WebDAVClient,
}

impl WebDAVOperations {
    pub fn new(client: WebDAVClient) -> Self {
        Self { client }
    }

    /// Driver path of a parsed descriptor
    pub fn entry_path(&self, descriptor: &ResourceDescriptor) -> String {
        self.client.relative_path(&descriptor.href, descriptor.is_collection)
    }

    pub fn project(&self, descriptor: &ResourceDescriptor) -> ResourceEntry {
        ResourceEntry::from_descriptor(descriptor, self.entry_path(descriptor))
    }

    /// Properties of a single resource (PROPFIND depth 0)
    pub async fn get_info(&self, raw_path: &str) -> StorageResult<ResourceDescriptor> {
        let (normalized, encoded) = target(raw_path);
        debug!("📋 Getting metadata for: {}", normalized);

        let response = self.client.propfind(&encoded, Depth::Zero, None).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            warn!("Resource not found: {}", normalized);
            return Err(StorageError::not_found(normalized));
        }
        if !status.is_success() {
            error!("❌ PROPFIND failed for '{}': HTTP {}", normalized, status);
            return Err(StorageError::http("PROPFIND", &normalized, status.as_u16()));
        }

        let body = response.text().await?;
        parse_multistatus(&body)
            .into_iter()
            .next()
            .ok_or_else(|| {
                warn!("PROPFIND for '{}' returned no usable entries", normalized);
                StorageError::not_found(normalized)
            })
    }

    /// Stream a resource's body (GET)
    pub async fn download(&self, raw_path: &str) -> StorageResult<ByteStream> {
        let (normalized, encoded) = target(raw_path);
        debug!("⬇️ Downloading file: {}", normalized);

        let response = self.client.get(&encoded).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            warn!("Download target not found: {}", normalized);
            return Err(StorageError::not_found(normalized));
        }
        if !status.is_success() {
            error!("❌ Failed to download file '{}': HTTP {}", normalized, status);
            return Err(StorageError::http("GET", &normalized, status.as_u16()));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(StorageError::from))
            .boxed())
    }

    /// Whole body of a resource in memory
    pub async fn download_bytes(&self, raw_path: &str) -> StorageResult<Vec<u8>> {
        let mut stream = self.download(raw_path).await?;
        let mut content = Vec::new();
        while let Some(chunk) = stream.next().await {
            content.extend_from_slice(&chunk?);
        }
        debug!("✅ Downloaded {} bytes for file: {}", content.len(), raw_path);
        Ok(content)
    }

    pub async fn move_resource(
        &self,
        source: &str,
        destination: &str,
        options: TransferOptions,
    ) -> StorageResult<OperationResult> {
        let (src, encoded_src) = target(source);
        let (dst, encoded_dst) = target(destination);
        debug!("🔀 Moving '{}' to '{}' (overwrite: {})", src, dst, options.overwrite);

        let response = self
            .client
            .move_resource(&encoded_src, &encoded_dst, options.overwrite)
            .await?;
        classify_transfer("MOVE", &src, &dst, response.status())?;

        info!("✅ Moved '{}' to '{}'", src, dst);
        Ok(OperationResult::for_transfer(&src, &dst, format!("Moved {} to {}", src, dst)))
    }

    pub async fn copy_resource(
        &self,
        source: &str,
        destination: &str,
        options: TransferOptions,
    ) -> StorageResult<OperationResult> {
        let (src, encoded_src) = target(source);
        let (dst, encoded_dst) = target(destination);
        debug!(
            "📄 Copying '{}' to '{}' (overwrite: {}, depth: {})",
            src,
            dst,
            options.overwrite,
            options.depth.as_str()
        );

        let response = self
            .client
            .copy_resource(&encoded_src, &encoded_dst, options.overwrite, options.depth)
            .await?;
        classify_transfer("COPY", &src, &dst, response.status())?;

        info!("✅ Copied '{}' to '{}'", src, dst);
        Ok(OperationResult::for_transfer(&src, &dst, format!("Copied {} to {}", src, dst)))
    }

    /// Overwrite an existing file in place (PUT)
    pub async fn update_file(&self, raw_path: &str, payload: UploadPayload) -> StorageResult<OperationResult> {
        let (normalized, encoded) = target(raw_path);
        let size = payload.len();
        let headers = content_headers(payload.inferred_content_type(), size)?;

        let response = self.client.put(&encoded, payload.into_body(), headers).await?;
        let status = response.status();
        if !status.is_success() {
            error!("❌ Update of '{}' failed: HTTP {}", normalized, status);
            return Err(StorageError::http("PUT", &normalized, status.as_u16()));
        }

        info!("✅ Updated '{}' ({} bytes)", normalized, size);
        Ok(OperationResult::for_path(&normalized, format!("Updated {}", normalized))
            .with_bytes_written(size)
            .with_etag(response_etag(&response)))
    }

    /// Create a collection (MKCOL)
    pub async fn create_directory(&self, raw_path: &str) -> StorageResult<OperationResult> {
        let normalized = path::normalize(raw_path, true);
        let encoded = path::encode(&normalized);

        let response = self.client.mkcol(&encoded).await?;
        let status = response.status();
        match status.as_u16() {
            405 => {
                warn!("Directory already exists: {}", normalized);
                Err(StorageError::conflict(normalized, "exists", 405))
            }
            409 => {
                warn!("Parent of '{}' does not exist", normalized);
                Err(StorageError::conflict(normalized, "parent missing", 409))
            }
            _ if status.is_success() => {
                info!("📁 Created directory: {}", normalized);
                Ok(OperationResult::for_path(&normalized, format!("Created {}", normalized)))
            }
            code => {
                error!("❌ MKCOL failed for '{}': HTTP {}", normalized, status);
                Err(StorageError::http("MKCOL", &normalized, code))
            }
        }
    }

    pub async fn delete(&self, raw_path: &str) -> StorageResult<OperationResult> {
        let (normalized, encoded) = target(raw_path);

        let response = self.client.delete(&encoded).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!("Delete target not found: {}", normalized);
            return Err(StorageError::not_found(normalized));
        }
        if !status.is_success() {
            error!("❌ DELETE failed for '{}': HTTP {}", normalized, status);
            return Err(StorageError::http("DELETE", &normalized, status.as_u16()));
        }

        info!("🗑️ Deleted: {}", normalized);
        Ok(OperationResult::for_path(&normalized, format!("Deleted {}", normalized)))
    }

    /// HEAD the resource. Never fails: a transport error is `Unknown`.
    pub async fn check_existence(&self, raw_path: &str) -> Existence {
        let (normalized, encoded) = target(raw_path);
        match self.client.head(&encoded).await {
            Ok(response) if response.status().is_success() => Existence::Present,
            Ok(response) => {
                debug!("HEAD {} returned {}", normalized, response.status());
                Existence::Absent
            }
            Err(e) => {
                warn!("Could not determine whether '{}' exists: {}", normalized, e);
                Existence::Unknown
            }
        }
    }

    pub async fn exists(&self, raw_path: &str) -> bool {
        self.check_existence(raw_path).await.as_bool()
    }

    /// Create or replace a file (PUT) from any [`UploadPayload`]
    pub async fn upload_file(
        &self,
        raw_path: &str,
        payload: UploadPayload,
        options: UploadOptions,
    ) -> StorageResult<OperationResult> {
        let normalized = path::normalize(raw_path, false);
        let encoded = path::encode(&normalized);

        let size = payload.len();
        let content_type = options
            .content_type
            .unwrap_or_else(|| payload.inferred_content_type().to_string());
        debug!("⬆️ Uploading '{}' ({} bytes, {})", normalized, size, content_type);

        let headers = content_headers(&content_type, size)?;
        let response = self.client.put(&encoded, payload.into_body(), headers).await?;
        let status = response.status();

        match status.as_u16() {
            409 => {
                warn!("Upload conflict for '{}': parent missing or conflicting resource", normalized);
                Err(StorageError::conflict(
                    normalized,
                    "parent missing or conflicting resource",
                    409,
                ))
            }
            507 => {
                error!("💾 Insufficient storage on server while uploading '{}'", normalized);
                Err(StorageError::Internal {
                    message: format!("Upload failed for '{}': insufficient storage", normalized),
                    status: Some(507),
                })
            }
            _ if status.is_success() => {
                info!("✅ Uploaded '{}' ({} bytes)", normalized, size);
                Ok(OperationResult::for_path(&normalized, format!("Uploaded {}", normalized))
                    .with_bytes_written(size)
                    .with_etag(response_etag(&response)))
            }
            code => {
                error!("❌ Upload failed for '{}': HTTP {}", normalized, status);
                Err(StorageError::http("PUT", &normalized, code))
            }
        }
    }

    /// Children of a collection (PROPFIND depth 1), without the collection itself
    pub async fn list_directory(&self, raw_path: &str) -> StorageResult<DirectoryListing> {
        let normalized = path::normalize(raw_path, true);
        let encoded = path::encode(&normalized);
        debug!("📂 Listing directory: {}", normalized);

        let response = self.client.propfind(&encoded, Depth::One, None).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!("Directory not found: {}", normalized);
            return Err(StorageError::not_found(normalized));
        }
        if !status.is_success() {
            error!("❌ PROPFIND failed for directory '{}': HTTP {}", normalized, status);
            return Err(StorageError::http("PROPFIND", &normalized, status.as_u16()));
        }

        let body = response.text().await?;
        let mut writable = None;
        let mut entries = Vec::new();

        for descriptor in parse_multistatus(&body) {
            let entry_path = self.entry_path(&descriptor);
            if path::normalize(&entry_path, true) == normalized {
                writable = descriptor.is_writable();
                continue;
            }
            entries.push(ResourceEntry::from_descriptor(&descriptor, entry_path));
        }

        debug!("📂 Listed {} entries in {}", entries.len(), normalized);
        Ok(DirectoryListing {
            path: normalized,
            entries,
            writable: writable.unwrap_or(true),
        })
    }
}

/// Shared MOVE/COPY status mapping
fn classify_transfer(operation: &str, source: &str, destination: &str, status: StatusCode) -> StorageResult<()> {
    match status.as_u16() {
        404 => {
            warn!("{} source not found: {}", operation, source);
            Err(StorageError::not_found(source))
        }
        409 | 412 => {
            warn!("{} refused with {} at destination: {}", operation, status, destination);
            let reason = if status == StatusCode::PRECONDITION_FAILED {
                "target exists and overwrite is disabled"
            } else {
                "destination conflict"
            };
            Err(StorageError::conflict(destination, reason, status.as_u16()))
        }
        _ if status.is_success() => Ok(()),
        code => {
            error!("❌ {} '{}' -> '{}' failed: HTTP {}", operation, source, destination, status);
            Err(StorageError::http(operation, source, code))
        }
    }
}

fn response_etag(response: &Response) -> Option<String> {
    response
        .headers()
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .and_then(clean_etag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_payload_measures_utf8_bytes() {
        let payload = UploadPayload::from("héllo wörld ✓");
        assert_eq!(payload.len(), "héllo wörld ✓".len() as u64);
        assert!(payload.len() > "héllo wörld ✓".chars().count() as u64);
        assert_eq!(payload.inferred_content_type(), TEXT_CONTENT_TYPE);
    }

    #[test]
    fn test_inferred_content_types() {
        let blob = UploadPayload::Blob {
            data: bytes::Bytes::from_static(b"\x89PNG"),
            content_type: Some("image/png".to_string()),
        };
        assert_eq!(blob.inferred_content_type(), "image/png");

        let untyped = UploadPayload::Blob {
            data: bytes::Bytes::from_static(b"abc"),
            content_type: None,
        };
        assert_eq!(untyped.inferred_content_type(), "application/octet-stream");

        let raw = UploadPayload::from(vec![1u8, 2, 3]);
        assert_eq!(raw.inferred_content_type(), "application/octet-stream");
        assert_eq!(raw.len(), 3);
        assert!(UploadPayload::Bytes(vec![]).is_empty());
    }

    #[test]
    fn test_transfer_defaults() {
        let options = TransferOptions::default();
        assert!(options.overwrite);
        assert_eq!(options.depth, Depth::Infinity);
        assert!(!options.overwrite(false).overwrite);
    }

    #[test]
    fn test_transfer_classification() {
        let err = classify_transfer("MOVE", "/x.txt", "/y.txt", StatusCode::CONFLICT).unwrap_err();
        assert!(matches!(err, StorageError::Conflict { ref path, status: 409, .. } if path == "/y.txt"));

        let err = classify_transfer("COPY", "/x.txt", "/y.txt", StatusCode::PRECONDITION_FAILED).unwrap_err();
        assert!(matches!(err, StorageError::Conflict { status: 412, .. }));

        let err = classify_transfer("MOVE", "/x.txt", "/y.txt", StatusCode::NOT_FOUND).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { ref path } if path == "/x.txt"));

        let err = classify_transfer("MOVE", "/x.txt", "/y.txt", StatusCode::BAD_GATEWAY).unwrap_err();
        assert_eq!(err.status(), Some(502));

        assert!(classify_transfer("COPY", "/x.txt", "/y.txt", StatusCode::CREATED).is_ok());
        assert!(classify_transfer("MOVE", "/x.txt", "/y.txt", StatusCode::NO_CONTENT).is_ok());
    }

    #[test]
    fn test_target_keeps_collection_marker() {
        assert_eq!(target("docs//a b.txt"), ("/docs/a b.txt".to_string(), "/docs/a%20b.txt".to_string()));
        assert_eq!(target("/docs/"), ("/docs/".to_string(), "/docs/".to_string()));
    }
}
