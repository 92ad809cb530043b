use serde::{Deserialize, Serialize};

use crate::errors::{ErrorKind, StorageError};

/// Uniform outcome of a single-item mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_written: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl OperationResult {
    pub fn for_path(path: &str, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            path: Some(path.to_string()),
            source: None,
            destination: None,
            bytes_written: None,
            etag: None,
        }
    }

    pub fn for_transfer(source: &str, destination: &str, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            path: None,
            source: Some(source.to_string()),
            destination: Some(destination.to_string()),
            bytes_written: None,
            etag: None,
        }
    }

    pub fn with_bytes_written(mut self, bytes: u64) -> Self {
        self.bytes_written = Some(bytes);
        self
    }

    pub fn with_etag(mut self, etag: Option<String>) -> Self {
        self.etag = etag;
        self
    }
}

/// Source/destination pair for batch copy and move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    pub source: String,
    pub destination: String,
}

impl TransferItem {
    pub fn new(source: &str, destination: &str) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSuccess {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl BatchFailure {
    pub fn from_error(path: &str, destination: Option<&str>, error: &StorageError) -> Self {
        Self {
            path: path.to_string(),
            destination: destination.map(str::to_string),
            kind: error.kind(),
            status: error.status(),
            message: error.to_string(),
        }
    }
}

/// Aggregate outcome of a batch. `successes.len() + failures.len() == total`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub success: bool,
    pub total: usize,
    pub successes: Vec<BatchSuccess>,
    pub failures: Vec<BatchFailure>,
}

impl BatchResult {
    pub fn from_parts(successes: Vec<BatchSuccess>, failures: Vec<BatchFailure>) -> Self {
        Self {
            success: failures.is_empty(),
            total: successes.len() + failures.len(),
            successes,
            failures,
        }
    }

    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}
