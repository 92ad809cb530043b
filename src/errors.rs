//! Error taxonomy shared by every WebDAV driver operation.
//!
//! Single-item operations classify the HTTP status they receive into exactly
//! one of these kinds. Batch operations and the diagnostic pipeline never
//! return them for per-item failures; they fold them into their payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Copyable discriminant of [`StorageError`], used in batch payloads and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    NotFound,
    Conflict,
    Unsupported,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Unsupported => write!(f, "unsupported"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// Network failure or timeout. Never retried by the driver.
    #[error("transport error: {message}")]
    Transport { message: String, timed_out: bool },

    #[error("resource not found: {path}")]
    NotFound { path: String },

    #[error("conflict at {path}: {reason}")]
    Conflict {
        path: String,
        reason: String,
        status: u16,
    },

    #[error("operation not supported by this backend: {operation}")]
    Unsupported { operation: String },

    #[error("{message}")]
    Internal { message: String, status: Option<u16> },
}

impl StorageError {
    pub fn not_found(path: impl Into<String>) -> Self {
        StorageError::NotFound { path: path.into() }
    }

    pub fn conflict(path: impl Into<String>, reason: impl Into<String>, status: u16) -> Self {
        StorageError::Conflict {
            path: path.into(),
            reason: reason.into(),
            status,
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        StorageError::Unsupported {
            operation: operation.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        StorageError::Internal {
            message: message.into(),
            status: None,
        }
    }

    /// Internal failure caused by an unexpected HTTP status
    pub fn http(operation: &str, path: &str, status: u16) -> Self {
        StorageError::Internal {
            message: format!("{} failed for '{}': HTTP {}", operation, path, status),
            status: Some(status),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Transport { .. } => ErrorKind::Transport,
            StorageError::NotFound { .. } => ErrorKind::NotFound,
            StorageError::Conflict { .. } => ErrorKind::Conflict,
            StorageError::Unsupported { .. } => ErrorKind::Unsupported,
            StorageError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// HTTP status that produced this error, when one was involved
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::NotFound { .. } => Some(404),
            StorageError::Conflict { status, .. } => Some(*status),
            StorageError::Internal { status, .. } => *status,
            StorageError::Transport { .. } | StorageError::Unsupported { .. } => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StorageError::Transport { timed_out: true, .. })
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Transport {
            timed_out: e.is_timeout(),
            message: e.to_string(),
        }
    }
}
