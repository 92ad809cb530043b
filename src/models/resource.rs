use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::file_type::{classify, FileCategory};

pub const DIRECTORY_CONTENT_TYPE: &str = "httpd/unix-directory";
pub const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// One `<response>` entry of a multi-status body, built fresh per parse.
///
/// Collections always report `size_bytes == Some(0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Percent-decoded href as sent by the server
    pub href: String,
    pub name: String,
    pub is_collection: bool,
    pub size_bytes: Option<u64>,
    pub last_modified: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub content_type: String,
    pub etag: Option<String>,
    pub display_name: Option<String>,
    /// ownCloud/Nextcloud permission letters, when the server sends them
    pub permissions: Option<String>,
}

impl ResourceDescriptor {
    /// Name shown to callers: the display name override if any, else the href segment
    pub fn effective_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn file_category(&self) -> FileCategory {
        classify(&self.name, self.is_collection)
    }

    /// Whether the permission letters grant write access; `None` when unknown
    pub fn is_writable(&self) -> Option<bool> {
        self.permissions
            .as_deref()
            .map(|perms| perms.chars().any(|c| matches!(c, 'W' | 'C' | 'K')))
    }
}

/// Caller-facing projection of a [`ResourceDescriptor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub name: String,
    /// Normalized driver path (trailing '/' for collections)
    pub path: String,
    pub is_directory: bool,
    pub size: Option<u64>,
    pub last_modified: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub content_type: String,
    pub etag: Option<String>,
    pub file_type: FileCategory,
}

impl ResourceEntry {
    pub fn from_descriptor(descriptor: &ResourceDescriptor, path: String) -> Self {
        Self {
            name: descriptor.effective_name().to_string(),
            path,
            is_directory: descriptor.is_collection,
            size: descriptor.size_bytes,
            last_modified: descriptor.last_modified,
            created_at: descriptor.created_at,
            content_type: descriptor.content_type.clone(),
            etag: descriptor.etag.clone(),
            file_type: descriptor.file_category(),
        }
    }
}

/// Minimal projection returned by `stat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStat {
    pub path: String,
    pub is_directory: bool,
    pub size: Option<u64>,
    pub last_modified: DateTime<Utc>,
    pub etag: Option<String>,
}

impl ResourceStat {
    pub fn from_descriptor(descriptor: &ResourceDescriptor, path: String) -> Self {
        Self {
            path,
            is_directory: descriptor.is_collection,
            size: descriptor.size_bytes,
            last_modified: descriptor.last_modified,
            etag: descriptor.etag.clone(),
        }
    }
}

/// Children of a collection; the collection's own entry is never included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub path: String,
    pub entries: Vec<ResourceEntry>,
    pub writable: bool,
}

/// Tri-state answer to "does this resource exist"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Existence {
    Present,
    Absent,
    /// The server could not be asked (transport failure)
    Unknown,
}

impl Existence {
    /// Compatible boolean view: anything but `Present` is `false`
    pub fn as_bool(self) -> bool {
        matches!(self, Existence::Present)
    }
}
