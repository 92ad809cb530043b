//! Display-only file-type classification by filename extension.
//!
//! This is independent from the content type the server reports; it only
//! drives how listings are presented.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Folder,
    Image,
    Video,
    Audio,
    Text,
    Office,
    Document,
    Unknown,
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileCategory::Folder => write!(f, "folder"),
            FileCategory::Image => write!(f, "image"),
            FileCategory::Video => write!(f, "video"),
            FileCategory::Audio => write!(f, "audio"),
            FileCategory::Text => write!(f, "text"),
            FileCategory::Office => write!(f, "office"),
            FileCategory::Document => write!(f, "document"),
            FileCategory::Unknown => write!(f, "unknown"),
        }
    }
}

const OFFICE_EXTENSIONS: &[&str] = &[
    "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "pages", "numbers", "key",
];

const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "rtf", "epub", "djvu", "ps", "xps"];

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "csv", "tsv", "log", "json", "xml", "yaml", "yml", "toml", "ini",
    "html", "htm", "css", "js", "ts", "rs", "py", "sh",
];

/// Classify an entry by name. Collections are always [`FileCategory::Folder`].
pub fn classify(name: &str, is_collection: bool) -> FileCategory {
    if is_collection {
        return FileCategory::Folder;
    }

    let extension = match Path::new(name).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.to_lowercase(),
        None => return FileCategory::Unknown,
    };

    if OFFICE_EXTENSIONS.contains(&extension.as_str()) {
        return FileCategory::Office;
    }
    if DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
        return FileCategory::Document;
    }
    if TEXT_EXTENSIONS.contains(&extension.as_str()) {
        return FileCategory::Text;
    }

    // Fall back to the registered MIME type's top-level kind
    match mime_guess::from_ext(&extension).first() {
        Some(mime) if mime.type_() == mime_guess::mime::IMAGE => FileCategory::Image,
        Some(mime) if mime.type_() == mime_guess::mime::VIDEO => FileCategory::Video,
        Some(mime) if mime.type_() == mime_guess::mime::AUDIO => FileCategory::Audio,
        Some(mime) if mime.type_() == mime_guess::mime::TEXT => FileCategory::Text,
        _ => FileCategory::Unknown,
    }
}
