// WebDAV driver modules, leaves first

pub mod common;
pub mod xml_parser;
pub mod client;
pub mod operations;
pub mod batch;
pub mod diagnostics;

// Re-export main types for convenience
pub use client::{Depth, RequestOptions, WebDAVClient};
pub use diagnostics::{run_diagnostics, WebDAVDiagnostics};
pub use operations::{ByteStream, TransferOptions, UploadOptions, UploadPayload, WebDAVOperations};
pub use xml_parser::{build_propfind_request_body, parse_multistatus};
