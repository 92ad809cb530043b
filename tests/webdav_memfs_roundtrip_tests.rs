/*
 * WebDAV end-to-end round trip
 *
 * Runs the driver against a real WebDAV implementation (dav-server with an
 * in-memory filesystem) served by hyper on a random local port.
 */

use anyhow::{anyhow, Result};
use futures::StreamExt;
use std::sync::Once;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error};

use dav_server::{fakels::FakeLs, memfs::MemFs, DavHandler};
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;

use webdav_driver::models::TransferItem;
use webdav_driver::services::webdav::{TransferOptions, UploadPayload};
use webdav_driver::{
    run_diagnostics, AtomicRenameCopy, Credentials, ErrorKind, StorageReader, StorageWriter,
    WebDAVConfig, WebDAVStorageBackend,
};

static INIT_TRACING: Once = Once::new();

fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// In-memory WebDAV server, stopped on drop
struct MemFsWebDAVServer {
    port: u16,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl MemFsWebDAVServer {
    async fn start() -> Result<Self> {
        let dav_handler = DavHandler::builder()
            .filesystem(MemFs::new())
            .locksystem(FakeLs::new())
            .build_handler();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow!("Failed to bind to port: {}", e))?;
        let port = listener
            .local_addr()
            .map_err(|e| anyhow!("Failed to get local address: {}", e))?
            .port();

        let server_handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let handler = dav_handler.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let handler = handler.clone();
                                async move {
                                    let response = handler.handle(req).await;
                                    let (parts, body) = response.into_parts();
                                    let body_bytes = BodyExt::collect(body)
                                        .await
                                        .map(|c| c.to_bytes())
                                        .unwrap_or_default();
                                    Ok::<_, std::convert::Infallible>(hyper::Response::from_parts(
                                        parts,
                                        Full::new(body_bytes),
                                    ))
                                }
                            });

                            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                debug!("WebDAV connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
        });

        Ok(Self {
            port,
            server_handle: Some(server_handle),
        })
    }

    fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for MemFsWebDAVServer {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

fn backend_for(server: &MemFsWebDAVServer) -> WebDAVStorageBackend {
    WebDAVStorageBackend::new(
        Credentials::new(&server.url(), "alice", "secret"),
        Duration::from_secs(5),
        Duration::from_secs(10),
    )
    .expect("backend should build")
}

async fn read_all(backend: &WebDAVStorageBackend, path: &str) -> Vec<u8> {
    match backend.operations().download_bytes(path).await {
        Ok(content) => content,
        Err(e) => panic!("download of {} failed: {}", path, e),
    }
}

#[tokio::test]
async fn test_round_trip_against_memfs() {
    init_tracing();
    let server = MemFsWebDAVServer::start().await.expect("server starts");
    let backend = backend_for(&server);

    // Directories
    backend.mkdir("/docs").await.expect("mkdir /docs");
    let err = backend.mkdir("/docs/").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = backend.mkdir("/missing/child").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    backend.mkdir("/docs/sub").await.expect("mkdir /docs/sub");

    // Upload with reserved characters in the name
    let text = "Grüße # 100% ✓\n";
    let result = backend
        .put("/docs/a b#1.txt", UploadPayload::from(text))
        .await
        .expect("upload");
    assert_eq!(result.bytes_written, Some(text.len() as u64));

    let listing = backend.list("/docs/").await.expect("list /docs/");
    assert_eq!(listing.entries.len(), 2);
    assert!(listing.entries.iter().all(|e| e.path != "/docs/"));

    let file = listing
        .entries
        .iter()
        .find(|e| !e.is_directory)
        .expect("file entry");
    assert_eq!(file.name, "a b#1.txt");
    assert_eq!(file.path, "/docs/a b#1.txt");
    assert_eq!(file.size, Some(text.len() as u64));

    let folder = listing
        .entries
        .iter()
        .find(|e| e.is_directory)
        .expect("folder entry");
    assert_eq!(folder.path, "/docs/sub/");

    let mut stream = backend.get("/docs/a b#1.txt").await.expect("download stream");
    let mut streamed = Vec::new();
    while let Some(chunk) = stream.next().await {
        streamed.extend_from_slice(&chunk.expect("chunk"));
    }
    assert_eq!(streamed, text.as_bytes());

    let info = backend.get_info("/docs/a b#1.txt").await.expect("info");
    assert_eq!(info.size, Some(text.len() as u64));
    assert!(backend.exists("/docs/a b#1.txt").await);

    // Copy twice onto the same target: replaced by default, refused without overwrite
    backend
        .copy("/docs/a b#1.txt", "/docs/copy.txt")
        .await
        .expect("copy");
    backend
        .copy("/docs/a b#1.txt", "/docs/copy.txt")
        .await
        .expect("copy over existing target");
    let strict = backend_for(&server).with_transfer_options(TransferOptions::default().overwrite(false));
    let err = strict
        .copy("/docs/a b#1.txt", "/docs/copy.txt")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    backend
        .rename("/docs/copy.txt", "/docs/sub/moved.txt")
        .await
        .expect("rename");
    assert!(!backend.exists("/docs/copy.txt").await);
    assert_eq!(read_all(&backend, "/docs/sub/moved.txt").await, text.as_bytes());

    let err = backend
        .rename("/docs/not-there.txt", "/docs/x.txt")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let batch = backend
        .batch_copy(&[
            TransferItem::new("/docs/sub/moved.txt", "/docs/one.txt"),
            TransferItem::new("/docs/ghost.txt", "/docs/two.txt"),
        ])
        .await;
    assert_eq!(batch.total, 2);
    assert_eq!(batch.success_count(), 1);
    assert_eq!(batch.failures[0].kind, ErrorKind::NotFound);

    let batch = backend
        .batch_delete(&[
            "/docs/a b#1.txt".to_string(),
            "/docs/one.txt".to_string(),
            "/docs/ghost.txt".to_string(),
        ])
        .await;
    assert_eq!(batch.total, 3);
    assert_eq!(batch.success_count(), 2);
    assert_eq!(batch.failures[0].path, "/docs/ghost.txt");

    assert!(!backend.exists("/docs/a b#1.txt").await);
    let err = backend.get_info("/docs/a b#1.txt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_diagnostics_against_memfs() {
    init_tracing();
    let server = MemFsWebDAVServer::start().await.expect("server starts");
    let backend = backend_for(&server);
    backend.mkdir("/Documents").await.expect("mkdir");
    backend
        .put("/readme.md", UploadPayload::from("# hello"))
        .await
        .expect("upload");

    let report = run_diagnostics(&WebDAVConfig::new(&server.url(), "alice", "secret")).await;

    assert!(report.success, "report: {:?}", report);
    assert!(report.connect.success);
    assert!(report.auth.success);
    assert!(report.read.success);
    assert!(report.write.result.success);
    assert_eq!(report.file_count, Some(2));
    assert!(report.write.cleanup.as_ref().map(|c| c.success).unwrap_or(false));

    // The probe was removed again
    let listing = backend.list("/").await.expect("list root");
    assert_eq!(listing.entries.len(), 2);
}
