//! Sequential batch orchestration over the single-item operations.
//!
//! Items run one at a time in input order. Every item's outcome, including a
//! panic inside its future, lands in the [`BatchResult`]; nothing short-circuits.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{StorageError, StorageResult};
use crate::models::{BatchFailure, BatchResult, BatchSuccess, OperationResult, TransferItem};

use super::operations::{TransferOptions, WebDAVOperations};

/// Run one item's future, turning a panic into an `Internal` failure
async fn isolate<F>(future: F) -> StorageResult<OperationResult>
where
    F: Future<Output = StorageResult<OperationResult>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(StorageError::internal(format!(
            "item processing panicked: {}",
            panic_message(panic.as_ref())
        ))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[derive(Debug, Clone, Copy)]
enum TransferKind {
    Copy,
    Move,
}

impl TransferKind {
    fn label(&self) -> &'static str {
        match self {
            TransferKind::Copy => "copy",
            TransferKind::Move => "move",
        }
    }
}

impl WebDAVOperations {
    pub async fn batch_delete(&self, paths: &[String]) -> BatchResult {
        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        info!("[{}] 🗑️ Starting batch delete of {} items", batch_id, paths.len());

        let mut successes = Vec::new();
        let mut failures = Vec::new();

        for path in paths {
            match isolate(self.delete(path)).await {
                Ok(_) => {
                    debug!("[{}] deleted {}", batch_id, path);
                    successes.push(BatchSuccess {
                        path: path.clone(),
                        destination: None,
                    });
                }
                Err(e) => {
                    warn!("[{}] failed to delete {}: {}", batch_id, path, e);
                    failures.push(BatchFailure::from_error(path, None, &e));
                }
            }
        }

        let result = BatchResult::from_parts(successes, failures);
        info!(
            "[{}] 📊 Batch delete completed in {}ms: {} successful, {} failed",
            batch_id,
            started.elapsed().as_millis(),
            result.success_count(),
            result.failure_count()
        );
        result
    }

    pub async fn batch_copy(&self, items: &[TransferItem], options: TransferOptions) -> BatchResult {
        self.batch_transfer(TransferKind::Copy, items, options).await
    }

    pub async fn batch_move(&self, items: &[TransferItem], options: TransferOptions) -> BatchResult {
        self.batch_transfer(TransferKind::Move, items, options).await
    }

    async fn batch_transfer(&self, kind: TransferKind, items: &[TransferItem], options: TransferOptions) -> BatchResult {
        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        info!(
            "[{}] 📦 Starting batch {} of {} items (overwrite: {})",
            batch_id,
            kind.label(),
            items.len(),
            options.overwrite
        );

        let mut successes = Vec::new();
        let mut failures = Vec::new();

        for item in items {
            let outcome = match kind {
                TransferKind::Copy => isolate(self.copy_resource(&item.source, &item.destination, options)).await,
                TransferKind::Move => isolate(self.move_resource(&item.source, &item.destination, options)).await,
            };

            match outcome {
                Ok(_) => successes.push(BatchSuccess {
                    path: item.source.clone(),
                    destination: Some(item.destination.clone()),
                }),
                Err(e) => {
                    warn!(
                        "[{}] failed to {} {} -> {}: {}",
                        batch_id,
                        kind.label(),
                        item.source,
                        item.destination,
                        e
                    );
                    failures.push(BatchFailure::from_error(&item.source, Some(&item.destination), &e));
                }
            }
        }

        let result = BatchResult::from_parts(successes, failures);
        info!(
            "[{}] 📊 Batch {} completed in {}ms: {} successful, {} failed",
            batch_id,
            kind.label(),
            started.elapsed().as_millis(),
            result.success_count(),
            result.failure_count()
        );
        result
    }
}
