//! Four-stage connectivity check: connect, auth, read, write.
//!
//! Every stage runs regardless of how earlier stages went, each under its own
//! timeout. The pipeline never returns an error; everything it learns ends up
//! in the [`DiagnosticReport`].

use chrono::Utc;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::WebDAVConfig;
use crate::errors::{StorageError, StorageResult};
use crate::models::{
    CleanupResult, DiagnosticReport, DiagnosticStage, DiagnosticSummary, StageResult,
    WriteStageResult,
};
use crate::utils::path;

use super::client::{content_headers, Depth, WebDAVClient};
use super::operations::TEXT_CONTENT_TYPE;
use super::xml_parser::parse_multistatus;

const PROBE_PREFIX: &str = ".webdav-probe-";

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Await `future` under `limit`, returning the outcome and its latency
async fn timed<F, T>(limit: Duration, future: F) -> (Option<StorageResult<T>>, u64)
where
    F: Future<Output = StorageResult<T>>,
{
    let start = Instant::now();
    let outcome = timeout(limit, future).await.ok();
    (outcome, elapsed_ms(start))
}

fn transport_failure(stage: DiagnosticStage, latency_ms: u64, error: &StorageError) -> StageResult {
    if error.is_timeout() {
        StageResult::timed_out(stage, latency_ms, format!("Request timed out: {}", error))
    } else {
        StageResult::failed(stage, None, latency_ms, format!("Request failed: {}", error))
    }
}

fn stage_timeout(stage: DiagnosticStage, latency_ms: u64, limit: Duration) -> StageResult {
    StageResult::timed_out(
        stage,
        latency_ms,
        format!("No response within {}s", limit.as_secs()),
    )
}

/// Name of the write-stage probe file for the given instant
pub fn probe_file_name(timestamp_millis: i64) -> String {
    format!("{}{}.txt", PROBE_PREFIX, timestamp_millis)
}

fn probe_payload(name: &str) -> String {
    format!("webdav-driver connectivity probe {}\n", name)
}

pub struct WebDAVDiagnostics {
    client: WebDAVClient,
    default_path: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl WebDAVDiagnostics {
    pub fn new(client: WebDAVClient, config: &WebDAVConfig) -> Self {
        Self {
            client,
            default_path: path::normalize(&config.default_path, true),
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
        }
    }

    /// 1. OPTIONS on the DAV root. A 401 still proves the server is reachable.
    pub async fn connect_stage(&self) -> StageResult {
        let stage = DiagnosticStage::Connect;
        let (outcome, latency) = timed(self.connect_timeout, self.client.options("/")).await;

        match outcome {
            None => stage_timeout(stage, latency, self.connect_timeout),
            Some(Err(e)) => transport_failure(stage, latency, &e),
            Some(Ok(response)) => {
                let status = response.status();
                if status.is_success() {
                    StageResult::passed(stage, status.as_u16(), latency, "Server is reachable".to_string())
                } else if status.as_u16() == 401 {
                    StageResult::passed(
                        stage,
                        401,
                        latency,
                        "Server is reachable (authentication required)".to_string(),
                    )
                } else {
                    StageResult::failed(
                        stage,
                        Some(status.as_u16()),
                        latency,
                        format!("Server responded with HTTP {}", status),
                    )
                }
            }
        }
    }

    /// 2. PROPFIND depth 0 on the default path
    pub async fn auth_stage(&self) -> StageResult {
        let stage = DiagnosticStage::Auth;
        let encoded = path::encode(&self.default_path);
        let (outcome, latency) = timed(
            self.read_timeout,
            self.client.propfind(&encoded, Depth::Zero, None),
        )
        .await;

        match outcome {
            None => stage_timeout(stage, latency, self.read_timeout),
            Some(Err(e)) => transport_failure(stage, latency, &e),
            Some(Ok(response)) => {
                let status = response.status();
                if status.is_success() {
                    StageResult::passed(stage, status.as_u16(), latency, "Credentials accepted".to_string())
                } else if status.as_u16() == 401 {
                    StageResult::failed(
                        stage,
                        Some(401),
                        latency,
                        "Authentication failed: check username and password".to_string(),
                    )
                } else {
                    StageResult::failed(
                        stage,
                        Some(status.as_u16()),
                        latency,
                        format!("PROPFIND on {} returned HTTP {}", self.default_path, status),
                    )
                }
            }
        }
    }

    /// 3. PROPFIND depth 1 on the default path; also reports the entry count
    pub async fn read_stage(&self) -> (StageResult, Option<usize>) {
        let stage = DiagnosticStage::Read;
        let encoded = path::encode(&self.default_path);
        let listing = async {
            let response = self.client.propfind(&encoded, Depth::One, None).await?;
            let status = response.status();
            let body = if status.is_success() {
                response.text().await?
            } else {
                String::new()
            };
            Ok::<_, StorageError>((status, body))
        };
        let (outcome, latency) = timed(self.read_timeout, listing).await;

        match outcome {
            None => (stage_timeout(stage, latency, self.read_timeout), None),
            Some(Err(e)) => (transport_failure(stage, latency, &e), None),
            Some(Ok((status, body))) => {
                if !status.is_success() {
                    let result = StageResult::failed(
                        stage,
                        Some(status.as_u16()),
                        latency,
                        format!("Listing {} returned HTTP {}", self.default_path, status),
                    );
                    return (result, None);
                }

                let descriptors = parse_multistatus(&body);
                if descriptors.is_empty() {
                    let result = StageResult::passed(
                        stage,
                        status.as_u16(),
                        latency,
                        "Listing succeeded but the response could not be parsed".to_string(),
                    );
                    return (result, None);
                }

                let file_count = descriptors
                    .iter()
                    .filter(|d| self.client.relative_path(&d.href, true) != self.default_path)
                    .count();
                let result = StageResult::passed(
                    stage,
                    status.as_u16(),
                    latency,
                    format!("Listed {} entries in {}", file_count, self.default_path),
                );
                (result, Some(file_count))
            }
        }
    }

    /// 4. PUT a probe file, then DELETE it. Cleanup failure only flags an orphan.
    pub async fn write_stage(&self) -> WriteStageResult {
        let stage = DiagnosticStage::Write;
        let name = probe_file_name(Utc::now().timestamp_millis());
        let probe_path = path::join(&[self.default_path.as_str(), name.as_str()]);
        let encoded = path::encode(&probe_path);
        let payload = probe_payload(&name);

        let headers = match content_headers(TEXT_CONTENT_TYPE, payload.len() as u64) {
            Ok(headers) => headers,
            Err(e) => {
                return WriteStageResult {
                    result: StageResult::failed(stage, None, 0, e.to_string()),
                    probe_path,
                    cleanup: None,
                    orphaned_probe: None,
                }
            }
        };

        let (outcome, latency) = timed(self.read_timeout, self.client.put(&encoded, payload, headers)).await;
        let result = match outcome {
            None => stage_timeout(stage, latency, self.read_timeout),
            Some(Err(e)) => transport_failure(stage, latency, &e),
            Some(Ok(response)) => {
                let status = response.status();
                if status.is_success() {
                    StageResult::passed(stage, status.as_u16(), latency, format!("Wrote probe file {}", probe_path))
                } else {
                    StageResult::failed(
                        stage,
                        Some(status.as_u16()),
                        latency,
                        format!("Writing probe file returned HTTP {}", status),
                    )
                }
            }
        };

        if !result.success {
            return WriteStageResult {
                result,
                probe_path,
                cleanup: None,
                orphaned_probe: None,
            };
        }

        let cleanup = self.cleanup_probe(&encoded).await;
        let orphaned_probe = if cleanup.success {
            None
        } else {
            warn!("⚠️ Diagnostic probe file left on server: {} ({})", probe_path, cleanup.message);
            Some(probe_path.clone())
        };

        WriteStageResult {
            result,
            probe_path,
            cleanup: Some(cleanup),
            orphaned_probe,
        }
    }

    async fn cleanup_probe(&self, encoded: &str) -> CleanupResult {
        let (outcome, _) = timed(self.read_timeout, self.client.delete(encoded)).await;
        match outcome {
            None => CleanupResult {
                success: false,
                status_code: None,
                message: format!("Cleanup timed out after {}s", self.read_timeout.as_secs()),
            },
            Some(Err(e)) => CleanupResult {
                success: false,
                status_code: None,
                message: format!("Cleanup request failed: {}", e),
            },
            Some(Ok(response)) => {
                let status = response.status();
                CleanupResult {
                    success: status.is_success(),
                    status_code: Some(status.as_u16()),
                    message: if status.is_success() {
                        "Probe file removed".to_string()
                    } else {
                        format!("Cleanup returned HTTP {}", status)
                    },
                }
            }
        }
    }

    pub async fn run(&self) -> DiagnosticReport {
        let started_at = Utc::now();
        let start = Instant::now();
        info!("🔍 Running WebDAV diagnostics against {}", self.client.credentials().server_base_url());

        let connect = self.connect_stage().await;
        let auth = self.auth_stage().await;
        let (read, file_count) = self.read_stage().await;
        let write = self.write_stage().await;

        for stage in [&connect, &auth, &read, &write.result] {
            if stage.success {
                info!("✅ {} stage passed in {}ms: {}", stage.stage, stage.latency_ms, stage.message);
            } else {
                warn!("❌ {} stage failed in {}ms: {}", stage.stage, stage.latency_ms, stage.message);
            }
        }

        let summary = DiagnosticReport::summarize(&connect, &auth, &read, &write.result);
        let success = connect.success && auth.success && read.success;
        info!("📊 Diagnostics finished: {:?}", summary);

        let message = match summary {
            DiagnosticSummary::AuthFailure => format!("{}: {}", summary.message(), auth.message),
            DiagnosticSummary::ReadFailure => format!("{}: {}", summary.message(), read.message),
            _ => summary.message().to_string(),
        };

        DiagnosticReport {
            success,
            summary,
            message,
            connect,
            auth,
            read,
            write,
            file_count,
            started_at,
            total_duration_ms: elapsed_ms(start),
        }
    }
}

/// Every stage marked failed with the same reason; used when no request can be sent
fn unusable_config_report(reason: String) -> DiagnosticReport {
    let failed = |stage| StageResult::failed(stage, None, 0, reason.clone());
    let summary = DiagnosticSummary::ConnectFailure;
    DiagnosticReport {
        success: false,
        summary,
        message: format!("{}: {}", summary.message(), reason),
        connect: failed(DiagnosticStage::Connect),
        auth: failed(DiagnosticStage::Auth),
        read: failed(DiagnosticStage::Read),
        write: WriteStageResult {
            result: failed(DiagnosticStage::Write),
            probe_path: String::new(),
            cleanup: None,
            orphaned_probe: None,
        },
        file_count: None,
        started_at: Utc::now(),
        total_duration_ms: 0,
    }
}

/// Run the full pipeline for `config`. Never fails.
pub async fn run_diagnostics(config: &WebDAVConfig) -> DiagnosticReport {
    if let Err(e) = config.validate() {
        warn!("❌ Invalid WebDAV configuration: {}", e);
        return unusable_config_report(format!("Invalid configuration: {}", e));
    }

    match WebDAVClient::from_config(config) {
        Ok(client) => WebDAVDiagnostics::new(client, config).run().await,
        Err(e) => {
            warn!("❌ Could not create WebDAV client: {}", e);
            unusable_config_report(e.to_string())
        }
    }
}
