use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticStage {
    Connect,
    Auth,
    Read,
    Write,
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticStage::Connect => write!(f, "connect"),
            DiagnosticStage::Auth => write!(f, "auth"),
            DiagnosticStage::Read => write!(f, "read"),
            DiagnosticStage::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: DiagnosticStage,
    pub success: bool,
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub timed_out: bool,
    pub message: String,
}

impl StageResult {
    pub fn passed(stage: DiagnosticStage, status_code: u16, latency_ms: u64, message: String) -> Self {
        Self {
            stage,
            success: true,
            status_code: Some(status_code),
            latency_ms,
            timed_out: false,
            message,
        }
    }

    pub fn failed(stage: DiagnosticStage, status_code: Option<u16>, latency_ms: u64, message: String) -> Self {
        Self {
            stage,
            success: false,
            status_code,
            latency_ms,
            timed_out: false,
            message,
        }
    }

    pub fn timed_out(stage: DiagnosticStage, latency_ms: u64, message: String) -> Self {
        Self {
            stage,
            success: false,
            status_code: None,
            latency_ms,
            timed_out: true,
            message,
        }
    }
}

/// Outcome of deleting the write-stage probe file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupResult {
    pub success: bool,
    pub status_code: Option<u16>,
    pub message: String,
}

/// Write stage result plus its probe cleanup bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteStageResult {
    #[serde(flatten)]
    pub result: StageResult,
    pub probe_path: String,
    /// Present only when the probe write succeeded
    pub cleanup: Option<CleanupResult>,
    /// Probe left on the server because cleanup failed
    pub orphaned_probe: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSummary {
    FullSuccess,
    /// Connect, auth and read succeeded but writing is unavailable
    PartialSuccess,
    ReadFailure,
    AuthFailure,
    ConnectFailure,
}

impl DiagnosticSummary {
    pub fn message(&self) -> &'static str {
        match self {
            DiagnosticSummary::FullSuccess => "All checks passed: the server is reachable, credentials are valid, and files can be read and written",
            DiagnosticSummary::PartialSuccess => "Partial success: files can be read but writing is unavailable (read-only access)",
            DiagnosticSummary::ReadFailure => "Connected and authenticated, but the configured path could not be listed",
            DiagnosticSummary::AuthFailure => "The server is reachable but rejected the request for the configured path",
            DiagnosticSummary::ConnectFailure => "The server could not be reached",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub success: bool,
    pub summary: DiagnosticSummary,
    pub message: String,
    pub connect: StageResult,
    pub auth: StageResult,
    pub read: StageResult,
    pub write: WriteStageResult,
    /// Entries under the default path, excluding the path itself
    pub file_count: Option<usize>,
    pub started_at: DateTime<Utc>,
    pub total_duration_ms: u64,
}

impl DiagnosticReport {
    /// Write does not gate overall success; a read-only configuration is valid
    pub fn summarize(connect: &StageResult, auth: &StageResult, read: &StageResult, write: &StageResult) -> DiagnosticSummary {
        if !connect.success {
            DiagnosticSummary::ConnectFailure
        } else if !auth.success {
            DiagnosticSummary::AuthFailure
        } else if !read.success {
            DiagnosticSummary::ReadFailure
        } else if !write.success {
            DiagnosticSummary::PartialSuccess
        } else {
            DiagnosticSummary::FullSuccess
        }
    }

    pub fn stages(&self) -> [&StageResult; 4] {
        [&self.connect, &self.auth, &self.read, &self.write.result]
    }
}
