/*!
 * WebDAV Diagnostic Tool
 *
 * Runs the connect/auth/read/write pipeline against a WebDAV server and
 * prints a per-stage report. Configuration comes from WEBDAV_* environment
 * variables (a .env file is loaded first); command line flags override them.
 */

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use webdav_driver::models::{DiagnosticReport, StageResult};
use webdav_driver::{run_diagnostics, WebDAVConfig};

#[derive(Parser)]
#[command(name = "webdav-diagnose")]
#[command(about = "Check connectivity, credentials and permissions of a WebDAV server")]
struct Args {
    /// Server URL (overrides WEBDAV_SERVER_URL)
    #[arg(long)]
    server_url: Option<String>,

    /// Username (overrides WEBDAV_USERNAME)
    #[arg(short, long)]
    username: Option<String>,

    /// Password (overrides WEBDAV_PASSWORD)
    #[arg(short, long)]
    password: Option<String>,

    /// nextcloud, owncloud or generic (overrides WEBDAV_SERVER_TYPE)
    #[arg(long)]
    server_type: Option<String>,

    /// Path used by the auth, read and write checks
    #[arg(long)]
    path: Option<String>,

    /// Connect timeout in seconds
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Read timeout in seconds
    #[arg(long)]
    read_timeout: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Env-backed lookup where flags take precedence
    fn lookup(&self, key: &str) -> Option<String> {
        let flag = match key {
            "WEBDAV_SERVER_URL" => self.server_url.clone(),
            "WEBDAV_USERNAME" => self.username.clone(),
            "WEBDAV_PASSWORD" => self.password.clone(),
            "WEBDAV_SERVER_TYPE" => self.server_type.clone(),
            "WEBDAV_DEFAULT_PATH" => self.path.clone(),
            "WEBDAV_CONNECT_TIMEOUT_SECONDS" => self.connect_timeout.map(|s| s.to_string()),
            "WEBDAV_READ_TIMEOUT_SECONDS" => self.read_timeout.map(|s| s.to_string()),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    }
}

fn print_stage(stage: &StageResult) {
    let marker = if stage.success { "✅" } else if stage.timed_out { "⏱️" } else { "❌" };
    let status = stage
        .status_code
        .map(|code| format!("HTTP {}", code))
        .unwrap_or_else(|| "no response".to_string());
    println!(
        "{} {:<8} {:>6}ms  {:<12} {}",
        marker,
        stage.stage.to_string(),
        stage.latency_ms,
        status,
        stage.message
    );
}

fn print_report(report: &DiagnosticReport) {
    println!("WebDAV diagnostics ({})", report.started_at.to_rfc3339());
    for stage in report.stages() {
        print_stage(stage);
    }
    if let Some(count) = report.file_count {
        println!("   {} entries under the configured path", count);
    }
    if let Some(cleanup) = &report.write.cleanup {
        println!("   probe cleanup: {}", cleanup.message);
    }
    if let Some(orphan) = &report.write.orphaned_probe {
        println!("⚠️  probe file left on server: {}", orphan);
    }
    println!();
    println!("{} ({}ms)", report.message, report.total_duration_ms);
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = WebDAVConfig::from_lookup(|key| args.lookup(key))?;

    let report = run_diagnostics(&config).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}
