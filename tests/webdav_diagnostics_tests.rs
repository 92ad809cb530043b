/*
 * WebDAV diagnostic pipeline tests
 *
 * All four stages always run; the report, not an error, carries the outcome.
 */

use std::time::Duration;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use webdav_driver::models::DiagnosticSummary;
use webdav_driver::{run_diagnostics, WebDAVConfig};

const ROOT_LISTING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/</d:href>
    <d:propstat>
      <d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/Documents/</d:href>
    <d:propstat>
      <d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/readme.md</d:href>
    <d:propstat>
      <d:prop><d:getcontentlength>12</d:getcontentlength></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

const ROOT_SELF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/</d:href>
    <d:propstat>
      <d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

fn config_for(server: &MockServer) -> WebDAVConfig {
    let mut config = WebDAVConfig::new(&server.uri(), "alice", "secret");
    config.connect_timeout_seconds = 2;
    config.read_timeout_seconds = 5;
    config
}

/// Connect, auth and read all succeed
async fn mount_readable_server(server: &MockServer) {
    Mock::given(method("OPTIONS"))
        .respond_with(ResponseTemplate::new(200).insert_header("DAV", "1, 2"))
        .mount(server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/"))
        .and(header("depth", "0"))
        .respond_with(ResponseTemplate::new(207).set_body_string(ROOT_SELF))
        .mount(server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/"))
        .and(header("depth", "1"))
        .respond_with(ResponseTemplate::new(207).set_body_string(ROOT_LISTING))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_write_failure_is_partial_success() {
    let server = MockServer::start().await;
    mount_readable_server(&server).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let report = run_diagnostics(&config_for(&server)).await;

    assert!(report.success);
    assert_eq!(report.summary, DiagnosticSummary::PartialSuccess);
    assert!(report.connect.success);
    assert!(report.auth.success);
    assert!(report.read.success);
    assert_eq!(report.file_count, Some(2));

    assert!(!report.write.result.success);
    assert_eq!(report.write.result.status_code, Some(500));
    assert!(report.write.cleanup.is_none());
    assert!(report.write.orphaned_probe.is_none());
}

#[tokio::test]
async fn test_full_success_cleans_up_probe() {
    let server = MockServer::start().await;
    mount_readable_server(&server).await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/\.webdav-probe-\d+\.txt$"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/\.webdav-probe-\d+\.txt$"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let report = run_diagnostics(&config_for(&server)).await;

    assert!(report.success);
    assert_eq!(report.summary, DiagnosticSummary::FullSuccess);
    assert!(report.write.result.success);
    assert!(report.write.probe_path.starts_with("/.webdav-probe-"));
    let cleanup = report.write.cleanup.as_ref().expect("cleanup attempted");
    assert!(cleanup.success);
    assert_eq!(cleanup.status_code, Some(204));
    assert!(report.write.orphaned_probe.is_none());

    // The probe was written with a deterministic text payload
    let requests = server.received_requests().await.expect("recorded requests");
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .expect("probe upload");
    let body = String::from_utf8(put.body.clone()).expect("utf-8 probe");
    assert!(body.contains(".webdav-probe-"));
}

#[tokio::test]
async fn test_cleanup_failure_flags_orphan_without_failing_write() {
    let server = MockServer::start().await;
    mount_readable_server(&server).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let report = run_diagnostics(&config_for(&server)).await;

    assert_eq!(report.summary, DiagnosticSummary::FullSuccess);
    assert!(report.write.result.success);
    let cleanup = report.write.cleanup.as_ref().expect("cleanup attempted");
    assert!(!cleanup.success);
    assert_eq!(cleanup.status_code, Some(403));
    assert_eq!(
        report.write.orphaned_probe.as_deref(),
        Some(report.write.probe_path.as_str())
    );
}

#[tokio::test]
async fn test_auth_failure_still_runs_every_stage() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let report = run_diagnostics(&config_for(&server)).await;

    assert!(!report.success);
    assert_eq!(report.summary, DiagnosticSummary::AuthFailure);
    // 401 on OPTIONS still proves the server answered
    assert!(report.connect.success);
    assert_eq!(report.connect.status_code, Some(401));
    assert!(!report.auth.success);
    assert_eq!(report.auth.status_code, Some(401));
    assert!(report.auth.message.contains("Authentication failed"));
    assert!(report.message.contains("check username and password"));
    assert!(!report.read.success);
    assert!(!report.write.result.success);
    assert_eq!(report.file_count, None);
}

#[tokio::test]
async fn test_missing_default_path_is_not_reported_as_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.default_path = "/Documnets".to_string();
    let report = run_diagnostics(&config).await;

    assert_eq!(report.summary, DiagnosticSummary::AuthFailure);
    assert_eq!(report.auth.status_code, Some(404));
    assert!(!report.auth.message.contains("Authentication failed"));
    assert!(report.message.contains("HTTP 404"));
    assert!(!report.message.to_lowercase().contains("authentication failed"));
}

#[tokio::test]
async fn test_file_count_without_self_entry() {
    const CHILDREN_ONLY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/Documents/</d:href>
    <d:propstat>
      <d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/readme.md</d:href>
    <d:propstat>
      <d:prop><d:getcontentlength>12</d:getcontentlength></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(header("depth", "0"))
        .respond_with(ResponseTemplate::new(207).set_body_string(ROOT_SELF))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(header("depth", "1"))
        .respond_with(ResponseTemplate::new(207).set_body_string(CHILDREN_ONLY))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let report = run_diagnostics(&config_for(&server)).await;

    assert!(report.read.success);
    assert_eq!(report.file_count, Some(2));
}

#[tokio::test]
async fn test_unreachable_server_reports_connect_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let mut config = WebDAVConfig::new(&format!("http://127.0.0.1:{}", port), "alice", "secret");
    config.connect_timeout_seconds = 2;
    config.read_timeout_seconds = 2;

    let report = run_diagnostics(&config).await;

    assert!(!report.success);
    assert_eq!(report.summary, DiagnosticSummary::ConnectFailure);
    for stage in report.stages() {
        assert!(!stage.success);
        assert_eq!(stage.status_code, None);
    }
}

#[tokio::test]
async fn test_slow_read_times_out_only_that_stage() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(header("depth", "0"))
        .respond_with(ResponseTemplate::new(207).set_body_string(ROOT_SELF))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(header("depth", "1"))
        .respond_with(
            ResponseTemplate::new(207)
                .set_body_string(ROOT_LISTING)
                .set_delay(Duration::from_secs(4)),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.read_timeout_seconds = 1;

    let report = run_diagnostics(&config).await;

    assert!(report.connect.success);
    assert!(report.auth.success);
    assert!(!report.read.success);
    assert!(report.read.timed_out);
    assert!(report.write.result.success);
    assert_eq!(report.summary, DiagnosticSummary::ReadFailure);
    assert!(!report.success);
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let server = MockServer::start().await;
    mount_readable_server(&server).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let report = run_diagnostics(&config_for(&server)).await;
    let json = serde_json::to_value(&report).expect("serialize report");

    assert_eq!(json["summary"], "partial_success");
    assert_eq!(json["file_count"], 2);
    assert_eq!(json["write"]["stage"], "write");
    assert_eq!(json["write"]["status_code"], 403);
    assert!(json["write"]["probe_path"].is_string());
}
