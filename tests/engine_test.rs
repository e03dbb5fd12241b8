//! Integration tests for the scan engine and finding aggregation

mod common;

use async_trait::async_trait;
use common::{mount_login, new_session, test_config};
use std::sync::Arc;
use std::time::Duration;
use webprobe::error::Result;
use webprobe::http::Session;
use webprobe::models::{AuthStatus, Finding, FindingKind, PageRecord, ScanConfig, Severity};
use webprobe::scanner::{ScanEngine, Scanner};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test module that answers after a fixed delay with one finding
struct DelayedScanner {
    name: &'static str,
    delay_ms: u64,
    kind: FindingKind,
}

#[async_trait]
impl Scanner for DelayedScanner {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "test scanner"
    }

    async fn scan(
        &self,
        _session: &Session,
        _config: &ScanConfig,
        _pages: &[PageRecord],
    ) -> Result<Vec<Finding>> {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(vec![Finding::new(self.kind, self.name, Severity::Low)])
    }
}

fn delayed_engine() -> ScanEngine {
    let mut engine = ScanEngine::new();
    engine.register(Arc::new(DelayedScanner {
        name: "slow",
        delay_ms: 300,
        kind: FindingKind::Sqli,
    }));
    engine.register(Arc::new(DelayedScanner {
        name: "fast",
        delay_ms: 0,
        kind: FindingKind::XssDom,
    }));
    engine
}

#[tokio::test]
async fn test_concurrent_probe_keeps_registration_order() {
    let mut config = test_config("http://127.0.0.1:9");
    config.modules = vec!["fast".to_string(), "slow".to_string()];
    config.concurrent = true;
    let session = new_session(&config);

    let aggregator = delayed_engine().probe(&session, &config, &[]).await;

    let kinds: Vec<FindingKind> = aggregator.findings().iter().map(|f| f.module).collect();
    assert_eq!(kinds, vec![FindingKind::Sqli, FindingKind::XssDom]);
    assert_eq!(aggregator.modules_executed(), &["slow", "fast"]);
}

#[tokio::test]
async fn test_probe_runs_only_enabled_modules() {
    let mut config = test_config("http://127.0.0.1:9");
    config.modules = vec!["fast".to_string()];
    let session = new_session(&config);

    let aggregator = delayed_engine().probe(&session, &config, &[]).await;

    assert_eq!(aggregator.len(), 1);
    assert_eq!(aggregator.modules_executed(), &["fast"]);
}

async fn mount_target(server: &MockServer) {
    mount_login(server, "PHPSESSID=s1; path=/; HttpOnly").await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div id="main_menu">
                 <a href="vulnerabilities/xss_d/">DOM XSS</a>
                 <a href="logout.php">Logout</a>
               </div>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vulnerabilities/xss_d/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<script>document.write('<option>' + location.hash + '</option>');</script>",
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vulnerabilities/fi/"))
        .and(query_param("page", "../../../../etc/passwd"))
        .respond_with(ResponseTemplate::new(200).set_body_string("root:x:0:0:root:/root:/bin/bash"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vulnerabilities/exec/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Username Password Login"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/logout.php"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

async fn run_scan(concurrent: bool) -> webprobe::models::ScanResult {
    let mock_server = MockServer::start().await;
    mount_target(&mock_server).await;

    let mut config = test_config(&mock_server.uri());
    config.modules = vec!["xss".to_string(), "idor".to_string()];
    config.concurrent = concurrent;

    let engine = ScanEngine::with_defaults();
    engine.validate_modules(&config).expect("known modules");
    engine.run(&config).await.expect("scan")
}

#[tokio::test]
async fn test_full_run_pipeline() {
    let result = run_scan(false).await;

    assert_eq!(result.auth_status, AuthStatus::Authenticated);
    assert_eq!(result.pages.len(), 1);
    assert!(result.pages[0].url.ends_with("/vulnerabilities/xss_d/"));
    assert_eq!(result.modules_executed, vec!["xss", "idor"]);

    let kinds: Vec<FindingKind> = result.findings.iter().map(|f| f.module).collect();
    assert_eq!(kinds, vec![FindingKind::XssDom, FindingKind::IdorTraversal]);
    assert!(result.total_requests > 0);
    assert!(result.finished_at.is_some());

    let classes: Vec<&str> = result.mitigations.keys().map(String::as_str).collect();
    assert_eq!(classes, vec!["IDORTraversal", "XSSDom"]);
}

#[tokio::test]
async fn test_full_run_same_order_when_concurrent() {
    let sequential = run_scan(false).await;
    let concurrent = run_scan(true).await;

    // Endpoints embed each mock server's port, so compare everything else
    let summarize = |findings: &[Finding]| -> Vec<(FindingKind, String, Severity)> {
        findings
            .iter()
            .map(|f| (f.module, f.payload.clone(), f.severity))
            .collect()
    };
    assert_eq!(
        summarize(&sequential.findings),
        summarize(&concurrent.findings)
    );
    assert_eq!(sequential.modules_executed, concurrent.modules_executed);
}

#[tokio::test]
async fn test_run_with_failed_login_still_completes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form></form>"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vulnerabilities/exec/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Login"))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let result = ScanEngine::with_defaults()
        .run(&config)
        .await
        .expect("failed login is not fatal");

    assert!(matches!(result.auth_status, AuthStatus::Failed { .. }));
    assert_eq!(result.modules_executed, vec!["sqli", "xss", "auth", "idor"]);
    let requires_login = |kind: FindingKind| {
        matches!(
            kind,
            FindingKind::Sqli
                | FindingKind::XssReflected
                | FindingKind::XssStored
                | FindingKind::XssDom
                | FindingKind::IdorHorizontal
                | FindingKind::IdorTraversal
        )
    };
    assert!(result.findings.iter().all(|f| !requires_login(f.module)));
}
