//! Integration tests for config loading and report export

use std::path::Path;
use webprobe::config;
use webprobe::models::{Finding, FindingKind, PageRecord, Severity};
use webprobe::report;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("webprobe_{}_{name}", uuid::Uuid::new_v4()))
}

#[test]
fn test_shipped_default_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
    let config = config::load_config(&path).expect("default.toml should parse");

    assert_eq!(config.modules, vec!["sqli", "xss", "auth", "idor"]);
    assert_eq!(config.endpoints.login, "/login.php");
    assert_eq!(config.thresholds.length_delta_ratio, 0.30);
}

#[test]
fn test_missing_config_is_io_error() {
    let result = config::load_config(Path::new("/nonexistent/webprobe.toml"));
    assert!(matches!(result, Err(webprobe::error::WebProbeError::IoError(_))));
}

#[test]
fn test_csv_export_preserves_emission_order() {
    let findings = vec![
        Finding::new(FindingKind::AuthCookieFlags, "http://t/login.php", Severity::Medium)
            .with_evidence("Session cookie missing Secure attribute"),
        Finding::new(FindingKind::Sqli, "http://t/vulnerabilities/sqli/", Severity::High)
            .with_parameter("id")
            .with_payload("' OR '1'='1"),
    ];

    let path = temp_path("findings.csv");
    report::csv::export(&findings, &path).expect("export");
    let text = std::fs::read_to_string(&path).expect("read");
    std::fs::remove_file(&path).ok();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "module,endpoint,parameter,payload,evidence,severity");
    assert!(lines[1].starts_with("AuthCookieFlags,"));
    assert!(lines[2].starts_with("SQLi,"));
    assert!(lines[2].ends_with(",High"));
}

#[test]
fn test_export_pages_writes_array() {
    let pages = vec![PageRecord {
        url: "http://t/index.php".to_string(),
        forms: Vec::new(),
        links: vec!["http://t/about.php".to_string()],
    }];

    let path = temp_path("pages.json");
    report::json::export_pages(&pages, &path).expect("export");
    let raw = std::fs::read_to_string(&path).expect("read");
    std::fs::remove_file(&path).ok();

    let parsed: Vec<PageRecord> = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(parsed, pages);
}
