//! Core data models for webprobe

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder for finding fields that do not apply
pub const NOT_APPLICABLE: &str = "N/A";

/// Severity level for security findings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "Critical"),
            Severity::High => write!(f, "High"),
            Severity::Medium => write!(f, "Medium"),
            Severity::Low => write!(f, "Low"),
        }
    }
}

impl Severity {
    /// Parses a severity name, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }
}

/// Vulnerability class that produced a finding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FindingKind {
    #[serde(rename = "SQLi")]
    Sqli,
    #[serde(rename = "XSSReflected")]
    XssReflected,
    #[serde(rename = "XSSStored")]
    XssStored,
    #[serde(rename = "XSSDom")]
    XssDom,
    #[serde(rename = "IDORHorizontal")]
    IdorHorizontal,
    #[serde(rename = "IDORVertical")]
    IdorVertical,
    #[serde(rename = "IDORTraversal")]
    IdorTraversal,
    AuthWeakCredentials,
    AuthCookieFlags,
    AuthSessionFixation,
}

impl FindingKind {
    /// Every vulnerability class, in report order
    pub const ALL: [FindingKind; 10] = [
        FindingKind::Sqli,
        FindingKind::XssReflected,
        FindingKind::XssStored,
        FindingKind::XssDom,
        FindingKind::IdorHorizontal,
        FindingKind::IdorVertical,
        FindingKind::IdorTraversal,
        FindingKind::AuthWeakCredentials,
        FindingKind::AuthCookieFlags,
        FindingKind::AuthSessionFixation,
    ];

    /// Remediation guidance for this vulnerability class
    pub fn mitigation(&self) -> &'static str {
        match self {
            FindingKind::Sqli => {
                "Use prepared statements, parameterized queries and input validation."
            }
            FindingKind::XssReflected => {
                "Sanitize user input, implement HTML encoding and enable Content Security Policy (CSP)."
            }
            FindingKind::XssStored => {
                "Store clean input only, use output encoding and server-side filtering."
            }
            FindingKind::XssDom => "Avoid writing raw user input to DOM, use safe JavaScript methods.",
            FindingKind::IdorHorizontal => {
                "Implement access control checks before serving user-specific data."
            }
            FindingKind::IdorVertical => "Ensure privilege-level checks on sensitive endpoints.",
            FindingKind::IdorTraversal => {
                "Validate file paths, restrict directory access and disable direct file includes."
            }
            FindingKind::AuthWeakCredentials
            | FindingKind::AuthCookieFlags
            | FindingKind::AuthSessionFixation => {
                "Enforce strong password policy, lockout mechanism and 2FA."
            }
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FindingKind::Sqli => "SQLi",
            FindingKind::XssReflected => "XSSReflected",
            FindingKind::XssStored => "XSSStored",
            FindingKind::XssDom => "XSSDom",
            FindingKind::IdorHorizontal => "IDORHorizontal",
            FindingKind::IdorVertical => "IDORVertical",
            FindingKind::IdorTraversal => "IDORTraversal",
            FindingKind::AuthWeakCredentials => "AuthWeakCredentials",
            FindingKind::AuthCookieFlags => "AuthCookieFlags",
            FindingKind::AuthSessionFixation => "AuthSessionFixation",
        };
        write!(f, "{name}")
    }
}

/// A security finding: the six-field record handed to reporting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    /// Vulnerability class
    pub module: FindingKind,
    /// Affected URL
    pub endpoint: String,
    /// Injected parameter, or "N/A"
    pub parameter: String,
    /// Payload that triggered the detection, or "N/A"
    pub payload: String,
    /// Human-readable description of the signal
    pub evidence: String,
    pub severity: Severity,
}

impl Finding {
    /// Creates a new Finding with parameter and payload set to "N/A"
    pub fn new(module: FindingKind, endpoint: impl Into<String>, severity: Severity) -> Self {
        Self {
            module,
            endpoint: endpoint.into(),
            parameter: NOT_APPLICABLE.to_string(),
            payload: NOT_APPLICABLE.to_string(),
            evidence: String::new(),
            severity,
        }
    }

    /// Sets the injected parameter
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = parameter.into();
        self
    }

    /// Sets the payload
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Sets the evidence for this finding
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }
}

/// A form found on a crawled page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormDescriptor {
    /// Absolute action URL, resolved against the page URL
    pub action: String,
    /// "GET" or "POST"
    pub method: String,
    /// Named input fields in document order
    pub inputs: Vec<String>,
}

impl FormDescriptor {
    pub fn is_post(&self) -> bool {
        self.method == "POST"
    }
}

/// One crawled resource. Created once per unique URL, never modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRecord {
    pub url: String,
    pub forms: Vec<FormDescriptor>,
    /// Outbound links, same-origin and cross-origin
    pub links: Vec<String>,
}

/// Outcome of the login phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AuthStatus {
    #[default]
    Unauthenticated,
    Authenticated,
    Failed { reason: String },
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStatus::Unauthenticated => write!(f, "unauthenticated"),
            AuthStatus::Authenticated => write!(f, "authenticated"),
            AuthStatus::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}

/// Result of a complete scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Target URL
    pub target: String,
    /// Unique scan identifier
    pub scan_id: String,
    /// Scan start time (local timezone)
    pub started_at: DateTime<Local>,
    /// Scan end time (local timezone)
    pub finished_at: Option<DateTime<Local>>,
    /// Login outcome for the scan session
    pub auth_status: AuthStatus,
    /// Crawl output
    pub pages: Vec<PageRecord>,
    /// All findings, in emission order
    pub findings: Vec<Finding>,
    /// Names of modules that were executed
    pub modules_executed: Vec<String>,
    /// Total HTTP requests made
    pub total_requests: u64,
    /// Remediation guidance for each vulnerability class that was found
    #[serde(default)]
    pub mitigations: BTreeMap<String, String>,
}

impl ScanResult {
    /// Creates a new ScanResult
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            scan_id: uuid::Uuid::new_v4().to_string(),
            started_at: Local::now(),
            finished_at: None,
            auth_status: AuthStatus::Unauthenticated,
            pages: Vec::new(),
            findings: Vec::new(),
            modules_executed: Vec::new(),
            total_requests: 0,
            mitigations: BTreeMap::new(),
        }
    }

    /// Returns count of findings by severity
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    /// Marks the scan as finished and collects guidance for the classes found
    pub fn finish(&mut self) {
        self.mitigations = self
            .findings
            .iter()
            .map(|f| (f.module.to_string(), f.module.mitigation().to_string()))
            .collect();
        self.finished_at = Some(Local::now());
    }
}

/// Login credentials for the target application
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new("admin", "password")
    }
}

/// Target-specific endpoint knowledge. Paths are relative to the target base URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointTemplates {
    /// Login form path
    pub login: String,
    /// Name of the submit field sent with every login
    pub login_trigger: String,
    /// CSS selector for links in the post-login navigation menu
    pub menu_selector: String,
    /// Known SQL injection endpoints
    pub sqli: Vec<String>,
    /// Crawled URLs containing this substring are also SQLi candidates
    pub sqli_marker: String,
    pub sqli_param: String,
    /// Benign identifier used for the baseline request
    pub sqli_baseline_value: String,
    pub xss_reflected: String,
    pub xss_stored: String,
    pub xss_dom: String,
    /// URL substrings classifying crawled pages as reflected/stored/DOM endpoints
    pub xss_reflected_marker: String,
    pub xss_stored_marker: String,
    pub xss_dom_marker: String,
    pub xss_reflected_param: String,
    /// Free-text fields of the stored XSS form
    pub xss_stored_fields: Vec<String>,
    /// Submit field (name, value) of the stored XSS form
    pub xss_stored_submit: (String, String),
    /// Page that echoes per-record user data
    pub idor_records: String,
    pub idor_param: String,
    pub idor_file: String,
    pub idor_file_param: String,
    /// Page that should require authentication
    pub idor_privileged: String,
    /// Session identifier cookie name
    pub session_cookie: String,
}

impl Default for EndpointTemplates {
    fn default() -> Self {
        Self {
            login: "/login.php".to_string(),
            login_trigger: "Login".to_string(),
            menu_selector: "div#main_menu a[href]".to_string(),
            sqli: vec![
                "/vulnerabilities/sqli/".to_string(),
                "/vulnerabilities/sqli_blind/".to_string(),
            ],
            sqli_marker: "sqli".to_string(),
            sqli_param: "id".to_string(),
            sqli_baseline_value: "1".to_string(),
            xss_reflected: "/vulnerabilities/xss_r/".to_string(),
            xss_stored: "/vulnerabilities/xss_s/".to_string(),
            xss_dom: "/vulnerabilities/xss_d/".to_string(),
            xss_reflected_marker: "xss_r".to_string(),
            xss_stored_marker: "xss_s".to_string(),
            xss_dom_marker: "xss_d".to_string(),
            xss_reflected_param: "name".to_string(),
            xss_stored_fields: vec!["txtName".to_string(), "mtxMessage".to_string()],
            xss_stored_submit: ("btnSign".to_string(), "Sign Guestbook".to_string()),
            idor_records: "/vulnerabilities/xss_s/".to_string(),
            idor_param: "id".to_string(),
            idor_file: "/vulnerabilities/fi/".to_string(),
            idor_file_param: "page".to_string(),
            idor_privileged: "/vulnerabilities/exec/".to_string(),
            session_cookie: "PHPSESSID".to_string(),
        }
    }
}

/// Calibration constants for delta-based detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    /// Substring expected once per returned data row
    pub row_marker: String,
    /// Relative content-length change that counts as a shape change
    pub length_delta_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            row_marker: "First name".to_string(),
            length_delta_ratio: 0.30,
        }
    }
}

/// Configuration for a scan session, built once and passed by reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Target base URL
    pub target: String,
    pub credentials: Credentials,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum simultaneous in-flight requests
    pub concurrency: usize,
    /// Attempts per request (1 = no retry)
    pub retries: u32,
    /// User-Agent header value
    pub user_agent: String,
    /// Whether to follow HTTP redirects
    pub follow_redirects: bool,
    /// Maximum crawl depth
    pub max_depth: u32,
    /// Upper bound on crawled pages
    pub max_pages: usize,
    /// Extra crawl seeds, relative to the target
    #[serde(default)]
    pub seeds: Vec<String>,
    /// List of probe modules to execute
    pub modules: Vec<String>,
    /// Run probe modules concurrently
    #[serde(default)]
    pub concurrent: bool,
    #[serde(default)]
    pub endpoints: EndpointTemplates,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: "http://localhost".to_string(),
            credentials: Credentials::default(),
            timeout_secs: 6,
            concurrency: 4,
            retries: 1,
            user_agent: "webprobe/0.1.0".to_string(),
            follow_redirects: true,
            max_depth: 2,
            max_pages: 500,
            seeds: Vec::new(),
            modules: vec![
                "sqli".to_string(),
                "xss".to_string(),
                "auth".to_string(),
                "idor".to_string(),
            ],
            concurrent: false,
            endpoints: EndpointTemplates::default(),
            thresholds: Thresholds::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_mitigation() {
        for kind in FindingKind::ALL {
            assert!(
                !kind.mitigation().trim().is_empty(),
                "{kind} has no mitigation"
            );
        }
        assert_eq!(
            FindingKind::AuthCookieFlags.mitigation(),
            FindingKind::AuthWeakCredentials.mitigation()
        );
    }

    #[test]
    fn test_finish_collects_mitigations_per_class() {
        let mut result = ScanResult::new("http://t");
        result.findings = vec![
            Finding::new(FindingKind::Sqli, "http://t/a", Severity::High),
            Finding::new(FindingKind::Sqli, "http://t/b", Severity::High),
            Finding::new(FindingKind::XssDom, "http://t/c", Severity::Medium),
        ];
        result.finish();

        assert!(result.finished_at.is_some());
        assert_eq!(result.mitigations.len(), 2);
        assert_eq!(
            result.mitigations.get("SQLi").map(String::as_str),
            Some(FindingKind::Sqli.mitigation())
        );
        assert!(result.mitigations.contains_key("XSSDom"));
    }

    #[test]
    fn test_finding_defaults_to_not_applicable() {
        let f = Finding::new(FindingKind::XssDom, "http://t/x", Severity::Medium);
        assert_eq!(f.parameter, "N/A");
        assert_eq!(f.payload, "N/A");
    }

    #[test]
    fn test_finding_kind_serializes_with_schema_names() {
        let json = serde_json::to_string(&FindingKind::IdorTraversal).expect("serialize");
        assert_eq!(json, "\"IDORTraversal\"");
        assert_eq!(FindingKind::Sqli.to_string(), "SQLi");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("admin", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_severity_parse_and_order() {
        assert_eq!(Severity::parse("HIGH"), Some(Severity::High));
        assert_eq!(Severity::parse("info"), None);
        assert!(Severity::Critical < Severity::Low);
    }
}
