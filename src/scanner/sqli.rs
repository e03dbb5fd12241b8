//! SQL injection detection (error-based, reflection, row-count and content-length delta)

use crate::error::Result;
use crate::http::{HttpClient, Session};
use crate::models::{Finding, FindingKind, PageRecord, ScanConfig, Severity, Thresholds};
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info, warn};

use super::matchers;

/// Classic metacharacter breakers, tried in order
pub const SQLI_PAYLOADS: &[&str] = &[
    "' OR '1'='1",
    "' OR 1=1 --",
    "\" OR \"1\"=\"1",
    "' UNION SELECT 1,2,3 --",
];

/// Reference response captured once per endpoint before any payload is sent
#[derive(Debug, Clone)]
pub struct Baseline {
    pub body: String,
    pub length: usize,
    pub row_markers: usize,
}

impl Baseline {
    pub fn capture(body: String, row_marker: &str) -> Self {
        let length = body.len();
        let row_markers = matchers::count_row_markers(&body, row_marker);
        Self {
            body,
            length,
            row_markers,
        }
    }
}

/// The rule that fired, in priority order
#[derive(Debug, Clone, PartialEq)]
pub enum SqliSignal {
    ErrorBased { engine: &'static str },
    Reflected,
    RowCountIncrease { baseline: usize, observed: usize },
    LengthDelta { baseline: usize, observed: usize },
}

impl fmt::Display for SqliSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqliSignal::ErrorBased { engine } => write!(f, "error-based: {engine} error signature"),
            SqliSignal::Reflected => write!(f, "reflected: payload echoed verbatim"),
            SqliSignal::RowCountIncrease { baseline, observed } => {
                write!(f, "row-count increase: {baseline} -> {observed}")
            }
            SqliSignal::LengthDelta { baseline, observed } => {
                write!(f, "content-length delta: {baseline} -> {observed} bytes")
            }
        }
    }
}

/// Applies the detection rules to one payload response. The first matching rule wins.
pub fn evaluate(
    baseline: &Baseline,
    body: &str,
    payload: &str,
    thresholds: &Thresholds,
) -> Option<SqliSignal> {
    if let Some(engine) = matchers::sql_error_signature(body) {
        return Some(SqliSignal::ErrorBased { engine });
    }

    if matchers::reflects(body, payload) {
        return Some(SqliSignal::Reflected);
    }

    let rows = matchers::count_row_markers(body, &thresholds.row_marker);
    if rows > baseline.row_markers && rows > 0 {
        return Some(SqliSignal::RowCountIncrease {
            baseline: baseline.row_markers,
            observed: rows,
        });
    }

    if matchers::length_delta_exceeds(baseline.length, body.len(), thresholds.length_delta_ratio) {
        return Some(SqliSignal::LengthDelta {
            baseline: baseline.length,
            observed: body.len(),
        });
    }

    None
}

/// Builds `endpoint?<param>=<value>&Submit=Submit`, replacing any existing query
pub fn build_test_url(endpoint: &str, param: &str, value: &str) -> Result<String> {
    let mut url = url::Url::parse(endpoint)?;
    url.set_query(None);
    url.set_fragment(None);
    url.query_pairs_mut()
        .append_pair(param, value)
        .append_pair("Submit", "Submit");
    Ok(url.to_string())
}

/// Known SQLi templates followed by crawled pages whose URL carries the SQLi marker.
/// Query strings are stripped and duplicates removed, order preserved.
pub fn candidate_endpoints(
    session: &Session,
    config: &ScanConfig,
    pages: &[PageRecord],
) -> Vec<String> {
    let endpoints = &config.endpoints;
    let mut candidates: Vec<String> = endpoints
        .sqli
        .iter()
        .filter_map(|path| session.resolve(path).ok())
        .collect();

    for page in pages {
        if !endpoints.sqli_marker.is_empty() && page.url.contains(&endpoints.sqli_marker) {
            let base = page.url.split(['?', '#']).next().unwrap_or(&page.url);
            candidates.push(base.to_string());
        }
    }

    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| seen.insert(c.clone()));
    candidates
}

/// Probes one endpoint. Returns at most one finding: the first rule that fires,
/// checking GET then POST for each payload in order.
pub async fn probe_endpoint(
    client: &HttpClient,
    endpoint: &str,
    config: &ScanConfig,
) -> Result<Option<Finding>> {
    let param = config.endpoints.sqli_param.as_str();
    let thresholds = &config.thresholds;

    let baseline_url = build_test_url(endpoint, param, &config.endpoints.sqli_baseline_value)?;
    let baseline = match client.get(&baseline_url).await {
        Ok(response) => Baseline::capture(response.body, &thresholds.row_marker),
        Err(e) => {
            debug!("SQLi: no baseline for {endpoint}, skipping endpoint: {e}");
            return Ok(None);
        }
    };
    debug!(
        "SQLi baseline for {endpoint}: {} bytes, {} row markers",
        baseline.length, baseline.row_markers
    );

    for payload in SQLI_PAYLOADS {
        let test_url = build_test_url(endpoint, param, payload)?;
        match client.get(&test_url).await {
            Ok(response) => {
                if let Some(signal) = evaluate(&baseline, &response.body, payload, thresholds) {
                    info!("VULNERABLE (SQLi, GET, {signal}) -> {test_url}");
                    return Ok(Some(sqli_finding(&test_url, param, payload, &signal, "GET")));
                }
            }
            Err(e) => debug!("SQLi GET probe failed for {test_url}: {e}"),
        }

        let form = [(param, *payload), ("Submit", "Submit")];
        match client.post_form(endpoint, &form).await {
            Ok(response) => {
                if let Some(signal) = evaluate(&baseline, &response.body, payload, thresholds) {
                    info!("VULNERABLE (SQLi, POST, {signal}) -> {endpoint} payload={payload}");
                    return Ok(Some(sqli_finding(endpoint, param, payload, &signal, "POST")));
                }
            }
            Err(e) => debug!("SQLi POST probe failed for {endpoint}: {e}"),
        }
    }

    Ok(None)
}

fn sqli_finding(
    endpoint: &str,
    param: &str,
    payload: &str,
    signal: &SqliSignal,
    method: &str,
) -> Finding {
    Finding::new(FindingKind::Sqli, endpoint, Severity::High)
        .with_parameter(param)
        .with_payload(payload)
        .with_evidence(format!("{signal} ({method})"))
}

/// SQL injection probe over known and crawled endpoints
pub struct SqliScanner;

#[async_trait]
impl super::Scanner for SqliScanner {
    fn name(&self) -> &str {
        "sqli"
    }

    fn description(&self) -> &str {
        "SQL injection: error signatures, reflection, row-count and length delta vs baseline"
    }

    async fn scan(
        &self,
        session: &Session,
        config: &ScanConfig,
        pages: &[PageRecord],
    ) -> Result<Vec<Finding>> {
        if !session.is_authenticated() {
            warn!("SQLi: session is not authenticated, skipping");
            return Ok(Vec::new());
        }

        let endpoints = candidate_endpoints(session, config, pages);
        info!("SQLi: testing {} endpoints", endpoints.len());

        let mut findings = Vec::new();
        for endpoint in &endpoints {
            match probe_endpoint(session.client(), endpoint, config).await {
                Ok(Some(finding)) => findings.push(finding),
                Ok(None) => {}
                Err(e) => warn!("SQLi: skipping {endpoint}: {e}"),
            }
        }

        Ok(findings)
    }
}
