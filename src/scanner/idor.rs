//! IDOR and access-control checks: horizontal record access, file traversal and
//! vertical (unauthenticated) access to privileged pages

use crate::error::Result;
use crate::http::{HttpClient, Session};
use crate::models::{Finding, FindingKind, PageRecord, ScanConfig, Severity};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::matchers;

/// Identifiers tried for horizontal access
pub const IDOR_IDS: &[u32] = &[1, 2, 3];

/// Directory-traversal payload for the file parameter
pub const TRAVERSAL_PAYLOAD: &str = "../../../../etc/passwd";

/// Labels that only appear when a user's record is displayed
const PRIVATE_DATA_MARKERS: &[&str] = &["First name", "Message"];

fn with_query(url: &str, param: &str, value: &str) -> Option<String> {
    let mut parsed = url::Url::parse(url).ok()?;
    parsed.set_query(None);
    parsed.query_pairs_mut().append_pair(param, value);
    Some(parsed.to_string())
}

/// One finding per identifier whose response shows private record data
pub async fn check_horizontal(client: &HttpClient, url: &str, param: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    for id in IDOR_IDS {
        let id = id.to_string();
        let Some(test_url) = with_query(url, param, &id) else {
            debug!("IDOR: bad endpoint {url}");
            return findings;
        };

        match client.get(&test_url).await {
            Ok(response) => {
                if let Some(marker) =
                    matchers::private_data_marker(&response.body, PRIVATE_DATA_MARKERS)
                {
                    info!("VULNERABLE (Horizontal IDOR) -> {test_url}");
                    findings.push(
                        Finding::new(FindingKind::IdorHorizontal, &test_url, Severity::High)
                            .with_parameter(param)
                            .with_payload(&id)
                            .with_evidence(format!(
                                "User data accessed without permission ('{marker}' shown)"
                            )),
                    );
                }
            }
            Err(e) => debug!("IDOR horizontal probe failed for {test_url}: {e}"),
        }
    }

    findings
}

/// Requests a system file through the file parameter
pub async fn check_traversal(client: &HttpClient, url: &str, param: &str) -> Option<Finding> {
    let test_url = with_query(url, param, TRAVERSAL_PAYLOAD)?;

    match client.get(&test_url).await {
        Ok(response) if matchers::exposes_system_file(&response.body) => {
            info!("VULNERABLE (File traversal) -> {test_url}");
            Some(
                Finding::new(FindingKind::IdorTraversal, test_url, Severity::Critical)
                    .with_parameter(param)
                    .with_payload(TRAVERSAL_PAYLOAD)
                    .with_evidence("/etc/passwd contents returned"),
            )
        }
        Ok(_) => None,
        Err(e) => {
            debug!("IDOR traversal probe failed for {test_url}: {e}");
            None
        }
    }
}

/// Fetches a privileged page with `anonymous`, which must be a session without the
/// scan's cookies. A page without a login prompt is reachable unauthenticated.
pub async fn check_vertical(anonymous: &Session, url: &str) -> Option<Finding> {
    match anonymous.client().get(url).await {
        Ok(response) if !matchers::shows_login_prompt(&response.body) => {
            info!("VULNERABLE (Vertical access) -> {url}");
            Some(
                Finding::new(FindingKind::IdorVertical, url, Severity::High)
                    .with_evidence(format!(
                        "Protected page accessible without login (HTTP {})",
                        response.status
                    )),
            )
        }
        Ok(_) => None,
        Err(e) => {
            debug!("IDOR vertical probe failed for {url}: {e}");
            None
        }
    }
}

/// Insecure direct object reference probe
pub struct IdorScanner;

#[async_trait]
impl super::Scanner for IdorScanner {
    fn name(&self) -> &str {
        "idor"
    }

    fn description(&self) -> &str {
        "IDOR: horizontal record access, file traversal, unauthenticated privileged pages"
    }

    async fn scan(
        &self,
        session: &Session,
        config: &ScanConfig,
        _pages: &[PageRecord],
    ) -> Result<Vec<Finding>> {
        let endpoints = &config.endpoints;
        let mut findings = Vec::new();

        if session.is_authenticated() {
            let file_url = session.resolve(&endpoints.idor_file)?;
            findings.extend(
                check_traversal(session.client(), &file_url, &endpoints.idor_file_param).await,
            );

            let records_url = session.resolve(&endpoints.idor_records)?;
            findings.extend(
                check_horizontal(session.client(), &records_url, &endpoints.idor_param).await,
            );
        } else {
            warn!("IDOR: session is not authenticated, skipping horizontal and traversal checks");
        }

        let privileged_url = session.resolve(&endpoints.idor_privileged)?;
        match session.unauthenticated() {
            Ok(anonymous) => findings.extend(check_vertical(&anonymous, &privileged_url).await),
            Err(e) => warn!("IDOR: could not create unauthenticated session: {e}"),
        }

        Ok(findings)
    }
}
