//! XSS detection (reflected, stored, DOM sink patterns)
//!
//! The three classes live on functionally distinct endpoints, so each endpoint is
//! classified by URL naming convention rather than by content.

use crate::error::Result;
use crate::http::{HttpClient, Session};
use crate::models::{EndpointTemplates, Finding, FindingKind, PageRecord, ScanConfig, Severity};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::matchers;

/// Script/markup payloads, tried in order
pub const XSS_PAYLOADS: &[&str] = &[
    "<script>alert(1)</script>",
    "'\"><script>alert(1)</script>",
    "<svg/onload=alert('XSS')>",
    "<img src=x onerror=alert(1)>",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XssEndpointKind {
    Reflected,
    Stored,
    Dom,
}

impl XssEndpointKind {
    /// Classifies a URL by the configured naming markers
    pub fn classify(url: &str, endpoints: &EndpointTemplates) -> Option<Self> {
        let matches = |marker: &str| !marker.is_empty() && url.contains(marker);
        if matches(&endpoints.xss_reflected_marker) {
            Some(Self::Reflected)
        } else if matches(&endpoints.xss_stored_marker) {
            Some(Self::Stored)
        } else if matches(&endpoints.xss_dom_marker) {
            Some(Self::Dom)
        } else {
            None
        }
    }
}

/// Known XSS templates plus crawled pages matching any XSS marker, each classified once
pub fn candidate_endpoints(
    session: &Session,
    config: &ScanConfig,
    pages: &[PageRecord],
) -> Vec<(String, XssEndpointKind)> {
    let endpoints = &config.endpoints;
    let templates = [
        (&endpoints.xss_reflected, XssEndpointKind::Reflected),
        (&endpoints.xss_stored, XssEndpointKind::Stored),
        (&endpoints.xss_dom, XssEndpointKind::Dom),
    ];

    let mut candidates: Vec<(String, XssEndpointKind)> = templates
        .iter()
        .filter(|(path, _)| !path.is_empty())
        .filter_map(|(path, kind)| session.resolve(path).ok().map(|u| (u, *kind)))
        .collect();

    for page in pages {
        let base = page.url.split(['?', '#']).next().unwrap_or(&page.url);
        if let Some(kind) = XssEndpointKind::classify(base, endpoints) {
            candidates.push((base.to_string(), kind));
        }
    }

    let mut seen = std::collections::HashSet::new();
    candidates.retain(|(url, _)| seen.insert(url.clone()));
    candidates
}

/// GETs each payload in `param`; the first verbatim echo produces the finding
pub async fn check_reflected(client: &HttpClient, url: &str, param: &str) -> Option<Finding> {
    for payload in XSS_PAYLOADS {
        let test_url = match url::Url::parse(url) {
            Ok(mut u) => {
                u.set_query(None);
                u.query_pairs_mut()
                    .append_pair(param, payload)
                    .append_pair("Submit", "Submit");
                u.to_string()
            }
            Err(e) => {
                debug!("XSS: bad endpoint {url}: {e}");
                return None;
            }
        };

        match client.get(&test_url).await {
            Ok(response) if matchers::reflects(&response.body, payload) => {
                info!("VULNERABLE (Reflected XSS) -> {test_url}");
                return Some(
                    Finding::new(FindingKind::XssReflected, test_url, Severity::High)
                        .with_parameter(param)
                        .with_payload(*payload)
                        .with_evidence("Payload reflected verbatim in response"),
                );
            }
            Ok(_) => {}
            Err(e) => debug!("XSS reflected probe failed for {test_url}: {e}"),
        }
    }
    None
}

/// POSTs each payload into every free-text field, then reloads the page. The first
/// payload that survives the reload produces the finding.
///
/// Submissions persist on the target; that is the detection mechanism.
pub async fn check_stored(
    client: &HttpClient,
    url: &str,
    fields: &[String],
    submit: &(String, String),
) -> Option<Finding> {
    if fields.is_empty() {
        return None;
    }

    for payload in XSS_PAYLOADS {
        let mut form: Vec<(&str, &str)> = fields.iter().map(|f| (f.as_str(), *payload)).collect();
        if !submit.0.is_empty() {
            form.push((submit.0.as_str(), submit.1.as_str()));
        }

        if let Err(e) = client.post_form(url, &form).await {
            debug!("XSS stored submission failed for {url}: {e}");
            continue;
        }

        match client.get(url).await {
            Ok(response) if matchers::reflects(&response.body, payload) => {
                info!("VULNERABLE (Stored XSS) -> {url}");
                return Some(
                    Finding::new(FindingKind::XssStored, url, Severity::High)
                        .with_parameter(fields.join("/"))
                        .with_payload(*payload)
                        .with_evidence("Stored payload served unescaped on reload"),
                );
            }
            Ok(_) => {}
            Err(e) => debug!("XSS stored reload failed for {url}: {e}"),
        }
    }
    None
}

/// Fetches the page once and reports dangerous client-side sinks as one finding
pub async fn check_dom(client: &HttpClient, url: &str) -> Option<Finding> {
    let response = match client.get(url).await {
        Ok(r) => r,
        Err(e) => {
            debug!("XSS DOM fetch failed for {url}: {e}");
            return None;
        }
    };

    let sinks = matchers::find_dom_sinks(&response.body);
    if sinks.is_empty() {
        return None;
    }

    info!("VULNERABLE (DOM XSS sinks: {}) -> {url}", sinks.join(", "));
    Some(
        Finding::new(FindingKind::XssDom, url, Severity::Medium)
            .with_evidence(format!("Dangerous DOM sink detected: {}", sinks.join(", "))),
    )
}

/// Cross-site scripting probe
pub struct XssScanner;

#[async_trait]
impl super::Scanner for XssScanner {
    fn name(&self) -> &str {
        "xss"
    }

    fn description(&self) -> &str {
        "Cross-site scripting: reflected, stored and DOM sink checks"
    }

    async fn scan(
        &self,
        session: &Session,
        config: &ScanConfig,
        pages: &[PageRecord],
    ) -> Result<Vec<Finding>> {
        if !session.is_authenticated() {
            warn!("XSS: session is not authenticated, skipping");
            return Ok(Vec::new());
        }

        let endpoints = candidate_endpoints(session, config, pages);
        info!("XSS: testing {} endpoints", endpoints.len());

        let client = session.client();
        let templates = &config.endpoints;
        let mut findings = Vec::new();

        for (url, kind) in &endpoints {
            let finding = match kind {
                XssEndpointKind::Reflected => {
                    check_reflected(client, url, &templates.xss_reflected_param).await
                }
                XssEndpointKind::Stored => {
                    check_stored(
                        client,
                        url,
                        &templates.xss_stored_fields,
                        &templates.xss_stored_submit,
                    )
                    .await
                }
                XssEndpointKind::Dom => check_dom(client, url).await,
            };
            findings.extend(finding);
        }

        Ok(findings)
    }
}
