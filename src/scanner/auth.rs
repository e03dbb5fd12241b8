//! Authentication and session management checks
//!
//! Weak/default credentials, cookie security attributes, session fixation and a
//! small bounded brute-force run. Every attempt uses its own cookie-less session so
//! the scan session is never logged out or overwritten.

use crate::error::Result;
use crate::http::auth::{attempt_login, LoginAttempt};
use crate::http::Session;
use crate::models::{Credentials, Finding, FindingKind, PageRecord, ScanConfig, Severity};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Common default pairs tried once each
pub const COMMON_CREDENTIALS: &[(&str, &str)] = &[
    ("admin", "password"),
    ("admin", "admin"),
    ("guest", "guest"),
    ("admin", "12345"),
];

/// Second list for the bounded brute-force run
pub const BRUTE_FORCE_CREDENTIALS: &[(&str, &str)] = &[
    ("admin", "123456"),
    ("admin", "pass123"),
    ("admin", "qwerty"),
    ("admin", "admin123"),
];

/// Hard ceiling on brute-force login attempts
pub const MAX_BRUTE_FORCE_ATTEMPTS: usize = 6;

/// Attacker-chosen session identifier planted before login
pub const FIXATION_SESSION_ID: &str = "fixed-session-attack";

/// Logs in on a fresh session; `None` when the session could not be created or the
/// request failed.
async fn login_on_fresh_session(
    session: &Session,
    login_url: &str,
    credentials: &Credentials,
    trigger: &str,
) -> Option<(Session, LoginAttempt)> {
    let fresh = match session.unauthenticated() {
        Ok(s) => s,
        Err(e) => {
            warn!("Auth: could not create a fresh session: {e}");
            return None;
        }
    };
    match attempt_login(fresh.client(), login_url, credentials, trigger).await {
        Ok(attempt) => Some((fresh, attempt)),
        Err(e) => {
            debug!("Auth: login attempt as '{}' failed: {e}", credentials.username);
            None
        }
    }
}

/// Tries each pair in order, stopping at the first accepted login
async fn first_accepted(
    session: &Session,
    login_url: &str,
    trigger: &str,
    pairs: &[(&str, &str)],
) -> Option<Credentials> {
    for (username, password) in pairs {
        let credentials = Credentials::new(*username, *password);
        if let Some((_, attempt)) =
            login_on_fresh_session(session, login_url, &credentials, trigger).await
        {
            if attempt.succeeded() {
                return Some(credentials);
            }
        }
    }
    None
}

/// Reports the first common credential pair the target accepts
pub async fn check_weak_credentials(
    session: &Session,
    login_url: &str,
    trigger: &str,
) -> Option<Finding> {
    let accepted = first_accepted(session, login_url, trigger, COMMON_CREDENTIALS).await?;
    info!(
        "WEAK CREDENTIALS FOUND: {}:{}",
        accepted.username, accepted.password
    );
    Some(
        Finding::new(FindingKind::AuthWeakCredentials, login_url, Severity::High)
            .with_parameter("username")
            .with_payload(format!("{}:{}", accepted.username, accepted.password))
            .with_evidence("Weak/default credentials allowed"),
    )
}

/// Inspects the Set-Cookie text of a successful login for the Secure and HttpOnly
/// attributes. Secure is matched case-sensitively, HttpOnly case-insensitively.
pub fn cookie_flag_findings(login_url: &str, set_cookies: &[String]) -> Vec<Finding> {
    let mut findings = Vec::new();
    if set_cookies.is_empty() {
        return findings;
    }

    let header = set_cookies.join(", ");
    let flag_finding = |attribute: &str| {
        Finding::new(FindingKind::AuthCookieFlags, login_url, Severity::Medium)
            .with_parameter("cookie")
            .with_payload("Set-Cookie")
            .with_evidence(format!(
                "Session cookie missing {attribute} attribute: {header}"
            ))
    };

    if !header.contains("Secure") {
        findings.push(flag_finding("Secure"));
    }
    if !header.to_lowercase().contains("httponly") {
        findings.push(flag_finding("HttpOnly"));
    }
    findings
}

/// Logs in with the configured credentials and checks the cookie attributes
pub async fn check_cookie_flags(
    session: &Session,
    login_url: &str,
    credentials: &Credentials,
    trigger: &str,
) -> Vec<Finding> {
    let Some((_, attempt)) =
        login_on_fresh_session(session, login_url, credentials, trigger).await
    else {
        return Vec::new();
    };
    if !attempt.succeeded() {
        debug!("Auth: known-good login rejected, skipping cookie flag check");
        return Vec::new();
    }

    let findings = cookie_flag_findings(login_url, &attempt.set_cookies);
    if findings.is_empty() {
        debug!("Auth: cookie flags present (or no cookies set)");
    }
    findings
}

/// Plants an attacker-chosen session id, logs in, and reports when the id survives
/// the login.
pub async fn check_session_fixation(
    session: &Session,
    login_url: &str,
    credentials: &Credentials,
    trigger: &str,
    cookie_name: &str,
) -> Option<Finding> {
    let fresh = match session.unauthenticated() {
        Ok(s) => s,
        Err(e) => {
            warn!("Auth: could not create a fresh session: {e}");
            return None;
        }
    };

    if let Err(e) = fresh
        .client()
        .set_cookie(login_url, cookie_name, FIXATION_SESSION_ID)
    {
        warn!("Auth: could not plant session cookie: {e}");
        return None;
    }

    let attempt = match attempt_login(fresh.client(), login_url, credentials, trigger).await {
        Ok(a) => a,
        Err(e) => {
            debug!("Auth: session fixation login failed: {e}");
            return None;
        }
    };
    if !attempt.succeeded() {
        debug!("Auth: login rejected, session fixation not assessed");
        return None;
    }

    let after = fresh.client().cookie_value(login_url, cookie_name);
    if after.as_deref() == Some(FIXATION_SESSION_ID) {
        info!("Session fixation possible: {cookie_name} reused after login");
        Some(
            Finding::new(FindingKind::AuthSessionFixation, login_url, Severity::High)
                .with_parameter("session")
                .with_payload(cookie_name)
                .with_evidence(format!(
                    "Server kept pre-login {cookie_name}={FIXATION_SESSION_ID} after authentication"
                )),
        )
    } else {
        debug!("Auth: session id rotated on login");
        None
    }
}

/// Bounded brute force: at most [`MAX_BRUTE_FORCE_ATTEMPTS`] logins, stopping at the first success
pub async fn check_brute_force(
    session: &Session,
    login_url: &str,
    trigger: &str,
) -> Option<Finding> {
    let limit = BRUTE_FORCE_CREDENTIALS.len().min(MAX_BRUTE_FORCE_ATTEMPTS);
    let accepted =
        first_accepted(session, login_url, trigger, &BRUTE_FORCE_CREDENTIALS[..limit]).await?;
    info!(
        "Brute-force succeeded: {}:{}",
        accepted.username, accepted.password
    );
    Some(
        Finding::new(FindingKind::AuthWeakCredentials, login_url, Severity::High)
            .with_parameter("username")
            .with_payload(format!("{}:{}", accepted.username, accepted.password))
            .with_evidence(format!(
                "Brute-force successful within {limit} attempts (no lockout)"
            )),
    )
}

/// Authentication and session management probe
pub struct AuthScanner;

#[async_trait]
impl super::Scanner for AuthScanner {
    fn name(&self) -> &str {
        "auth"
    }

    fn description(&self) -> &str {
        "Auth/session: weak credentials, cookie flags, session fixation, bounded brute force"
    }

    async fn scan(
        &self,
        session: &Session,
        config: &ScanConfig,
        _pages: &[PageRecord],
    ) -> Result<Vec<Finding>> {
        let endpoints = &config.endpoints;
        let login_url = session.resolve(&endpoints.login)?;
        let trigger = endpoints.login_trigger.as_str();
        let credentials = &config.credentials;
        let mut findings = Vec::new();

        info!("Auth: testing weak/default credentials (limited list)");
        findings.extend(check_weak_credentials(session, &login_url, trigger).await);

        info!("Auth: checking Set-Cookie flags on login");
        findings.extend(check_cookie_flags(session, &login_url, credentials, trigger).await);

        info!("Auth: testing for session fixation");
        findings.extend(
            check_session_fixation(
                session,
                &login_url,
                credentials,
                trigger,
                &endpoints.session_cookie,
            )
            .await,
        );

        info!("Auth: bounded brute-force run (max {MAX_BRUTE_FORCE_ATTEMPTS} attempts)");
        findings.extend(check_brute_force(session, &login_url, trigger).await);

        Ok(findings)
    }
}
