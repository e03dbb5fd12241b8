//! Form login with anti-forgery token replay

use crate::error::Result;
use crate::http::{HttpClient, HttpResponse, Session};
use crate::models::{AuthStatus, Credentials};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

/// Login success oracle shared by every component that needs to confirm
/// authentication state.
///
/// Heuristic: a "logout" link is shown and no "login failed" banner is present.
/// False positive when a public page mentions logout; false negative when the
/// target labels its sign-out control differently.
pub fn login_succeeded(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("logout") && !lower.contains("login failed")
}

/// Finds the first input whose name contains "token" (case-insensitive) and
/// returns its name and current value.
pub fn find_token_field(html: &str) -> Option<(String, String)> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("input[name]").ok()?;

    document.select(&selector).find_map(|input| {
        let name = input.value().attr("name")?;
        if !name.to_lowercase().contains("token") {
            return None;
        }
        let value = input.value().attr("value").unwrap_or("");
        Some((name.to_string(), value.to_string()))
    })
}

/// Outcome of one login exchange (form fetch + credential POST)
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    /// Response to the credential POST
    pub response: HttpResponse,
    /// `Set-Cookie` lines seen on the form fetch and the POST, in order
    pub set_cookies: Vec<String>,
}

impl LoginAttempt {
    pub fn succeeded(&self) -> bool {
        login_succeeded(&self.response.body)
    }
}

/// Performs one token-replaying login POST: fetch the form, capture the token,
/// submit credentials. Cookies from both requests land in the client's jar.
pub async fn attempt_login(
    client: &HttpClient,
    login_url: &str,
    credentials: &Credentials,
    trigger: &str,
) -> Result<LoginAttempt> {
    let page = client.get(login_url).await?;
    let token = find_token_field(&page.body);
    debug!(
        "Login form token field: {:?}",
        token.as_ref().map(|(name, _)| name)
    );

    let mut form: Vec<(&str, &str)> = vec![
        ("username", credentials.username.as_str()),
        ("password", credentials.password.as_str()),
        (trigger, trigger),
    ];
    if let Some((ref name, ref value)) = token {
        form.push((name.as_str(), value.as_str()));
    }

    let response = client.post_form(login_url, &form).await?;
    let mut set_cookies = page.set_cookies;
    set_cookies.extend(response.set_cookies.iter().cloned());

    Ok(LoginAttempt {
        response,
        set_cookies,
    })
}

/// Logs the session in. Never fails: transport errors and rejected credentials are
/// reported through the returned session's [`AuthStatus`].
pub async fn authenticate(
    session: Session,
    login_path: &str,
    credentials: &Credentials,
    trigger: &str,
) -> Session {
    let login_url = match session.resolve(login_path) {
        Ok(u) => u,
        Err(e) => {
            warn!("Invalid login path '{login_path}': {e}");
            return session.with_status(AuthStatus::Failed {
                reason: format!("invalid login path: {e}"),
            });
        }
    };

    info!("Performing form-based authentication to {login_url}");

    let mut reason = match attempt_login(session.client(), &login_url, credentials, trigger).await
    {
        Ok(attempt) if attempt.succeeded() => {
            info!("Login successful as '{}'", credentials.username);
            return session.with_status(AuthStatus::Authenticated);
        }
        Ok(attempt) => format!("login rejected (HTTP {})", attempt.response.status),
        Err(e) => format!("login request failed: {e}"),
    };

    // Some targets only accept credentials in the query string
    debug!("POST login did not succeed ({reason}), retrying as GET");
    let query = [
        ("username", credentials.username.as_str()),
        ("password", credentials.password.as_str()),
        (trigger, trigger),
    ];
    match session.client().get_with_query(&login_url, &query).await {
        Ok(response) if login_succeeded(&response.body) => {
            info!("Login successful on GET retry as '{}'", credentials.username);
            return session.with_status(AuthStatus::Authenticated);
        }
        Ok(response) => reason = format!("{reason}; GET retry rejected (HTTP {})", response.status),
        Err(e) => reason = format!("{reason}; GET retry failed: {e}"),
    }

    warn!("Authentication failed: {reason}");
    session.with_status(AuthStatus::Failed { reason })
}
