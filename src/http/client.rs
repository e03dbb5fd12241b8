//! HTTP client wrapper with a persistent cookie jar, a global in-flight cap, retries,
//! and request tracking

use crate::error::{WebProbeError, Result};
use crate::models::ScanConfig;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

/// A fully read response: everything the probes look at
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL after redirects
    pub url: String,
    /// Raw `Set-Cookie` header lines, in order
    pub set_cookies: Vec<String>,
    pub body: String,
}

#[derive(Debug, Clone)]
struct ClientSettings {
    timeout: Duration,
    user_agent: String,
    follow_redirects: bool,
    attempts: u32,
}

/// HTTP client bound to one cookie jar (one logical session)
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    jar: Arc<Jar>,
    settings: ClientSettings,
    request_count: Arc<AtomicU64>,
    in_flight: Arc<Semaphore>,
}

impl HttpClient {
    /// Creates a new HttpClient from scan configuration
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        let settings = ClientSettings {
            timeout: Duration::from_secs(config.timeout_secs),
            user_agent: config.user_agent.clone(),
            follow_redirects: config.follow_redirects,
            attempts: config.retries.max(1),
        };
        let jar = Arc::new(Jar::default());
        let client = build_client(&settings, Arc::clone(&jar))?;

        Ok(Self {
            client,
            jar,
            settings,
            request_count: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(Semaphore::new(config.concurrency.max(1))),
        })
    }

    /// Creates a client with an empty cookie jar. The in-flight cap and the request
    /// counter stay shared with `self`.
    pub fn fresh(&self) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = build_client(&self.settings, Arc::clone(&jar))?;
        Ok(Self {
            client,
            jar,
            settings: self.settings.clone(),
            request_count: Arc::clone(&self.request_count),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Sends a GET request
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request_with_retry(|| self.client.get(url)).await
    }

    /// Sends a GET request with query pairs appended to the URL
    pub async fn get_with_query(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse> {
        self.request_with_retry(|| self.client.get(url).query(query))
            .await
    }

    /// Sends a form-encoded POST request
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        self.request_with_retry(|| self.client.post(url).form(form))
            .await
    }

    /// Reads a cookie value from this client's jar as it would be sent to `url`
    pub fn cookie_value(&self, url: &str, name: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let header = self.jar.cookies(&parsed)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }

    /// Plants a cookie in the jar for `url`
    pub fn set_cookie(&self, url: &str, name: &str, value: &str) -> Result<()> {
        let parsed = Url::parse(url)?;
        self.jar
            .add_cookie_str(&format!("{name}={value}; Path=/"), &parsed);
        Ok(())
    }

    /// Returns the total number of requests made
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Executes a request with retry logic. The in-flight permit is held until the body
    /// has been read.
    async fn request_with_retry<F>(&self, build_request: F) -> Result<HttpResponse>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 0..self.settings.attempts {
            if attempt > 0 {
                let backoff = retry_backoff(attempt);
                debug!("Retry attempt {attempt}, waiting {backoff:?}");
                sleep(backoff).await;
            }

            let _permit = self
                .in_flight
                .acquire()
                .await
                .map_err(|_| WebProbeError::ScanError("request limiter closed".to_string()))?;

            self.request_count.fetch_add(1, Ordering::Relaxed);

            match build_request().send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!("Response: {status} for {}", response.url());

                    let last_attempt = attempt + 1 == self.settings.attempts;
                    if status == StatusCode::TOO_MANY_REQUESTS && !last_attempt {
                        warn!("Rate limited by server, backing off");
                        continue;
                    }

                    let url = response.url().to_string();
                    let set_cookies = response
                        .headers()
                        .get_all("set-cookie")
                        .iter()
                        .filter_map(|v| v.to_str().ok().map(String::from))
                        .collect();
                    // Undecodable bodies read as empty: no signal, not an error
                    let body = response.text().await.unwrap_or_default();

                    return Ok(HttpResponse {
                        status: status.as_u16(),
                        url,
                        set_cookies,
                        body,
                    });
                }
                Err(e) => {
                    warn!("Request failed (attempt {attempt}): {e}");
                    last_error = Some(WebProbeError::HttpError(e));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| WebProbeError::ScanError("Max retries exceeded".to_string())))
    }
}

/// Exponential delay before retry `attempt` (1-based), capped at 30 seconds
fn retry_backoff(attempt: u32) -> Duration {
    const INITIAL_BACKOFF_MS: u64 = 500;
    const MAX_BACKOFF_MS: u64 = 30_000;

    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(INITIAL_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

fn build_client(settings: &ClientSettings, jar: Arc<Jar>) -> Result<Client> {
    let client = Client::builder()
        .timeout(settings.timeout)
        .user_agent(&settings.user_agent)
        .redirect(if settings.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        })
        .cookie_provider(jar)
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_backoff_doubles_then_caps() {
        assert_eq!(retry_backoff(1), Duration::from_millis(500));
        assert_eq!(retry_backoff(2), Duration::from_millis(1000));
        assert_eq!(retry_backoff(3), Duration::from_millis(2000));
        assert_eq!(retry_backoff(10), Duration::from_secs(30));
        // exponents far past u64 range must not overflow
        assert_eq!(retry_backoff(64), Duration::from_secs(30));
        assert_eq!(retry_backoff(u32::MAX), Duration::from_secs(30));
    }
}
