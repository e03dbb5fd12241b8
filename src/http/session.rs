//! Session handle shared by the crawler and the probe modules

use crate::error::Result;
use crate::http::HttpClient;
use crate::models::AuthStatus;
use url::Url;

/// Connection context for one scan run: cookie jar (inside the client), base URL
/// and authentication status.
///
/// Clones share the same cookie jar. Use [`Session::unauthenticated`] when a check
/// needs an independent, cookie-less session.
#[derive(Clone)]
pub struct Session {
    client: HttpClient,
    base_url: Url,
    status: AuthStatus,
}

impl Session {
    pub fn new(client: HttpClient, base_url: Url) -> Self {
        Self {
            client,
            base_url,
            status: AuthStatus::Unauthenticated,
        }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn status(&self) -> &AuthStatus {
        &self.status
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }

    pub(crate) fn with_status(mut self, status: AuthStatus) -> Self {
        self.status = status;
        self
    }

    /// Resolves a target-relative path (e.g. `/login.php`) to an absolute URL string
    pub fn resolve(&self, path: &str) -> Result<String> {
        Ok(self.base_url.join(path)?.to_string())
    }

    /// A new session against the same target with an empty cookie jar
    pub fn unauthenticated(&self) -> Result<Self> {
        Ok(Self::new(self.client.fresh()?, self.base_url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanConfig;

    #[test]
    fn test_resolve_against_base() {
        let config = ScanConfig::default();
        let client = HttpClient::from_config(&config).expect("client");
        let session = Session::new(client, Url::parse("http://target.local/app/").expect("url"));
        assert_eq!(
            session.resolve("/login.php").expect("resolve"),
            "http://target.local/login.php"
        );
        assert_eq!(
            session.resolve("vulnerabilities/sqli/").expect("resolve"),
            "http://target.local/app/vulnerabilities/sqli/"
        );
    }

    #[test]
    fn test_unauthenticated_copy_has_no_cookies() {
        let config = ScanConfig::default();
        let client = HttpClient::from_config(&config).expect("client");
        let session = Session::new(client, Url::parse("http://target.local/").expect("url"))
            .with_status(AuthStatus::Authenticated);
        session
            .client()
            .set_cookie("http://target.local/", "PHPSESSID", "abc")
            .expect("cookie");

        let anon = session.unauthenticated().expect("fresh session");
        assert!(!anon.is_authenticated());
        assert_eq!(
            session.client().cookie_value("http://target.local/", "PHPSESSID"),
            Some("abc".to_string())
        );
        assert_eq!(anon.client().cookie_value("http://target.local/", "PHPSESSID"), None);
    }
}
