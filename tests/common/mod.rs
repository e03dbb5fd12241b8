//! Common test utilities

#![allow(dead_code)]

use webprobe::http::{self, HttpClient, Session};
use webprobe::models::ScanConfig;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN_TOKEN: &str = "abc123";

pub const LOGIN_FORM: &str = r#"<html><body>
<form action="login.php" method="post">
  <input type="text" name="username" />
  <input type="password" name="password" />
  <input type="submit" name="Login" value="Login" />
  <input type="hidden" name="user_token" value="abc123" />
</form>
</body></html>"#;

pub const LOGGED_IN_PAGE: &str = r#"<html><body>
<div id="main_menu"><a href="index.php">Home</a> <a href="logout.php">Logout</a></div>
Welcome
</body></html>"#;

pub const LOGIN_FAILED_PAGE: &str = "<html><body>Login failed</body></html>";

/// Creates a test ScanConfig pointing to a wiremock server
pub fn test_config(target: &str) -> ScanConfig {
    ScanConfig {
        target: target.to_string(),
        timeout_secs: 5,
        concurrency: 4,
        retries: 1,
        user_agent: "webprobe-test/0.1.0".to_string(),
        max_depth: 2,
        ..ScanConfig::default()
    }
}

/// Mounts a login page carrying an anti-forgery token. A POST replaying the token
/// with the default credentials is accepted and answered with `session_cookie` as
/// its Set-Cookie line; anything else fails.
pub async fn mount_login(server: &MockServer, session_cookie: &str) {
    Mock::given(method("GET"))
        .and(path("/login.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_FORM))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login.php"))
        .and(body_string_contains("username=admin&password=password"))
        .and(body_string_contains(format!("user_token={LOGIN_TOKEN}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", session_cookie)
                .set_body_string(LOGGED_IN_PAGE),
        )
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_FAILED_PAGE))
        .mount(server)
        .await;
}

/// Builds an unauthenticated session for `config`
pub fn new_session(config: &ScanConfig) -> Session {
    let client = HttpClient::from_config(config).expect("failed to create client");
    let base = url::Url::parse(&config.target).expect("invalid target");
    Session::new(client, base)
}

/// Logs in against a server prepared with [`mount_login`]
pub async fn authenticated_session(config: &ScanConfig) -> Session {
    let session = http::authenticate(
        new_session(config),
        &config.endpoints.login,
        &config.credentials,
        &config.endpoints.login_trigger,
    )
    .await;
    assert!(
        session.is_authenticated(),
        "login failed: {}",
        session.status()
    );
    session
}
