//! End-to-end sync runs against a mock server, with a fixture renderer
//! standing in for the headless browser.

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use usersync_core::{
    Config, FetchError, PageRenderer, ScrapeError, SessionCookie, SessionStore, SyncError, sync,
};

const LOGIN_PAGE: &str = r#"
<html><body>
  <form method="post" action="/login">
    <input type="hidden" name="nonce" value="n0nc3">
    <input type="text" name="username">
    <input type="password" name="password">
  </form>
</body></html>
"#;

const SETTINGS_PAGE: &str = r#"
<html><body>
<form class="settings-form">
  <input type="text" value="42">
  <input type="text" value="John">
  <input type="text" value="Doe">
  <input type="email" value="john@doe.com">
</form>
</body></html>
"#;

/// Stands in for the browser: returns fixture markup, or a render timeout.
struct FixtureRenderer {
    html: Option<String>,
}

impl FixtureRenderer {
    fn settings() -> Self {
        Self {
            html: Some(SETTINGS_PAGE.to_string()),
        }
    }

    fn never_renders() -> Self {
        Self { html: None }
    }
}

#[async_trait]
impl PageRenderer for FixtureRenderer {
    async fn render(&self, _url: &Url, _cookies: &[SessionCookie]) -> Result<String, ScrapeError> {
        match &self.html {
            Some(html) => Ok(html.clone()),
            None => Err(ScrapeError::RenderTimeout {
                selector: "form.settings-form input".to_string(),
                detail: "element not found within default timeout".to_string(),
            }),
        }
    }
}

struct Fixture {
    config: Config,
    session_file: PathBuf,
    output_file: PathBuf,
    _dir: tempfile::TempDir,
}

fn fixture(server: &MockServer) -> Fixture {
    let dir = tempfile::TempDir::new().unwrap();
    let session_file = dir.path().join("session.json");
    let output_file = dir.path().join("users.json");
    let config = Config::new(
        &server.uri(),
        "sync-bot",
        "hunter2",
        &session_file,
        &output_file,
    )
    .unwrap();
    Fixture {
        config,
        session_file,
        output_file,
        _dir: dir,
    }
}

async fn mount_login(server: &MockServer, expected_logins: u64) {
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .expect(expected_logins)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("nonce=n0nc3"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/")
                .insert_header("Set-Cookie", "legacy_session=abc123; Path=/; HttpOnly"),
        )
        .expect(expected_logins)
        .mount(server)
        .await;
}

async fn mount_users(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .and(header("cookie", "legacy_session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

fn write_valid_session(fixture: &Fixture, domain: &str) {
    let cookies = json!([{
        "name": "legacy_session",
        "value": "abc123",
        "domain": domain,
        "path": "/",
        "expires": 0,
        "secure": false,
        "httpOnly": true
    }]);
    fs::write(&fixture.session_file, cookies.to_string()).unwrap();
}

#[tokio::test]
async fn test_cold_run_authenticates_then_writes_combined_list() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_users(
        &server,
        json!([{"id": "1", "firstName": "A", "lastName": "B", "email": "a@b.com"}]),
    )
    .await;

    let fixture = fixture(&server);
    let mut store = SessionStore::load(&fixture.session_file);
    let report = sync::run(&fixture.config, &mut store, &FixtureRenderer::settings())
        .await
        .unwrap();

    assert!(report.authenticated, "cold run must perform a fresh login");
    assert_eq!(report.fetched, 1);
    assert_eq!(report.total, 2);

    // Session persisted for the next run.
    assert!(fixture.session_file.exists());
    let reloaded = SessionStore::load(&fixture.session_file);
    assert!(reloaded.is_valid(fixture.config.domain()));

    // Output: list records first, scraped current user strictly last.
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&fixture.output_file).unwrap()).unwrap();
    assert_eq!(
        written,
        json!([
            {"id": "1", "firstName": "A", "lastName": "B", "email": "a@b.com"},
            {"id": "42", "firstName": "John", "lastName": "Doe", "email": "john@doe.com"}
        ])
    );
}

#[tokio::test]
async fn test_warm_run_issues_zero_login_requests() {
    let server = MockServer::start().await;
    // Any hit on the login endpoint fails the test.
    mount_login(&server, 0).await;
    mount_users(
        &server,
        json!([{"id": "1", "firstName": "A", "lastName": "B", "email": "a@b.com"}]),
    )
    .await;

    let fixture = fixture(&server);
    write_valid_session(&fixture, fixture.config.domain());

    let mut store = SessionStore::load(&fixture.session_file);
    assert!(store.is_valid(fixture.config.domain()), "precondition");

    let report = sync::run(&fixture.config, &mut store, &FixtureRenderer::settings())
        .await
        .unwrap();

    assert!(!report.authenticated, "warm run must reuse the session");
    assert_eq!(report.total, 2);

    // Same output structure as a cold run with identical upstream data.
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&fixture.output_file).unwrap()).unwrap();
    assert_eq!(written.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_fetch_failure_leaves_previous_output_untouched() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = fixture(&server);
    write_valid_session(&fixture, fixture.config.domain());
    fs::write(&fixture.output_file, "previous run output").unwrap();

    let mut store = SessionStore::load(&fixture.session_file);
    let result = sync::run(&fixture.config, &mut store, &FixtureRenderer::settings()).await;

    match result {
        Err(SyncError::Fetch(FetchError::Status { status, .. })) => assert_eq!(status, 503),
        other => panic!("expected fetch status error, got: {other:?}"),
    }
    assert_eq!(
        fs::read_to_string(&fixture.output_file).unwrap(),
        "previous run output",
        "failed run must not touch the previous output file"
    );
}

#[tokio::test]
async fn test_render_timeout_aborts_before_output_write() {
    let server = MockServer::start().await;
    mount_users(&server, json!([])).await;

    let fixture = fixture(&server);
    write_valid_session(&fixture, fixture.config.domain());

    let mut store = SessionStore::load(&fixture.session_file);
    let result = sync::run(&fixture.config, &mut store, &FixtureRenderer::never_renders()).await;

    assert!(matches!(
        result,
        Err(SyncError::Scrape(ScrapeError::RenderTimeout { .. }))
    ));
    assert!(
        !fixture.output_file.exists(),
        "no output may be written when scraping fails"
    );
}

#[tokio::test]
async fn test_empty_list_still_yields_scraped_record_last() {
    let server = MockServer::start().await;
    mount_users(&server, json!([])).await;

    let fixture = fixture(&server);
    write_valid_session(&fixture, fixture.config.domain());

    let mut store = SessionStore::load(&fixture.session_file);
    let report = sync::run(&fixture.config, &mut store, &FixtureRenderer::settings())
        .await
        .unwrap();

    assert_eq!(report.fetched, 0);
    assert_eq!(report.total, 1);

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&fixture.output_file).unwrap()).unwrap();
    assert_eq!(
        written,
        json!([{"id": "42", "firstName": "John", "lastName": "Doe", "email": "john@doe.com"}])
    );
}

#[tokio::test]
async fn test_current_user_in_list_appears_twice() {
    let server = MockServer::start().await;
    mount_users(
        &server,
        json!([{"id": "42", "firstName": "John", "lastName": "Doe", "email": "john@doe.com"}]),
    )
    .await;

    let fixture = fixture(&server);
    write_valid_session(&fixture, fixture.config.domain());

    let mut store = SessionStore::load(&fixture.session_file);
    let report = sync::run(&fixture.config, &mut store, &FixtureRenderer::settings())
        .await
        .unwrap();

    // No deduplication: the scraped record is appended even when the list
    // already contains the same user.
    assert_eq!(report.total, 2);
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&fixture.output_file).unwrap()).unwrap();
    let records = written.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], records[1]);
}
