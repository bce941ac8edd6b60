//! Headless rendering of the settings page and current-user extraction.
//!
//! The settings page only materializes its form through client-side
//! JavaScript, so a plain HTTP fetch sees an empty shell. One isolated
//! Chromium instance renders the page; the session cookies are injected
//! first so the page loads authenticated.
//!
//! Field extraction is positional on purpose: the legacy frontend renders
//! the form inputs in a fixed order (id, first name, last name, email) and
//! gives them no stable name or id attributes. Any reordering upstream
//! silently produces wrong data — the brittleness is confined to
//! [`extract_profile_fields`] so an attribute-based lookup can replace it
//! if the page ever grows one.

use async_trait::async_trait;
use headless_chrome::Browser;
use headless_chrome::protocol::cdp::Network::CookieParam;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::fetch::UserRecord;
use crate::markup;
use crate::session::SessionCookie;

/// Selector the scraper blocks on before capturing markup.
///
/// The form class is stable across the legacy app's releases; waiting for
/// an input inside it bounds the wait on client-side rendering.
pub const SETTINGS_FORM_SELECTOR: &str = "form.settings-form input";

/// Errors that can occur while rendering and scraping the settings page.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The browser process failed to launch.
    #[error("failed to launch rendering engine: {detail}")]
    Launch {
        /// The underlying launch failure.
        detail: String,
    },

    /// A browser operation failed after launch.
    #[error("rendering engine error while {stage}: {detail}")]
    Engine {
        /// What the scraper was doing when the engine failed.
        stage: &'static str,
        /// The underlying failure.
        detail: String,
    },

    /// The settings form never appeared within the engine's default wait.
    #[error("timed out waiting for '{selector}' to render: {detail}")]
    RenderTimeout {
        /// The selector that never appeared.
        selector: String,
        /// The underlying wait failure.
        detail: String,
    },
}

impl ScrapeError {
    fn launch(detail: impl Into<String>) -> Self {
        Self::Launch {
            detail: detail.into(),
        }
    }

    fn engine(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::Engine {
            stage,
            detail: detail.into(),
        }
    }
}

/// Renders a page to its post-JavaScript markup.
///
/// The seam exists so tests can substitute fixture markup for a live
/// browser; production code uses [`ChromeRenderer`].
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Loads `url` with `cookies` applied and returns the rendered markup
    /// once the settings form is present.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] when the engine fails or the form never
    /// renders.
    async fn render(&self, url: &Url, cookies: &[SessionCookie]) -> Result<String, ScrapeError>;
}

/// Drives one isolated headless Chromium instance per render.
///
/// The browser lives entirely inside the blocking closure, so it is torn
/// down on every exit path — success, engine failure, or render timeout.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    wait_selector: String,
}

impl ChromeRenderer {
    /// Creates a renderer waiting on the standard settings form selector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wait_selector: SETTINGS_FORM_SELECTOR.to_string(),
        }
    }
}

impl Default for ChromeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &Url, cookies: &[SessionCookie]) -> Result<String, ScrapeError> {
        let url = url.to_string();
        let cookies = cookies.to_vec();
        let selector = self.wait_selector.clone();

        tokio::task::spawn_blocking(move || render_blocking(&url, &cookies, &selector))
            .await
            .map_err(|e| ScrapeError::engine("joining the render task", e.to_string()))?
    }
}

/// One full browser session: launch, inject cookies, navigate, wait for
/// the form, capture markup. Runs on the blocking thread pool because the
/// browser driver is synchronous.
fn render_blocking(
    url: &str,
    cookies: &[SessionCookie],
    selector: &str,
) -> Result<String, ScrapeError> {
    let browser = Browser::default().map_err(|e| ScrapeError::launch(e.to_string()))?;
    let tab = browser
        .new_tab()
        .map_err(|e| ScrapeError::engine("opening a tab", e.to_string()))?;

    // One setCookies call per cookie, matching how the legacy frontend
    // sets them.
    for cookie in cookies {
        tab.set_cookies(vec![cookie_param(cookie)])
            .map_err(|e| ScrapeError::engine("injecting session cookies", e.to_string()))?;
    }

    tab.navigate_to(url)
        .map_err(|e| ScrapeError::engine("navigating to the settings page", e.to_string()))?;
    tab.wait_until_navigated()
        .map_err(|e| ScrapeError::engine("waiting for navigation", e.to_string()))?;

    // Engine default timeout; a page that never renders the form fails here.
    tab.wait_for_element(selector)
        .map_err(|e| ScrapeError::RenderTimeout {
            selector: selector.to_string(),
            detail: e.to_string(),
        })?;

    tab.get_content()
        .map_err(|e| ScrapeError::engine("capturing rendered markup", e.to_string()))
}

/// Translates a session cookie into CDP terms: expiry as seconds since
/// epoch, with "no expiry" mapped to the -1 sentinel.
fn cookie_param(cookie: &SessionCookie) -> CookieParam {
    #[allow(clippy::cast_precision_loss)]
    let expires = if cookie.expires == 0 {
        -1.0
    } else {
        cookie.expires as f64
    };

    CookieParam {
        name: cookie.name.clone(),
        value: cookie.value().to_string(),
        url: None,
        domain: Some(cookie.domain.clone()),
        path: Some(cookie.path.clone()),
        secure: Some(cookie.secure),
        http_only: Some(cookie.http_only),
        same_site: None,
        expires: Some(expires),
        priority: None,
        same_party: None,
        source_scheme: None,
        source_port: None,
        partition_key: None,
    }
}

/// Extracts the current-user record from rendered settings markup.
///
/// Positional: the 1st, 2nd, 3rd, and 4th input values become
/// id, first name, last name, and email. Inputs without a value, or a form
/// with fewer inputs, yield absent fields rather than errors.
#[must_use]
pub fn extract_profile_fields(html: &str) -> UserRecord {
    let mut values = markup::input_values(html).into_iter();

    UserRecord {
        id: values.next().flatten(),
        first_name: values.next().flatten(),
        last_name: values.next().flatten(),
        email: values.next().flatten(),
    }
}

/// Renders the settings page and extracts the current-user record.
///
/// # Errors
///
/// Returns [`ScrapeError`] when rendering fails; extraction itself cannot
/// fail.
#[instrument(skip(renderer, cookies), fields(url = %settings_url))]
pub async fn scrape_current_user(
    renderer: &dyn PageRenderer,
    settings_url: &Url,
    cookies: &[SessionCookie],
) -> Result<UserRecord, ScrapeError> {
    let html = renderer.render(settings_url, cookies).await?;
    let record = extract_profile_fields(&html);
    debug!(
        has_id = record.id.is_some(),
        has_email = record.email.is_some(),
        "scraped current user"
    );
    Ok(record)
}
