//! Two-step nonce login against the legacy application.
//!
//! Step one loads the login page and lifts the server-issued nonce out of
//! its markup. Step two posts the form-encoded credentials with redirects
//! disabled: the legacy app answers a successful login with a bare 302
//! plus session cookies, so the redirect itself is the success signal.
//! There is no retry; any other outcome fails the run.

use std::fmt;
use std::time::UNIX_EPOCH;

use reqwest::{Client, StatusCode, Url, header};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::markup;
use crate::session::{SessionCookie, SessionStore};

/// Username/password pair for the login form.
///
/// The password is redacted in Debug output.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Errors that can occur during login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Network-level error while talking to the login endpoint.
    #[error("network error while {stage}: {source}")]
    Network {
        /// What the login flow was doing when the request failed.
        stage: &'static str,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The login page markup carries no nonce input.
    ///
    /// The page structure is assumed stable; a missing nonce means the
    /// target changed underneath us and nothing downstream can work.
    #[error("login page is missing the nonce field")]
    MissingNonce,

    /// The login submission was not answered with a redirect plus cookies.
    #[error(
        "login rejected: expected HTTP 302 with session cookies, got HTTP {status} with {set_cookie_count} Set-Cookie header(s)"
    )]
    Rejected {
        /// The status the login endpoint actually returned.
        status: u16,
        /// Number of Set-Cookie headers on the response.
        set_cookie_count: usize,
    },
}

impl AuthError {
    /// Creates a network error with the login stage that failed.
    pub(crate) fn network(stage: &'static str, source: reqwest::Error) -> Self {
        Self::Network { stage, source }
    }
}

/// Performs the two-step login and absorbs the returned cookies into the
/// store, scoped to `domain`.
///
/// The caller must supply a client whose redirect policy is `none` — the
/// 302 must surface as-is. On failure the store is left untouched.
///
/// # Errors
///
/// Returns [`AuthError::MissingNonce`] when the login page has no nonce
/// input, [`AuthError::Rejected`] when the submission is not answered with
/// a 302 carrying at least one cookie, and [`AuthError::Network`] for
/// transport failures.
#[instrument(skip(client, credentials, store), fields(url = %login_url))]
pub async fn login(
    client: &Client,
    login_url: &Url,
    domain: &str,
    credentials: &Credentials,
    store: &mut SessionStore,
) -> Result<(), AuthError> {
    let page = client
        .get(login_url.clone())
        .send()
        .await
        .map_err(|e| AuthError::network("loading the login page", e))?
        .text()
        .await
        .map_err(|e| AuthError::network("reading the login page", e))?;

    let nonce = markup::input_value_by_name(&page, "nonce").ok_or(AuthError::MissingNonce)?;
    debug!("extracted login nonce");

    let response = client
        .post(login_url.clone())
        .form(&[
            ("nonce", nonce.as_str()),
            ("username", credentials.username()),
            ("password", credentials.password.as_str()),
        ])
        .send()
        .await
        .map_err(|e| AuthError::network("submitting credentials", e))?;

    let status = response.status();
    let set_cookie_count = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .count();

    if status != StatusCode::FOUND || set_cookie_count == 0 {
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            set_cookie_count,
        });
    }

    let cookies: Vec<SessionCookie> = response
        .cookies()
        .map(|cookie| response_cookie_to_session(&cookie, domain))
        .collect();

    info!(
        user = credentials.username(),
        cookies = cookies.len(),
        "login accepted"
    );
    store.absorb(cookies);
    Ok(())
}

/// Converts a response cookie into the store representation, falling back
/// to the target domain and root path when the server set neither.
fn response_cookie_to_session(
    cookie: &reqwest::cookie::Cookie<'_>,
    fallback_domain: &str,
) -> SessionCookie {
    let expires = cookie
        .expires()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |duration| duration.as_secs());

    SessionCookie::new(
        cookie.name(),
        cookie.value(),
        cookie.domain().unwrap_or(fallback_domain),
        cookie.path().unwrap_or("/"),
        expires,
        cookie.secure(),
        cookie.http_only(),
    )
}
