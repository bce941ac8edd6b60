//! Shared HTTP client construction policy.
//!
//! Centralizes timeouts and the User-Agent string so login and fetch traffic
//! stay consistent. The login submission needs redirects disabled (the 302
//! itself is the success signal), so redirect behavior is the one knob.

use std::time::Duration;

use reqwest::{Client, redirect};

pub(crate) const CONNECT_TIMEOUT_SECS: u64 = 10;
pub(crate) const READ_TIMEOUT_SECS: u64 = 30;

/// User-Agent identifying the tool (good citizenship; RFC 9308).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("usersync/{version}")
}

/// Builds an HTTP client with shared project policy.
///
/// With `follow_redirects = false` the client reports 3xx responses as-is
/// instead of chasing them.
///
/// # Errors
///
/// Returns [`reqwest::Error`] when client construction fails.
pub fn build_http_client(follow_redirects: bool) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
        .user_agent(default_user_agent());

    if !follow_redirects {
        builder = builder.redirect(redirect::Policy::none());
    }

    builder.build()
}
