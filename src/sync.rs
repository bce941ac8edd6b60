//! One-shot sync orchestration.
//!
//! Linear control flow with a single decision point: reuse the persisted
//! session when it still looks valid, authenticate otherwise. The output
//! file is written last, so any failure upstream leaves a previous output
//! untouched.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::auth::{self, AuthError};
use crate::config::Config;
use crate::fetch::{self, FetchError};
use crate::http;
use crate::scrape::{self, PageRenderer, ScrapeError};
use crate::session::{SessionError, SessionStore};

/// Errors that can abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Login failed (missing nonce, rejected credentials, or transport).
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The user list could not be fetched or parsed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The settings page could not be rendered or captured.
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// The freshly authenticated session could not be persisted.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// HTTP client construction failed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The combined list could not be serialized.
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    /// The output file could not be written.
    #[error("failed to write output file {path}: {source}")]
    Output {
        /// Output file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Summary of one completed run.
#[derive(Debug, Clone, Copy)]
pub struct SyncReport {
    /// Records written to the output file (list count + 1).
    pub total: usize,
    /// Records returned by the list endpoint.
    pub fetched: usize,
    /// Whether this run performed a fresh login.
    pub authenticated: bool,
}

/// Runs one full sync: validate session → login if needed → fetch list →
/// scrape current user → write output.
///
/// The session store is threaded through explicitly; it is only mutated
/// (and persisted) when a fresh login happens.
///
/// # Errors
///
/// Returns [`SyncError`] on any failure; every error except a session-file
/// load problem (handled before this function) is fatal to the run.
pub async fn run(
    config: &Config,
    store: &mut SessionStore,
    renderer: &dyn PageRenderer,
) -> Result<SyncReport, SyncError> {
    let authenticated = if store.is_valid(config.domain()) {
        debug!(domain = config.domain(), "reusing persisted session");
        false
    } else {
        info!(domain = config.domain(), "no usable session; logging in");
        let login_client = http::build_http_client(false)?;
        auth::login(
            &login_client,
            config.login_url(),
            config.domain(),
            config.credentials(),
            store,
        )
        .await?;
        store.save()?;
        true
    };

    let client = http::build_http_client(true)?;
    let mut users = fetch::fetch_users(&client, config.users_url(), config.domain(), store).await?;
    let fetched = users.len();

    let current = scrape::scrape_current_user(
        renderer,
        config.settings_url(),
        &store.cookies_for(config.domain()),
    )
    .await?;
    users.push(current);

    let json = serde_json::to_string_pretty(&users)?;
    tokio::fs::write(&config.output_file, json)
        .await
        .map_err(|source| SyncError::Output {
            path: config.output_file.clone(),
            source,
        })?;

    info!(
        path = %config.output_file.display(),
        total = users.len(),
        "wrote combined user list"
    );

    Ok(SyncReport {
        total: users.len(),
        fetched,
        authenticated,
    })
}
