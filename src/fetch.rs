//! Authenticated retrieval of the user list.
//!
//! The legacy endpoint answers a POST with no body. Authentication rides
//! on a `Cookie` header built from the session store rather than a client
//! cookie jar, mirroring how the legacy frontend calls it.

use reqwest::{Client, Url, header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::session::SessionStore;

/// One user record, from the list endpoint or the scraped settings page.
///
/// All fields are optional strings; the upstream API and the scraped page
/// are trusted to produce well-formed values. Absent fields are omitted
/// when the record is serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Opaque identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Errors that can occur while fetching the user list.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, timeout).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The endpoint that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status from the endpoint.
    #[error("HTTP {status} fetching {url}")]
    Status {
        /// The endpoint that answered with an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body was not a JSON array of user records.
    #[error("malformed user list from {url}: {source}")]
    Parse {
        /// The endpoint that produced the body.
        url: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    fn network(url: &Url, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            source,
        }
    }

    fn status(url: &Url, status: u16) -> Self {
        Self::Status {
            url: url.to_string(),
            status,
        }
    }

    fn parse(url: &Url, source: serde_json::Error) -> Self {
        Self::Parse {
            url: url.to_string(),
            source,
        }
    }
}

/// Fetches the user list with the session's cookies attached.
///
/// The status is checked before the body is read; a non-2xx answer aborts
/// without touching the body.
///
/// # Errors
///
/// Returns [`FetchError::Status`] on a non-success status,
/// [`FetchError::Parse`] when the body is not a user array, and
/// [`FetchError::Network`] for transport failures.
#[instrument(skip(client, store), fields(url = %users_url))]
pub async fn fetch_users(
    client: &Client,
    users_url: &Url,
    domain: &str,
    store: &SessionStore,
) -> Result<Vec<UserRecord>, FetchError> {
    let response = client
        .post(users_url.clone())
        .header(header::COOKIE, store.cookie_header(domain))
        .send()
        .await
        .map_err(|e| FetchError::network(users_url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::status(users_url, status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::network(users_url, e))?;

    let users: Vec<UserRecord> =
        serde_json::from_str(&body).map_err(|e| FetchError::parse(users_url, e))?;

    debug!(users = users.len(), "fetched user list");
    Ok(users)
}
