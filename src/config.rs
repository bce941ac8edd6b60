//! Runtime configuration: target endpoints, credentials, and artifact paths.
//!
//! Defaults live here as constants so the tool runs with zero arguments;
//! the CLI only overrides them (mainly so tests can point the binary at a
//! mock server).

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::auth::Credentials;

/// Default base URL of the legacy application.
pub const DEFAULT_BASE_URL: &str = "http://intranet.legacy.example";

/// Login page and login submit endpoint (same path for GET and POST).
pub const LOGIN_PATH: &str = "/login";

/// Internal JSON endpoint returning the user list (POST, no body).
pub const USERS_PATH: &str = "/api/users";

/// Client-rendered settings page carrying the current-user form.
pub const SETTINGS_PATH: &str = "/settings";

/// Default service account credentials.
pub const DEFAULT_USERNAME: &str = "directory-sync";
pub const DEFAULT_PASSWORD: &str = "directory-sync";

/// Default persisted session file path.
pub const DEFAULT_SESSION_FILE: &str = "session.json";

/// Default output artifact path.
pub const DEFAULT_OUTPUT_FILE: &str = "users.json";

/// Errors raised while validating configuration input.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL did not parse.
    #[error("invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        /// The offending URL string.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// The base URL parsed but carries no host to scope cookies to.
    #[error("base URL '{url}' has no host")]
    MissingHost {
        /// The offending URL string.
        url: String,
    },

    /// An endpoint path failed to join onto the base URL.
    #[error("cannot join endpoint path '{path}' onto base URL: {source}")]
    EndpointJoin {
        /// The endpoint path that failed to join.
        path: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
}

/// Validated runtime configuration for one sync run.
///
/// Endpoint URLs and the cookie domain are computed once at construction so
/// every accessor is infallible afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    login_url: Url,
    users_url: Url,
    settings_url: Url,
    domain: String,
    credentials: Credentials,
    /// Path the session cookie file is loaded from and saved to.
    pub session_file: PathBuf,
    /// Path the combined user list is written to.
    pub output_file: PathBuf,
}

impl Config {
    /// Builds a configuration from a base URL, credentials, and artifact paths.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the base URL is malformed, has no host,
    /// or an endpoint path cannot be joined onto it.
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        session_file: impl Into<PathBuf>,
        output_file: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let base = Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;

        let domain = base
            .host_str()
            .ok_or_else(|| ConfigError::MissingHost {
                url: base_url.to_string(),
            })?
            .to_string();

        let join = |path: &'static str| {
            base.join(path)
                .map_err(|source| ConfigError::EndpointJoin { path, source })
        };

        Ok(Self {
            login_url: join(LOGIN_PATH)?,
            users_url: join(USERS_PATH)?,
            settings_url: join(SETTINGS_PATH)?,
            domain,
            credentials: Credentials::new(username, password),
            session_file: session_file.into(),
            output_file: output_file.into(),
        })
    }

    /// Login page / login submit URL.
    #[must_use]
    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    /// User list endpoint URL.
    #[must_use]
    pub fn users_url(&self) -> &Url {
        &self.users_url
    }

    /// Settings page URL.
    #[must_use]
    pub fn settings_url(&self) -> &Url {
        &self.settings_url
    }

    /// Host the session cookies are scoped to.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Login credentials.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}
