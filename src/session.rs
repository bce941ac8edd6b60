//! Persisted session cookie store.
//!
//! The session file is a pretty-printed JSON array of cookie tuples
//! (name, value, domain, path, expires, secure, httpOnly), matching the
//! shape of browser JSON cookie exports. A run that finds no usable file
//! starts from an empty store; everything downstream decides whether to
//! authenticate based on [`SessionStore::is_valid`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A single cookie scoped to the target application.
///
/// The value field is intentionally redacted in Debug output to prevent
/// accidental logging of sensitive session data.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value (sensitive — never log).
    value: String,
    /// Host the cookie belongs to; a leading dot means subdomains match.
    pub domain: String,
    /// URL path scope.
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix timestamp for expiry (0 = session cookie, no expiry).
    #[serde(default)]
    pub expires: u64,
    /// Whether the cookie should only be sent over HTTPS.
    #[serde(default)]
    pub secure: bool,
    /// Whether the cookie is hidden from page JavaScript.
    #[serde(default)]
    pub http_only: bool,
}

fn default_path() -> String {
    "/".to_string()
}

impl SessionCookie {
    /// Creates a new cookie entry.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
        expires: u64,
        secure: bool,
        http_only: bool,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: path.into(),
            expires,
            secure,
            http_only,
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive — avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True when the cookie carries an expiry that has already passed.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires > 0 && self.expires <= now
    }
}

// Custom Debug impl that redacts the cookie value.
impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("expires", &self.expires)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .finish()
    }
}

/// Errors raised while persisting the session file.
///
/// Load failures are deliberately not represented here: a missing or
/// malformed session file degrades to an empty store instead of failing
/// the run.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Failed to serialize the cookie list.
    #[error("failed to encode session file: {0}")]
    Encode(#[from] serde_json::Error),

    /// Failed to write the session file.
    #[error("failed to write session file {path}: {source}")]
    Write {
        /// Session file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Owns the cookies for one run and the file they persist to.
///
/// The store is passed explicitly through the orchestration call chain;
/// there is no ambient shared jar.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    cookies: Vec<SessionCookie>,
}

impl SessionStore {
    /// Loads the store from `path`.
    ///
    /// Any failure — file absent, unreadable, malformed JSON — yields an
    /// empty store and a debug-level log line; it is never an error.
    /// Cookies whose expiry has already passed are dropped on load.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let mut cookies = match read_cookie_file(&path) {
            Ok(cookies) => cookies,
            Err(reason) => {
                debug!(
                    path = %path.display(),
                    reason = %reason,
                    "no usable session file; starting with an empty session"
                );
                Vec::new()
            }
        };

        let now = unix_now();
        let before = cookies.len();
        cookies.retain(|cookie| !cookie.is_expired(now));
        if cookies.len() < before {
            debug!(
                dropped = before - cookies.len(),
                "dropped expired session cookies on load"
            );
        }

        Self { path, cookies }
    }

    /// Creates an empty store that will persist to `path`.
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cookies: Vec::new(),
        }
    }

    /// Serializes the store and overwrites its file unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when encoding or writing fails.
    pub fn save(&self) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(&self.cookies)?;
        fs::write(&self.path, json).map_err(|source| SessionError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(
            path = %self.path.display(),
            cookies = self.cookies.len(),
            "saved session file"
        );
        Ok(())
    }

    /// True iff at least one cookie scoped to `domain` has a name
    /// containing the substring `"session"`.
    ///
    /// This is an optimistic, self-reported check — no network round-trip
    /// confirms server-side validity, so a stale-but-present cookie reads
    /// as valid until a downstream request fails.
    #[must_use]
    pub fn is_valid(&self, domain: &str) -> bool {
        self.cookies
            .iter()
            .any(|cookie| domain_matches(&cookie.domain, domain) && cookie.name.contains("session"))
    }

    /// Builds a `Cookie` request header value from the cookies scoped to
    /// `domain`, in insertion order.
    #[must_use]
    pub fn cookie_header(&self, domain: &str) -> String {
        self.cookies
            .iter()
            .filter(|cookie| domain_matches(&cookie.domain, domain))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value()))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Returns clones of the cookies scoped to `domain`.
    #[must_use]
    pub fn cookies_for(&self, domain: &str) -> Vec<SessionCookie> {
        self.cookies
            .iter()
            .filter(|cookie| domain_matches(&cookie.domain, domain))
            .cloned()
            .collect()
    }

    /// Merges freshly set cookies into the store.
    ///
    /// A cookie with the same name, domain, and path replaces the existing
    /// entry; everything else is appended.
    pub fn absorb(&mut self, incoming: impl IntoIterator<Item = SessionCookie>) {
        for cookie in incoming {
            if let Some(existing) = self.cookies.iter_mut().find(|existing| {
                existing.name == cookie.name
                    && existing.domain == cookie.domain
                    && existing.path == cookie.path
            }) {
                *existing = cookie;
            } else {
                self.cookies.push(cookie);
            }
        }
    }

    /// Number of cookies currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// True when the store holds no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Path the store persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_cookie_file(path: &Path) -> Result<Vec<SessionCookie>, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

/// True when a cookie scoped to `cookie_domain` applies to requests
/// against `host`: exact match for host-only cookies, suffix match for
/// dot-prefixed domains.
fn domain_matches(cookie_domain: &str, host: &str) -> bool {
    if let Some(suffix) = cookie_domain.strip_prefix('.') {
        host == suffix || host.ends_with(cookie_domain)
    } else {
        host == cookie_domain
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}
