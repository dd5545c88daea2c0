//! Error taxonomy shared by the cleaner, the rule loader and the resolver.

use std::path::PathBuf;

/// Validation failure raised while parsing a URL for cleaning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CleanError {
    /// Empty input, missing host, bad port, or a host IDNA rejects.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Scheme other than `http` or `https`.
    #[error("expecting 'http' or 'https', but got {scheme:?} in {url:?}")]
    InvalidScheme { url: String, scheme: String },
}

impl CleanError {
    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        CleanError::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure while loading a rule, body-redirect or allow-list document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("provider {provider:?}: invalid pattern {pattern:?}: {source}")]
    Pattern {
        provider: String,
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },
    /// Body-redirect rules must expose the redirect target as group 1.
    #[error("provider {provider:?}: pattern {pattern:?} has no capture group")]
    MissingCaptureGroup { provider: String, pattern: String },
}

/// Terminal failure of a redirect resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unrecognized URI or unsupported protocol {scheme:?} in {url:?}")]
    UnsupportedProtocol { url: String, scheme: String },
    /// Transport failure once retries are exhausted or disabled.
    #[error("connection error for {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: curl::Error,
    },
    /// A retryable status kept coming back after the retry budget was spent.
    #[error("exceeded maximum allowed retries for {url} (last status {status})")]
    MaxRetries { url: String, status: u32 },
    #[error("exceeded maximum allowed redirects ({max}) at {url}")]
    TooManyRedirects { url: String, max: u32 },
    /// The blocking task behind `resolve_async` was cancelled.
    #[error("resolver task for {url} did not complete: {reason}")]
    Aborted { url: String, reason: String },
}

impl ResolveError {
    /// True for `Connect` and its `MaxRetries` refinement.
    pub fn is_connect(&self) -> bool {
        matches!(
            self,
            ResolveError::Connect { .. } | ResolveError::MaxRetries { .. }
        )
    }

    /// URL the resolver was working on when it gave up.
    pub fn url(&self) -> &str {
        match self {
            ResolveError::InvalidUrl { url, .. }
            | ResolveError::UnsupportedProtocol { url, .. }
            | ResolveError::Connect { url, .. }
            | ResolveError::MaxRetries { url, .. }
            | ResolveError::TooManyRedirects { url, .. }
            | ResolveError::Aborted { url, .. } => url,
        }
    }
}

impl From<CleanError> for ResolveError {
    fn from(e: CleanError) -> Self {
        match e {
            CleanError::InvalidUrl { url, reason } => ResolveError::InvalidUrl { url, reason },
            CleanError::InvalidScheme { url, scheme } => {
                ResolveError::UnsupportedProtocol { url, scheme }
            }
        }
    }
}
