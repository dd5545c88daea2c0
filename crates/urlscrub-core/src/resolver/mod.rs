//! Redirect-following resolver ("unshortener").
//!
//! Every hop is cleaned with the rule store before it is requested, so the
//! tracking fields a shortener appends never reach the next server. The
//! loop owns one cookie jar and one retry budget per call.

mod body;
mod location;

pub use body::{decode_body, find_body_redirect, html_unescape};
pub use location::resolve_location;

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::cleaner::CleanFlags;
use crate::config::UrlscrubConfig;
use crate::cookies::{CookieJar, CookiePolicy, HopRequest};
use crate::error::ResolveError;
use crate::fetch::{fetch, FetchOptions, FetchResponse};
use crate::retry::{
    classify_curl_error, classify_http_status, parse_retry_after, ErrorKind, RetryDecision,
    RetryPolicy, DEFAULT_STATUS_RETRY,
};
use crate::ruleset::RulesetStore;
use crate::tls::TlsOptions;
use crate::url_model::{requote, UrlValue};

/// Statuses treated as redirects.
pub const REDIRECT_STATUSES: [u32; 5] = [301, 302, 303, 307, 308];

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_MAX_REDIRECTS: u32 = 13;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Request headers sent on every hop unless overridden.
pub fn default_headers() -> Vec<(String, String)> {
    vec![
        ("Accept".to_string(), "*/*".to_string()),
        ("Accept-Encoding".to_string(), "identity".to_string()),
        ("Connection".to_string(), "close".to_string()),
        (
            "User-Agent".to_string(),
            format!("urlscrub/{}", env!("CARGO_PKG_VERSION")),
        ),
    ]
}

/// Knobs for one `resolve` call.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// HTTP method for every hop (`GET` or `HEAD` are typical).
    pub method: String,
    /// Connect and transfer deadline per attempt.
    pub timeout: Duration,
    pub max_redirects: u32,
    /// Statuses retried while `retry.max_retries > 0`.
    pub status_retry: Vec<u32>,
    pub headers: Vec<(String, String)>,
    /// `None` accepts cookies only for the store's allow-listed domains.
    pub cookie_policy: Option<CookiePolicy>,
    pub tls: TlsOptions,
    pub max_body_bytes: usize,
    /// Look for redirect hints in bodies when no header redirect is present.
    pub parse_documents: bool,
    /// Applied to the input and to every redirect target.
    pub clean: CleanFlags,
    pub retry: RetryPolicy,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            status_retry: DEFAULT_STATUS_RETRY.to_vec(),
            headers: default_headers(),
            cookie_policy: None,
            tls: TlsOptions::verified(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            parse_documents: false,
            clean: CleanFlags::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ResolveOptions {
    /// Options from the `[http]`, `[retry]` and `[clean]` config sections.
    ///
    /// An `allow_listed` cookie policy uses the store's domain table at call time.
    pub fn from_config(cfg: &UrlscrubConfig) -> Self {
        let http = &cfg.http;
        let mut tls = if http.verify_tls {
            TlsOptions::verified()
        } else {
            TlsOptions::unverified()
        };
        if let Some(bundle) = &http.ca_bundle {
            tls = tls.with_ca_bundle(bundle);
        }

        let cookie_policy = match http.cookie_policy {
            crate::cookies::CookiePolicyKind::AllowListed => None,
            kind => Some(kind.into_policy(&Default::default())),
        };

        let mut retry = cfg
            .retry
            .as_ref()
            .map(|r| r.to_policy())
            .unwrap_or_default();
        retry.max_retries = http.max_retries;

        Self {
            method: http.method.to_ascii_uppercase(),
            timeout: Duration::from_secs(http.timeout_secs),
            max_redirects: http.max_redirects,
            status_retry: http.status_retry.clone(),
            headers: default_headers(),
            cookie_policy,
            tls,
            max_body_bytes: http.max_fetch_size,
            parse_documents: http.parse_documents,
            clean: cfg.clean.unwrap_or_default(),
            retry,
        }
    }

    fn reads_body(&self) -> bool {
        self.parse_documents && !self.method.eq_ignore_ascii_case("HEAD")
    }
}

/// Where the loop goes after one response.
enum Step {
    Done,
    Retry(Duration),
    Follow(String),
}

/// Follows `url` to its final destination, cleaning every hop.
///
/// Blocks the current thread; see [`resolve_async`] for async callers.
pub fn resolve(store: &RulesetStore, url: &str, opts: &ResolveOptions) -> Result<String, ResolveError> {
    let cleaner = store.cleaner();
    let policy = opts
        .cookie_policy
        .clone()
        .unwrap_or_else(|| CookiePolicy::AllowListed(store.domains().clone()));
    let mut jar = CookieJar::new(policy);
    let fetch_opts = FetchOptions {
        timeout: opts.timeout,
        tls: &opts.tls,
        max_body_bytes: if opts.reads_body() { opts.max_body_bytes } else { 0 },
    };

    let mut current = UrlValue::parse(&cleaner.clean(url, &opts.clean)?)?;
    let mut redirects = 0u32;
    let mut retries = 0u32;

    loop {
        let mut request = HopRequest::new(&opts.method, current.clone(), &opts.headers);
        jar.add_cookie_header(&mut request);
        tracing::debug!(url = %current, redirects, retries, "requesting");

        let response = match fetch(&request, &fetch_opts) {
            Ok(response) => response,
            Err(e) => match opts.retry.decide(retries, classify_curl_error(&e)) {
                RetryDecision::RetryAfter(delay) => {
                    retries += 1;
                    tracing::warn!(url = %current, error = %e, retry = retries, ?delay, "transport failure; retrying");
                    std::thread::sleep(delay);
                    continue;
                }
                RetryDecision::NoRetry => {
                    return Err(ResolveError::Connect {
                        url: current.to_string(),
                        source: e,
                    })
                }
            },
        };

        jar.extract_cookies(&request, response.headers_all("set-cookie"));

        let step = next_step(store, &current, &response, opts, retries)?;
        match step {
            Step::Done => {
                tracing::debug!(url = %current, status = response.status, "resolved");
                return Ok(current.to_string());
            }
            Step::Retry(delay) => {
                retries += 1;
                tracing::warn!(url = %current, status = response.status, retry = retries, ?delay, "retryable status");
                std::thread::sleep(delay);
            }
            Step::Follow(target) => {
                redirects += 1;
                let cleaned = cleaner.clean(&target, &opts.clean)?;
                if redirects > opts.max_redirects {
                    return Err(ResolveError::TooManyRedirects {
                        url: cleaned,
                        max: opts.max_redirects,
                    });
                }
                tracing::info!(from = %current, to = %cleaned, redirects, "following redirect");
                current = UrlValue::parse(&cleaned)?;
            }
        }
    }
}

fn next_step(
    store: &RulesetStore,
    current: &UrlValue,
    response: &FetchResponse,
    opts: &ResolveOptions,
    retries: u32,
) -> Result<Step, ResolveError> {
    let status = response.status;
    let kind = classify_http_status(status, &opts.status_retry);
    if kind != ErrorKind::Other && opts.retry.max_retries > 0 {
        return match opts.retry.decide(retries, kind) {
            RetryDecision::RetryAfter(backoff) => {
                let delay = response
                    .header("retry-after")
                    .and_then(|v| parse_retry_after(v, Utc::now()))
                    .map(|d| opts.retry.clamp(d))
                    .unwrap_or(backoff);
                Ok(Step::Retry(delay))
            }
            RetryDecision::NoRetry => Err(ResolveError::MaxRetries {
                url: current.to_string(),
                status,
            }),
        };
    }

    let location = response
        .header("location")
        .or_else(|| response.header("content-location"));
    if let Some(location) = location {
        let target = requote(&resolve_location(current, location));
        if target == current.to_string() {
            tracing::debug!(url = %current, "redirect points at itself");
            return Ok(Step::Done);
        }
        return Ok(Step::Follow(target));
    }
    if REDIRECT_STATUSES.contains(&status) {
        tracing::debug!(url = %current, status, "redirect status without a target");
    }

    if opts.reads_body() {
        if let Some(target) = find_body_redirect(store.body_redirects(), current, response) {
            tracing::info!(url = %current, "following body redirect");
            return Ok(Step::Follow(requote(&target)));
        }
    }
    Ok(Step::Done)
}

/// Async wrapper: runs [`resolve`] on tokio's blocking pool.
pub async fn resolve_async(
    store: Arc<RulesetStore>,
    url: String,
    opts: ResolveOptions,
) -> Result<String, ResolveError> {
    let input = url.clone();
    match tokio::task::spawn_blocking(move || resolve(&store, &url, &opts)).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(ResolveError::Aborted {
            url: input,
            reason: e.to_string(),
        }),
    }
}
