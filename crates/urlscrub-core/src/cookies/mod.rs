//! Cookie policy and the per-call cookie jar used by the resolver.
//!
//! Some shorteners only redirect once a session cookie is echoed back, so
//! the resolver keeps cookies between hops, subject to a `CookiePolicy`.

mod parse;
mod request;

pub use parse::{parse_set_cookie, Cookie};
pub use request::HopRequest;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ruleset::Domains;

/// Which cookies the jar accepts.
#[derive(Debug, Clone)]
pub enum CookiePolicy {
    RejectAll,
    AllowAll,
    /// Accept cookies only for listed domains (leading dot optional).
    AllowListed(Domains),
}

impl CookiePolicy {
    /// Whether a cookie whose policy domain is `domain` may be stored.
    pub fn allows(&self, domain: &str) -> bool {
        match self {
            CookiePolicy::RejectAll => false,
            CookiePolicy::AllowAll => true,
            CookiePolicy::AllowListed(domains) => domains.contains(domain),
        }
    }
}

/// Config-file spelling of a policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookiePolicyKind {
    RejectAll,
    AllowAll,
    #[default]
    AllowListed,
}

impl CookiePolicyKind {
    /// Builds the policy; `AllowListed` uses `allow_list`.
    pub fn into_policy(self, allow_list: &Domains) -> CookiePolicy {
        match self {
            CookiePolicyKind::RejectAll => CookiePolicy::RejectAll,
            CookiePolicyKind::AllowAll => CookiePolicy::AllowAll,
            CookiePolicyKind::AllowListed => CookiePolicy::AllowListed(allow_list.clone()),
        }
    }
}

/// Cookies collected during one resolve call.
#[derive(Debug)]
pub struct CookieJar {
    policy: CookiePolicy,
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new(policy: CookiePolicy) -> Self {
        Self {
            policy,
            cookies: Vec::new(),
        }
    }

    pub fn policy(&self) -> &CookiePolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// `Cookie` header value for `request`, if any cookie applies.
    pub fn cookie_header(&self, request: &HopRequest) -> Option<String> {
        self.cookie_header_at(request, Utc::now())
    }

    fn cookie_header_at(&self, request: &HopRequest, now: DateTime<Utc>) -> Option<String> {
        let mut matching: Vec<&Cookie> = self
            .cookies
            .iter()
            .filter(|c| c.matches(request.url(), now))
            .collect();
        if matching.is_empty() {
            return None;
        }
        // Longer paths first.
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        Some(
            matching
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Sets the request's `Cookie` header from matching cookies.
    pub fn add_cookie_header(&self, request: &mut HopRequest) {
        if let Some(value) = self.cookie_header(request) {
            request.set_header("Cookie", value);
        }
    }

    /// Stores cookies from `Set-Cookie` values received for `request`.
    pub fn extract_cookies<'h, I>(&mut self, request: &HopRequest, set_cookie: I)
    where
        I: IntoIterator<Item = &'h str>,
    {
        self.extract_cookies_at(request, set_cookie, Utc::now())
    }

    fn extract_cookies_at<'h, I>(&mut self, request: &HopRequest, set_cookie: I, now: DateTime<Utc>)
    where
        I: IntoIterator<Item = &'h str>,
    {
        for header in set_cookie {
            let Some(cookie) = parse_set_cookie(header, request.url(), now) else {
                tracing::debug!(header, "ignoring malformed Set-Cookie");
                continue;
            };
            if !self.policy.allows(&cookie.policy_domain()) {
                tracing::debug!(
                    name = %cookie.name,
                    domain = %cookie.policy_domain(),
                    "cookie rejected by policy"
                );
                continue;
            }

            self.cookies.retain(|c| {
                !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path)
            });
            if !cookie.is_expired(now) {
                self.cookies.push(cookie);
            }
        }
    }
}
