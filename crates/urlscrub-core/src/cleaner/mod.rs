//! URL canonicalization: applies provider rules to a URL.
//!
//! One pass walks every provider in order against the current URL state,
//! accumulating edits. A redirection rule that fires replaces the URL and
//! starts a new pass; at most `MAX_REWRITES` such restarts happen per call.

mod query;

pub use query::filter_query;

use serde::{Deserialize, Serialize};

use crate::error::CleanError;
use crate::ruleset::{Provider, RulesetStore};
use crate::url_model::{prepend_scheme_if_needed, requote, unquote, UrlValue};

/// Redirection rewrites allowed in a single `clean` call.
pub const MAX_REWRITES: usize = 16;

/// Switches for `Cleaner::clean`. Everything defaults to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanFlags {
    pub ignore_referral_marketing: bool,
    pub ignore_rules: bool,
    pub ignore_exceptions: bool,
    pub ignore_raw_rules: bool,
    pub ignore_redirections: bool,
    /// Skip providers marked `completeProvider`.
    pub skip_blocked: bool,
    /// Return loopback/private URLs untouched.
    pub skip_local: bool,
    pub strip_duplicates: bool,
    pub strip_empty: bool,
}

/// Borrowing view over a store's providers.
#[derive(Debug, Clone, Copy)]
pub struct Cleaner<'a> {
    providers: &'a [Provider],
}

enum Pass {
    Done,
    Rewritten(UrlValue),
}

impl<'a> Cleaner<'a> {
    pub fn new(store: &'a RulesetStore) -> Self {
        Self {
            providers: store.providers(),
        }
    }

    pub fn from_providers(providers: &'a [Provider]) -> Self {
        Self { providers }
    }

    /// Strips tracking fields from `url` and follows redirection rules.
    ///
    /// # Examples
    ///
    /// - `https://deezer.com/track/891177062?utm_source=deezer` → `https://deezer.com/track/891177062`
    /// - `https://www.google.com/url?q=https://pypi.org/project/Unalix` → `https://pypi.org/project/Unalix`
    pub fn clean(&self, url: &str, flags: &CleanFlags) -> Result<String, CleanError> {
        let mut current = UrlValue::parse(url)?;
        let mut rewrites = 0usize;

        if flags.skip_local && current.is_local() {
            return Ok(current.to_string());
        }

        loop {
            let follow = !flags.ignore_redirections && rewrites < MAX_REWRITES;
            match self.pass(&mut current, flags, follow) {
                Pass::Done => break,
                Pass::Rewritten(next) => {
                    rewrites += 1;
                    tracing::trace!(from = %current, to = %next, "redirection rule rewrote url");
                    if rewrites == MAX_REWRITES {
                        tracing::warn!(
                            url = %next,
                            max = MAX_REWRITES,
                            "redirection rewrite limit reached; ignoring further redirections"
                        );
                    }
                    current = next;
                    if flags.skip_local && current.is_local() {
                        return Ok(current.to_string());
                    }
                }
            }
        }

        if !current.query.is_empty() {
            current.query = filter_query(&current.query, flags.strip_empty, flags.strip_duplicates);
        }
        if current.fragment.contains('=') {
            current.fragment =
                filter_query(&current.fragment, flags.strip_empty, flags.strip_duplicates);
        }
        Ok(current.to_string())
    }

    /// One walk over all providers. Edits `url` in place unless a redirection fires.
    fn pass(&self, url: &mut UrlValue, flags: &CleanFlags, follow_redirections: bool) -> Pass {
        for provider in self.providers {
            if flags.skip_blocked && provider.complete_provider {
                continue;
            }
            if !provider.url_pattern.is_match(&url.origin()) {
                continue;
            }

            let serialized = url.to_string();
            if !flags.ignore_exceptions && provider.exceptions.iter().any(|e| e.is_match(&serialized)) {
                continue;
            }

            if follow_redirections {
                if let Some(next) = redirect_target(provider, &serialized) {
                    return Pass::Rewritten(next);
                }
            }

            if !url.query.is_empty() {
                url.query = strip_tracking_fields(provider, &url.query, flags);
            }
            if !url.fragment.is_empty() {
                url.fragment = strip_tracking_fields(provider, &url.fragment, flags);
            }
            if !url.path.is_empty() && !flags.ignore_raw_rules {
                for raw in &provider.raw_rules {
                    url.path = raw.strip_all(&url.path);
                }
            }
        }
        Pass::Done
    }
}

/// First usable rewrite produced by the provider's redirection rules.
fn redirect_target(provider: &Provider, serialized: &str) -> Option<UrlValue> {
    for redirection in &provider.redirections {
        let result = redirection.substitute_first_group(serialized);
        if result.is_empty() || result == serialized {
            continue;
        }
        let target = prepend_scheme_if_needed(&requote(&unquote(&result)));
        match UrlValue::parse(&target) {
            Ok(mut next) => {
                // Only the first `?` delimits the query; later ones were `%3F` before decoding.
                if next.query.contains('?') {
                    next.query = next.query.replace('?', "%3F");
                }
                return Some(next);
            }
            Err(e) => {
                tracing::debug!(
                    provider = %provider.name,
                    rule = redirection.source(),
                    error = %e,
                    "ignoring unusable redirection target"
                );
            }
        }
    }
    None
}

fn strip_tracking_fields(provider: &Provider, fields: &str, flags: &CleanFlags) -> String {
    let mut out = fields.to_string();
    if !flags.ignore_rules {
        for rule in &provider.rules {
            out = rule.strip_fields(&out);
        }
    }
    if !flags.ignore_referral_marketing {
        for referral in &provider.referral_marketing {
            out = referral.strip_fields(&out);
        }
    }
    out
}
