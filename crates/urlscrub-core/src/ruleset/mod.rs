//! Rule tables: providers, body-redirect rules and the cookie domain allow-list.
//!
//! Tables are built once (from files, strings or the bundled data) and never
//! mutated afterwards; share a `RulesetStore` by reference or `Arc`.

mod bundled;
mod load;
pub(crate) mod parse;

pub use load::{
    body_redirects_from_str, domains_from_str, load_body_redirects, load_domains,
    load_providers, providers_from_str,
};

use std::collections::HashSet;
use std::path::PathBuf;

use crate::cleaner::{CleanFlags, Cleaner};
use crate::error::{CleanError, LoadError};
use crate::pattern::Pattern;

/// One named group of rules scoped by `url_pattern`.
#[derive(Debug, Clone)]
pub struct Provider {
    pub name: String,
    pub url_pattern: Pattern,
    pub complete_provider: bool,
    pub rules: Vec<Pattern>,
    pub raw_rules: Vec<Pattern>,
    pub referral_marketing: Vec<Pattern>,
    pub exceptions: Vec<Pattern>,
    pub redirections: Vec<Pattern>,
    /// Carried from the document; has no effect on cleaning.
    pub force_redirection: bool,
}

/// A rule for finding a redirect target inside a response body.
#[derive(Debug, Clone)]
pub struct BodyRedirect {
    pub provider_name: String,
    pub url_pattern: Option<Pattern>,
    pub domains: Domains,
    /// Each rule has at least one capture group; group 1 is the target.
    pub rules: Vec<Pattern>,
}

impl BodyRedirect {
    /// True if this rule should be tried for a response from `url` on `host`.
    pub fn applies_to(&self, host: &str, url: &str) -> bool {
        self.domains.contains(host)
            || self
                .url_pattern
                .as_ref()
                .map(|p| p.is_match(url))
                .unwrap_or(false)
    }
}

/// Set of lowercase host names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Domains(HashSet<String>);

impl Domains {
    fn normalize(host: &str) -> String {
        host.trim_start_matches('.').to_ascii_lowercase()
    }

    /// Exact membership; a leading dot on `host` is ignored.
    pub fn contains(&self, host: &str) -> bool {
        self.0.contains(&Self::normalize(host))
    }

    pub fn insert(&mut self, host: &str) -> bool {
        self.0.insert(Self::normalize(host))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Moves every host of `other` into this set.
    pub fn absorb(&mut self, other: Domains) {
        self.0.extend(other.0);
    }
}

impl<S: AsRef<str>> FromIterator<S> for Domains {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut domains = Domains::default();
        domains.extend(iter);
        domains
    }
}

impl<S: AsRef<str>> Extend<S> for Domains {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for host in iter {
            self.insert(host.as_ref());
        }
    }
}

/// Files to build a `RulesetStore` from. Each list is loaded in order.
#[derive(Debug, Clone, Default)]
pub struct RulesetPaths {
    pub rulesets: Vec<PathBuf>,
    pub body_redirects: Vec<PathBuf>,
    pub cookie_allow: Vec<PathBuf>,
}

/// Immutable rule tables.
#[derive(Debug, Clone, Default)]
pub struct RulesetStore {
    providers: Vec<Provider>,
    body_redirects: Vec<BodyRedirect>,
    domains: Domains,
}

impl RulesetStore {
    pub fn new(providers: Vec<Provider>, body_redirects: Vec<BodyRedirect>, domains: Domains) -> Self {
        Self {
            providers,
            body_redirects,
            domains,
        }
    }

    /// Loads every table from disk; fails on the first bad file.
    pub fn load(paths: &RulesetPaths) -> Result<Self, LoadError> {
        let store = Self::new(
            load_providers(&paths.rulesets)?,
            load_body_redirects(&paths.body_redirects)?,
            load_domains(&paths.cookie_allow)?,
        );
        tracing::debug!(
            providers = store.providers.len(),
            body_redirects = store.body_redirects.len(),
            domains = store.domains.len(),
            "ruleset store loaded"
        );
        Ok(store)
    }

    /// The rule data shipped with the crate.
    pub fn bundled() -> Result<Self, LoadError> {
        bundled::store()
    }

    /// Appends another store's tables after this one's.
    pub fn merge(mut self, other: RulesetStore) -> Self {
        self.providers.extend(other.providers);
        self.body_redirects.extend(other.body_redirects);
        self.domains.absorb(other.domains);
        self
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn body_redirects(&self) -> &[BodyRedirect] {
        &self.body_redirects
    }

    /// Cookie domain allow-list.
    pub fn domains(&self) -> &Domains {
        &self.domains
    }

    pub fn cleaner(&self) -> Cleaner<'_> {
        Cleaner::new(self)
    }

    /// Shorthand for `self.cleaner().clean(url, flags)`.
    pub fn clean(&self, url: &str, flags: &CleanFlags) -> Result<String, CleanError> {
        self.cleaner().clean(url, flags)
    }
}
