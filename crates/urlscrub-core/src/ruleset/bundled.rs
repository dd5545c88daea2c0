//! Rule data compiled into the crate.

use super::load::{body_redirects_from_str, domains_from_str, providers_from_str};
use super::RulesetStore;
use crate::error::LoadError;

const CLEARURLS_RULES: &str = include_str!("../../data/rulesets/data.min.json");
const LOCAL_RULES: &str = include_str!("../../data/rulesets/urlscrub.json");
const BODY_REDIRECTS: &str = include_str!("../../data/body_redirects.json");
const COOKIE_ALLOW: &str = include_str!("../../data/cookies_allow.json");

pub(super) fn store() -> Result<RulesetStore, LoadError> {
    let mut providers = providers_from_str("bundled data.min.json", CLEARURLS_RULES)?;
    providers.extend(providers_from_str("bundled urlscrub.json", LOCAL_RULES)?);
    Ok(RulesetStore::new(
        providers,
        body_redirects_from_str("bundled body_redirects.json", BODY_REDIRECTS)?,
        domains_from_str("bundled cookies_allow.json", COOKIE_ALLOW)?,
    ))
}
