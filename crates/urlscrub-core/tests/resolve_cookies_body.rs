//! Integration test: cookie policies across hops and redirects found in response bodies.

mod common;

use std::fs;
use tempfile::tempdir;
use urlscrub_core::cookies::CookiePolicy;
use urlscrub_core::{resolve, ResolveOptions, RulesetPaths, RulesetStore};

const META_RULE: &str = r#"(?i)<meta\\s+http-equiv=\"refresh\"\\s+content=\"0;\\s*url=([^\"]+)\""#;

#[test]
fn cookies_outside_the_allow_list_are_not_echoed() {
    let base = common::redirect_server::start();
    let store = RulesetStore::bundled().unwrap();
    let resolved = resolve(&store, &format!("{}/cookie/set", base), &ResolveOptions::default()).unwrap();
    assert_eq!(resolved, format!("{}/cookie/no", base));
}

#[test]
fn allow_listed_cookies_are_echoed() {
    let base = common::redirect_server::start();
    let dir = tempdir().unwrap();
    let allow = dir.path().join("cookies_allow.json");
    fs::write(&allow, r#"["127.0.0.1"]"#).unwrap();
    let store = RulesetStore::load(&RulesetPaths {
        cookie_allow: vec![allow],
        ..Default::default()
    })
    .unwrap();

    let resolved = resolve(&store, &format!("{}/cookie/set", base), &ResolveOptions::default()).unwrap();
    assert_eq!(resolved, format!("{}/cookie/yes", base));
}

#[test]
fn explicit_policies_override_the_store() {
    let base = common::redirect_server::start();
    let store = RulesetStore::default();
    let url = format!("{}/cookie/set", base);

    let allow_all = ResolveOptions {
        cookie_policy: Some(CookiePolicy::AllowAll),
        ..Default::default()
    };
    assert_eq!(resolve(&store, &url, &allow_all).unwrap(), format!("{}/cookie/yes", base));

    let reject_all = ResolveOptions {
        cookie_policy: Some(CookiePolicy::RejectAll),
        ..Default::default()
    };
    assert_eq!(resolve(&store, &url, &reject_all).unwrap(), format!("{}/cookie/no", base));
}

fn store_with_body_rule(url_pattern: &str, domains: &str) -> RulesetStore {
    let dir = tempdir().unwrap();
    let path = dir.path().join("body_redirects.json");
    fs::write(
        &path,
        format!(
            r#"[{{"providerName": "local", "urlPattern": {}, "domains": {}, "rules": ["{}"]}}]"#,
            url_pattern, domains, META_RULE
        ),
    )
    .unwrap();
    let extra = RulesetStore::load(&RulesetPaths {
        body_redirects: vec![path],
        ..Default::default()
    })
    .unwrap();
    RulesetStore::bundled().unwrap().merge(extra)
}

#[test]
fn meta_refresh_is_followed_and_cleaned() {
    let base = common::redirect_server::start();
    let opts = ResolveOptions {
        parse_documents: true,
        ..Default::default()
    };
    let by_pattern = store_with_body_rule(r#""^http://127\\.0\\.0\\.1:\\d+/meta""#, "[]");
    let resolved = resolve(&by_pattern, &format!("{}/meta", base), &opts).unwrap();
    assert_eq!(resolved, format!("{}/ok?from=meta", base));

    let by_domain = store_with_body_rule("null", r#"["127.0.0.1"]"#);
    let resolved = resolve(&by_domain, &format!("{}/meta", base), &opts).unwrap();
    assert_eq!(resolved, format!("{}/ok?from=meta", base));
}

#[test]
fn bodies_are_ignored_unless_enabled() {
    let base = common::redirect_server::start();
    let store = store_with_body_rule("null", r#"["127.0.0.1"]"#);
    let url = format!("{}/meta", base);

    assert_eq!(resolve(&store, &url, &ResolveOptions::default()).unwrap(), url);

    let head = ResolveOptions {
        method: "HEAD".to_string(),
        parse_documents: true,
        ..Default::default()
    };
    assert_eq!(resolve(&store, &url, &head).unwrap(), url);
}

#[test]
fn body_redirects_count_against_the_bound() {
    let base = common::redirect_server::start();
    let store = store_with_body_rule("null", r#"["127.0.0.1"]"#);
    let opts = ResolveOptions {
        parse_documents: true,
        max_redirects: 0,
        ..Default::default()
    };
    let err = resolve(&store, &format!("{}/meta", base), &opts).unwrap_err();
    assert!(matches!(
        err,
        urlscrub_core::ResolveError::TooManyRedirects { max: 0, .. }
    ));
}
