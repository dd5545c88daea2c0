//! Build compiled rule tables from documents on disk or in memory.
//!
//! Every loader is all-or-nothing: the first malformed document or pattern
//! aborts the load and nothing is returned.

use std::path::Path;

use crate::error::LoadError;
use crate::pattern::{Pattern, PatternKind};

use super::parse::{BodyRedirectDocument, ProviderDocument, RulesDocument};
use super::{BodyRedirect, Domains, Provider};

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn json_error(origin: &str, source: serde_json::Error) -> LoadError {
    LoadError::Json {
        origin: origin.to_string(),
        source,
    }
}

fn compile(provider: &str, raw: &str, kind: PatternKind) -> Result<Pattern, LoadError> {
    Pattern::compile(raw, kind).map_err(|e| LoadError::Pattern {
        provider: provider.to_string(),
        pattern: raw.to_string(),
        source: Box::new(e),
    })
}

fn compile_all(provider: &str, raws: &[String], kind: PatternKind) -> Result<Vec<Pattern>, LoadError> {
    raws.iter().map(|raw| compile(provider, raw, kind)).collect()
}

/// Parses one rule document. `origin` names the source in error messages.
pub fn providers_from_str(origin: &str, text: &str) -> Result<Vec<Provider>, LoadError> {
    let doc: RulesDocument = serde_json::from_str(text).map_err(|e| json_error(origin, e))?;
    let mut providers = Vec::with_capacity(doc.providers.len());

    for (name, value) in doc.providers {
        let p: ProviderDocument = serde_json::from_value(value)
            .map_err(|e| json_error(&format!("{origin}: provider {name:?}"), e))?;
        providers.push(Provider {
            url_pattern: compile(&name, &p.url_pattern, PatternKind::Anchored)?,
            complete_provider: p.complete_provider,
            rules: compile_all(&name, &p.rules, PatternKind::QueryField)?,
            raw_rules: compile_all(&name, &p.raw_rules, PatternKind::Raw)?,
            referral_marketing: compile_all(&name, &p.referral_marketing, PatternKind::QueryField)?,
            exceptions: compile_all(&name, &p.exceptions, PatternKind::Anchored)?,
            redirections: compile_all(&name, &p.redirections, PatternKind::Redirection)?,
            force_redirection: p.force_redirection,
            name,
        });
    }
    Ok(providers)
}

/// Parses one body-redirect document.
pub fn body_redirects_from_str(origin: &str, text: &str) -> Result<Vec<BodyRedirect>, LoadError> {
    let docs: Vec<BodyRedirectDocument> =
        serde_json::from_str(text).map_err(|e| json_error(origin, e))?;
    let mut out = Vec::with_capacity(docs.len());

    for d in docs {
        let url_pattern = d
            .url_pattern
            .as_deref()
            .map(|raw| compile(&d.provider_name, raw, PatternKind::Anchored))
            .transpose()?;
        let rules = compile_all(&d.provider_name, &d.rules, PatternKind::Raw)?;
        if let Some(bad) = rules.iter().find(|r| r.capture_groups() == 0) {
            return Err(LoadError::MissingCaptureGroup {
                provider: d.provider_name.clone(),
                pattern: bad.source().to_string(),
            });
        }
        out.push(BodyRedirect {
            provider_name: d.provider_name,
            url_pattern,
            domains: d.domains.into_iter().collect(),
            rules,
        });
    }
    Ok(out)
}

/// Parses one allow-list document (a flat JSON list of host names).
pub fn domains_from_str(origin: &str, text: &str) -> Result<Domains, LoadError> {
    let hosts: Vec<String> = serde_json::from_str(text).map_err(|e| json_error(origin, e))?;
    Ok(hosts.into_iter().collect())
}

/// Loads rule documents in order; providers keep file-then-declaration order.
pub fn load_providers<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Provider>, LoadError> {
    let mut providers = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let loaded = providers_from_str(&path.display().to_string(), &read(path)?)?;
        tracing::debug!(path = %path.display(), providers = loaded.len(), "loaded rule document");
        providers.extend(loaded);
    }
    Ok(providers)
}

pub fn load_body_redirects<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<BodyRedirect>, LoadError> {
    let mut rules = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let loaded = body_redirects_from_str(&path.display().to_string(), &read(path)?)?;
        tracing::debug!(path = %path.display(), rules = loaded.len(), "loaded body-redirect document");
        rules.extend(loaded);
    }
    Ok(rules)
}

pub fn load_domains<P: AsRef<Path>>(paths: &[P]) -> Result<Domains, LoadError> {
    let mut domains = Domains::default();
    for path in paths {
        let path = path.as_ref();
        domains.absorb(domains_from_str(&path.display().to_string(), &read(path)?)?);
    }
    Ok(domains)
}
