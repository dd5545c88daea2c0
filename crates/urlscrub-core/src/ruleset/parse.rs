//! Serde shapes of the on-disk rule documents.
//!
//! These mirror the ClearURLs `data.min.json` layout plus the body-redirect
//! and cookie allow-list documents. Unknown keys are ignored so upstream
//! additions do not break loading.

use serde::Deserialize;

/// Root of a rule document: `{"providers": {name: {...}}}`.
///
/// Providers stay a JSON map (insertion ordered via `preserve_order`) so
/// declaration order survives into the compiled table.
#[derive(Debug, Deserialize)]
pub(crate) struct RulesDocument {
    pub providers: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProviderDocument {
    pub url_pattern: String,
    #[serde(default)]
    pub complete_provider: bool,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub raw_rules: Vec<String>,
    #[serde(default)]
    pub referral_marketing: Vec<String>,
    #[serde(default)]
    pub exceptions: Vec<String>,
    #[serde(default)]
    pub redirections: Vec<String>,
    #[serde(default)]
    pub force_redirection: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BodyRedirectDocument {
    pub provider_name: String,
    #[serde(default)]
    pub url_pattern: Option<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    pub rules: Vec<String>,
}
