use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cleaner::CleanFlags;
use crate::cookies::CookiePolicyKind;
use crate::retry::{RetryPolicy, DEFAULT_STATUS_RETRY};
use crate::ruleset::{RulesetPaths, RulesetStore};

/// Backoff parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds; also caps `Retry-After`.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    /// Policy with these delays; the retry budget comes from `[http]`.
    pub fn to_policy(&self) -> RetryPolicy {
        let base = Duration::try_from_secs_f64(self.base_delay_secs).unwrap_or_default();
        RetryPolicy {
            base_delay: base,
            max_delay: Duration::from_secs(self.max_delay_secs),
            ..RetryPolicy::default()
        }
    }
}

/// Extra rule documents layered over the bundled ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Load the rule data compiled into the library first.
    pub include_bundled: bool,
    pub rulesets: Vec<PathBuf>,
    pub body_redirects: Vec<PathBuf>,
    pub cookie_allow: Vec<PathBuf>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            include_bundled: true,
            rulesets: Vec::new(),
            body_redirects: Vec::new(),
            cookie_allow: Vec::new(),
        }
    }
}

/// Resolver transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub method: String,
    pub timeout_secs: u64,
    pub max_redirects: u32,
    /// Retries per resolve call; 0 turns retrying off.
    pub max_retries: u32,
    pub status_retry: Vec<u32>,
    /// Body bytes read when looking for body redirects.
    pub max_fetch_size: usize,
    pub parse_documents: bool,
    pub verify_tls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<PathBuf>,
    pub cookie_policy: CookiePolicyKind,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            timeout_secs: 8,
            max_redirects: 13,
            max_retries: 0,
            status_retry: DEFAULT_STATUS_RETRY.to_vec(),
            max_fetch_size: 1024 * 1024,
            parse_documents: false,
            verify_tls: true,
            ca_bundle: None,
            cookie_policy: CookiePolicyKind::AllowListed,
        }
    }
}

/// Global configuration loaded from `~/.config/urlscrub/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlscrubConfig {
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Optional backoff policy; if missing, built-in defaults are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
    /// Optional clean flags for resolver hops; all off when missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean: Option<CleanFlags>,
}

impl UrlscrubConfig {
    /// Rule store described by `[rules]`: bundled data (if enabled) merged
    /// with the extra documents, in that order.
    pub fn ruleset_store(&self) -> Result<RulesetStore> {
        let extra = RulesetPaths {
            rulesets: self.rules.rulesets.clone(),
            body_redirects: self.rules.body_redirects.clone(),
            cookie_allow: self.rules.cookie_allow.clone(),
        };
        let extra = RulesetStore::load(&extra).context("load configured rule documents")?;
        if !self.rules.include_bundled {
            return Ok(extra);
        }
        let bundled = RulesetStore::bundled().context("load bundled rule data")?;
        Ok(bundled.merge(extra))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("urlscrub")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<UrlscrubConfig> {
    let path = config_path()?;
    load_or_init_at(&path)
}

/// Same as [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<UrlscrubConfig> {
    if !path.exists() {
        let default_cfg = UrlscrubConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config dir {}", parent.display()))?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: UrlscrubConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = UrlscrubConfig::default();
        assert!(cfg.rules.include_bundled);
        assert!(cfg.rules.rulesets.is_empty());
        assert_eq!(cfg.http.method, "GET");
        assert_eq!(cfg.http.timeout_secs, 8);
        assert_eq!(cfg.http.max_redirects, 13);
        assert_eq!(cfg.http.max_retries, 0);
        assert_eq!(cfg.http.status_retry, [429, 500, 502, 503, 504]);
        assert_eq!(cfg.http.cookie_policy, CookiePolicyKind::AllowListed);
        assert!(cfg.retry.is_none());
        assert!(cfg.clean.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = UrlscrubConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: UrlscrubConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.http.max_redirects, cfg.http.max_redirects);
        assert_eq!(parsed.http.status_retry, cfg.http.status_retry);
        assert_eq!(parsed.rules.include_bundled, cfg.rules.include_bundled);
        assert_eq!(parsed.http.cookie_policy, cfg.http.cookie_policy);
    }

    #[test]
    fn config_toml_partial_sections() {
        let toml = r#"
            [http]
            max_retries = 3
            cookie_policy = "allow_all"

            [retry]
            base_delay_secs = 0.5
            max_delay_secs = 15
        "#;
        let cfg: UrlscrubConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.http.max_retries, 3);
        assert_eq!(cfg.http.timeout_secs, 8);
        assert_eq!(cfg.http.cookie_policy, CookiePolicyKind::AllowAll);
        let policy = cfg.retry.as_ref().unwrap().to_policy();
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(15));
        assert!(cfg.rules.include_bundled);
    }

    #[test]
    fn negative_base_delay_falls_back_to_zero() {
        let retry = RetryConfig {
            base_delay_secs: -1.0,
            max_delay_secs: 1,
        };
        assert_eq!(retry.to_policy().base_delay, Duration::ZERO);
    }

    #[test]
    fn load_or_init_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.http.max_redirects, 13);

        fs::write(&path, "[http]\nmax_redirects = 2\n").unwrap();
        let cfg = load_or_init_at(&path).unwrap();
        assert_eq!(cfg.http.max_redirects, 2);
    }

    #[test]
    fn load_or_init_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[http\n").unwrap();
        let err = load_or_init_at(&path).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn ruleset_store_without_bundled_data() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join("rules.json");
        fs::write(
            &rules,
            r#"{"providers": {"local": {"urlPattern": "^https?://local\\.example", "rules": ["trk"]}}}"#,
        )
        .unwrap();
        let cfg = UrlscrubConfig {
            rules: RulesConfig {
                include_bundled: false,
                rulesets: vec![rules],
                ..Default::default()
            },
            ..Default::default()
        };
        let store = cfg.ruleset_store().unwrap();
        assert_eq!(store.providers().len(), 1);
        assert_eq!(
            store.clean("http://local.example/?trk=1&a=2", &CleanFlags::default()).unwrap(),
            "http://local.example/?a=2"
        );

        let with_bundled = UrlscrubConfig {
            rules: RulesConfig {
                include_bundled: true,
                ..cfg.rules.clone()
            },
            ..Default::default()
        };
        let store = with_bundled.ruleset_store().unwrap();
        assert_eq!(store.providers()[0].name, "globalRules");
        assert_eq!(store.providers().last().unwrap().name, "local");
    }

    #[test]
    fn missing_rule_file_has_context() {
        let cfg = UrlscrubConfig {
            rules: RulesConfig {
                include_bundled: false,
                rulesets: vec![PathBuf::from("/nonexistent/urlscrub/rules.json")],
                ..Default::default()
            },
            ..Default::default()
        };
        let err = cfg.ruleset_store().unwrap_err();
        assert!(format!("{err:#}").contains("load configured rule documents"));
    }
}
