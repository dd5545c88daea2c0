//! ClearURLs-compatible URL cleaning plus a redirect-following resolver.
//!
//! [`RulesetStore`] holds the provider rules; [`Cleaner::clean`] strips
//! tracking fields without I/O, and [`resolve`] follows redirects hop by hop,
//! cleaning each one.

pub mod cleaner;
pub mod config;
pub mod cookies;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod pattern;
pub mod resolver;
pub mod retry;
pub mod ruleset;
pub mod tls;
pub mod url_model;

pub use cleaner::{CleanFlags, Cleaner};
pub use config::UrlscrubConfig;
pub use error::{CleanError, LoadError, ResolveError};
pub use resolver::{resolve, resolve_async, ResolveOptions};
pub use ruleset::{RulesetPaths, RulesetStore};
pub use tls::TlsOptions;
