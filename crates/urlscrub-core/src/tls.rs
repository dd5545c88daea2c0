//! Client TLS settings for resolver connections.

use curl::easy::{Easy, HttpVersion, SslVersion};
use std::path::{Path, PathBuf};

/// Forward-secure suites first; no anonymous, null, MD5 or DSS suites.
pub const CIPHERS: &str = "ECDHE+AESGCM:ECDHE+CHACHA20:DHE+AESGCM:DHE+CHACHA20:ECDH+AESGCM:DH+AESGCM:ECDH+AES:DH+AES:RSA+AESGCM:RSA+AES:!aNULL:!eNULL:!MD5:!DSS";

/// Trust anchors shipped with the crate (Mozilla root program, PEM).
pub const BUNDLED_CA: &[u8] = include_bytes!("../data/ca/ca-bundle.crt");

/// `CURLE_NOT_BUILT_IN`: the TLS backend cannot take in-memory CA blobs.
const CURLE_NOT_BUILT_IN: u32 = 4;

/// TLS options applied to every https exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    /// Verify the peer certificate chain and the host name.
    pub verify: bool,
    /// PEM bundle overriding the bundled trust anchors.
    pub ca_bundle: Option<PathBuf>,
    pub ciphers: String,
}

/// Where a verifying handle gets its roots from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustAnchors<'a> {
    Bundled,
    File(&'a Path),
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self::verified()
    }
}

impl TlsOptions {
    pub fn verified() -> Self {
        Self {
            verify: true,
            ca_bundle: None,
            ciphers: CIPHERS.to_string(),
        }
    }

    /// Skips certificate and host checks. For diagnosing broken servers only.
    pub fn unverified() -> Self {
        Self {
            verify: false,
            ..Self::verified()
        }
    }

    pub fn with_ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    /// The override file if it exists, else the bundled roots.
    pub fn trust_anchors(&self) -> TrustAnchors<'_> {
        match &self.ca_bundle {
            Some(bundle) if bundle.is_file() => TrustAnchors::File(bundle),
            Some(bundle) => {
                tracing::warn!(path = %bundle.display(), "CA bundle not found; using bundled roots");
                TrustAnchors::Bundled
            }
            None => TrustAnchors::Bundled,
        }
    }

    /// Configures `easy`: TLS 1.2 to 1.3, cipher list, verification, trust anchors and HTTP/1.1 only.
    pub fn apply(&self, easy: &mut Easy) -> Result<(), curl::Error> {
        easy.ssl_verify_peer(self.verify)?;
        easy.ssl_verify_host(self.verify)?;
        easy.ssl_min_max_version(SslVersion::Tlsv12, SslVersion::Tlsv13)?;
        easy.ssl_cipher_list(&self.ciphers)?;
        if self.verify {
            match self.trust_anchors() {
                TrustAnchors::File(path) => easy.cainfo(path)?,
                TrustAnchors::Bundled => match easy.ssl_cainfo_blob(BUNDLED_CA) {
                    Ok(()) => {}
                    Err(e) if e.is_unknown_option() || e.code() == CURLE_NOT_BUILT_IN => {
                        tracing::warn!(error = %e, "libcurl cannot load bundled roots; using platform trust store");
                    }
                    Err(e) => return Err(e),
                },
            }
        }
        // Only http/1.1 is offered via ALPN.
        easy.http_version(HttpVersion::V11)?;
        Ok(())
    }
}
