//! `Set-Cookie` header parsing.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::url_model::UrlValue;

/// A cookie accepted from a response, scoped to where it may be sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Lowercase domain without a leading dot.
    pub domain: String,
    /// No `Domain` attribute: only the exact origin host gets it back.
    pub host_only: bool,
    pub path: String,
    pub secure: bool,
    pub expires: Option<DateTime<Utc>>,
}

impl Cookie {
    /// Domain string as seen by a cookie policy (`.example.com` for domain cookies).
    pub fn policy_domain(&self) -> String {
        if self.host_only {
            self.domain.clone()
        } else {
            format!(".{}", self.domain)
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.map(|at| at <= now).unwrap_or(false)
    }

    /// True if this cookie goes out with a request to `url`.
    pub fn matches(&self, url: &UrlValue, now: DateTime<Utc>) -> bool {
        if self.is_expired(now) {
            return false;
        }
        if self.secure && url.scheme != "https" {
            return false;
        }
        let host_ok = if self.host_only {
            url.host == self.domain
        } else {
            domain_matches(&url.host, &self.domain)
        };
        host_ok && path_matches(request_path(url), &self.path)
    }
}

/// Parses one `Set-Cookie` value received for `origin`.
///
/// Returns `None` for malformed headers and for `Domain` attributes that do
/// not cover the origin host. Expired cookies are returned (with `expires` in
/// the past) so the jar can delete a stored one.
pub fn parse_set_cookie(header: &str, origin: &UrlValue, now: DateTime<Utc>) -> Option<Cookie> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut domain = None;
    let mut path = None;
    let mut secure = false;
    let mut max_age = None;
    let mut expires = None;

    for attr in parts {
        let (key, val) = match attr.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attr.trim(), ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "domain" if !val.is_empty() => {
                domain = Some(val.trim_start_matches('.').to_ascii_lowercase())
            }
            "path" if val.starts_with('/') => path = Some(val.to_string()),
            "secure" => secure = true,
            "max-age" => max_age = val.parse::<i64>().ok(),
            "expires" => expires = parse_cookie_date(val),
            _ => {}
        }
    }

    let (domain, host_only) = match domain {
        Some(d) if domain_matches(&origin.host, &d) => (d, false),
        Some(_) => return None,
        None => (origin.host.clone(), true),
    };

    // Max-Age wins over Expires.
    let expires = match max_age {
        Some(secs) if secs <= 0 => Some(DateTime::<Utc>::MIN_UTC),
        Some(secs) => Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d)),
        None => expires,
    };

    Some(Cookie {
        name: name.to_string(),
        value: value.trim().to_string(),
        domain,
        host_only,
        path: path.unwrap_or_else(|| default_path(request_path(origin))),
        secure,
        expires,
    })
}

fn parse_cookie_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Netscape style: "Wed, 21-Oct-2015 07:28:00 GMT"
    NaiveDateTime::parse_from_str(s, "%a, %d-%b-%Y %H:%M:%S GMT")
        .ok()
        .map(|naive| naive.and_utc())
}

fn request_path(url: &UrlValue) -> &str {
    if url.path.is_empty() {
        "/"
    } else {
        &url.path
    }
}

fn default_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => path[..i].to_string(),
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

fn path_matches(request: &str, cookie: &str) -> bool {
    request == cookie
        || (request.starts_with(cookie)
            && (cookie.ends_with('/') || request[cookie.len()..].starts_with('/')))
}
