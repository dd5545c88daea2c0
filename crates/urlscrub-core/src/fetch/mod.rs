//! One HTTP/1.1 exchange over libcurl.
//!
//! Redirects are never followed here; the resolver drives hops itself. The
//! body is read only up to a cap, after which the transfer is cut short.

mod parse;

pub(crate) use parse::content_type_charset;

use curl::easy::{Easy, List};
use std::time::Duration;

use crate::cookies::HopRequest;
use crate::tls::TlsOptions;

/// Per-exchange settings.
#[derive(Debug, Clone)]
pub struct FetchOptions<'a> {
    /// Connect and transfer deadline for this exchange.
    pub timeout: Duration,
    pub tls: &'a TlsOptions,
    /// Body bytes to keep; 0 stops the transfer once headers arrive.
    pub max_body_bytes: usize,
}

/// Status, headers and (possibly truncated) body of one response.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u32,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// The body was cut at `max_body_bytes`.
    pub truncated: bool,
}

impl FetchResponse {
    /// First header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every header named `name`, in received order.
    pub fn headers_all<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s str> + 's {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `charset` from `Content-Type`, if declared.
    pub fn charset(&self) -> Option<&str> {
        self.header("content-type").and_then(content_type_charset)
    }
}

/// Sends `request` and collects the response.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn fetch(request: &HopRequest, opts: &FetchOptions<'_>) -> Result<FetchResponse, curl::Error> {
    let url = request.url();
    let mut lines: Vec<String> = Vec::new();
    let mut body: Vec<u8> = Vec::new();
    let mut truncated = false;

    let mut easy = Easy::new();
    easy.url(&url.to_string())?;
    easy.follow_location(false)?;
    easy.connect_timeout(opts.timeout)?;
    easy.timeout(opts.timeout)?;

    match request.method() {
        "GET" => {}
        "HEAD" => easy.nobody(true)?,
        other => easy.custom_request(other)?,
    }

    if url.scheme == "https" {
        opts.tls.apply(&mut easy)?;
    } else {
        easy.http_version(curl::easy::HttpVersion::V11)?;
    }

    let mut list = List::new();
    for (k, v) in request.headers() {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    easy.http_headers(list)?;

    let cap = opts.max_body_bytes;
    let result = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            lines.push(String::from_utf8_lossy(data).trim_end().to_string());
            true
        })?;
        transfer.write_function(|data| {
            let room = cap.saturating_sub(body.len());
            if data.len() > room {
                body.extend_from_slice(&data[..room]);
                truncated = true;
                // Short write aborts the transfer.
                return Ok(0);
            }
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()
    };

    match result {
        Ok(()) => {}
        Err(e) if e.is_write_error() && truncated => {
            tracing::trace!(url = %url, kept = body.len(), "response body cut at cap");
        }
        Err(e) => return Err(e),
    }

    let status = easy.response_code()?;
    Ok(FetchResponse {
        status,
        headers: parse::parse_header_lines(&lines),
        body,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(headers: &[(&str, &str)]) -> FetchResponse {
        FetchResponse {
            status: 200,
            headers: headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn header_lookup_ignores_case() {
        let r = response(&[("Location", "/a"), ("set-cookie", "a=1"), ("Set-Cookie", "b=2")]);
        assert_eq!(r.header("location"), Some("/a"));
        assert_eq!(r.headers_all("SET-COOKIE").collect::<Vec<_>>(), ["a=1", "b=2"]);
        assert_eq!(r.header("content-location"), None);
    }

    #[test]
    fn header_value_outlives_the_lookup_name() {
        let r = response(&[("Retry-After", "5")]);
        let value = {
            let name = String::from("retry-after");
            r.header(&name)
        };
        assert_eq!(value, Some("5"));
    }

    #[test]
    fn charset_from_content_type() {
        let r = response(&[("Content-Type", "text/html; charset=windows-1252")]);
        assert_eq!(r.charset(), Some("windows-1252"));
        assert_eq!(response(&[]).charset(), None);
    }
}
