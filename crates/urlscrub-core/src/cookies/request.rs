//! The request a cookie jar reads from and writes to.

use crate::url_model::UrlValue;

/// Outgoing request for one resolver hop.
#[derive(Debug, Clone)]
pub struct HopRequest {
    method: String,
    url: UrlValue,
    headers: Vec<(String, String)>,
}

impl HopRequest {
    pub fn new(method: &str, url: UrlValue, headers: &[(String, String)]) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url,
            headers: headers.to_vec(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &UrlValue {
        &self.url
    }

    /// Headers to send, in order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Replaces any header named `name` (case-insensitive), else appends.
    pub(crate) fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }

    #[cfg(test)]
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
