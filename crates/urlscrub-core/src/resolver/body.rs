//! Redirect hints inside response bodies (meta refresh, JS redirects).

use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;

use crate::fetch::FetchResponse;
use crate::ruleset::BodyRedirect;
use crate::url_model::UrlValue;

/// Decodes `body` with the declared charset; unknown or missing labels mean UTF-8.
pub fn decode_body<'b>(body: &'b [u8], charset: Option<&str>) -> Cow<'b, str> {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, had_errors) = encoding.decode(body);
    if had_errors {
        tracing::trace!(encoding = encoding.name(), "body decoded with replacement characters");
    }
    text
}

/// Raw target of the first applicable rule that matches the decoded body.
///
/// Rules are tried in order; a rule applies when its domains contain the
/// host or its URL pattern matches the current URL.
pub fn find_body_redirect(
    rules: &[BodyRedirect],
    current: &UrlValue,
    response: &FetchResponse,
) -> Option<String> {
    let serialized = current.to_string();
    let applicable: Vec<&BodyRedirect> = rules
        .iter()
        .filter(|r| r.applies_to(&current.host, &serialized))
        .collect();
    if applicable.is_empty() {
        return None;
    }

    let text = decode_body(&response.body, response.charset());
    for rule in applicable {
        if let Some(target) = rule.rules.iter().find_map(|p| p.first_group(&text)) {
            tracing::debug!(provider = %rule.provider_name, "body redirect matched");
            return Some(html_unescape(target));
        }
    }
    None
}

/// Replaces HTML character references (`&amp;`, `&#39;`, `&#x2F;`).
///
/// Only the named references that show up in URLs are known; anything
/// unrecognized is left as written.
pub fn html_unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match decode_reference(tail) {
            Some((c, used)) => {
                out.push(c);
                rest = &tail[used..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decodes one reference at the start of `s` (which begins with `&`).
fn decode_reference(s: &str) -> Option<(char, usize)> {
    let end = s.find(';')?;
    let name = &s[1..end];
    if name.is_empty() || name.len() > 10 {
        return None;
    }

    let c = if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        char::from_u32(code)?
    } else {
        match name {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => '\u{a0}',
            "sol" => '/',
            "colon" => ':',
            "quest" => '?',
            "equals" => '=',
            "num" => '#',
            "percnt" => '%',
            "plus" => '+',
            _ => return None,
        }
    };
    Some((c, end + 1))
}
