//! Percent-encoding canonicalization.
//!
//! `requote` un-escapes percent sequences that encode unreserved characters
//! and escapes everything outside a fixed safe set, so differently-escaped
//! spellings of the same URL converge.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left alone when re-escaping: unreserved, reserved and `%`.
const SAFE_WITH_PERCENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'%')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b'/')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'?')
    .remove(b'@')
    .remove(b'[')
    .remove(b']');

/// Same as above but a bare `%` gets escaped too (input had broken escapes).
const SAFE_WITHOUT_PERCENT: &AsciiSet = &SAFE_WITH_PERCENT.add(b'%');

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

/// Decodes `%XX` sequences that stand for unreserved characters, leaving all
/// other escapes in place.
///
/// Returns `None` when a `%` is followed by two alphanumerics that are not
/// hex digits (e.g. `%zz`).
pub fn unquote_unreserved(uri: &str) -> Option<String> {
    let mut parts = uri.split('%');
    let mut out = String::with_capacity(uri.len());
    out.push_str(parts.next().unwrap_or(""));

    for part in parts {
        let mut chars = part.chars();
        let pair = (chars.next(), chars.next());
        match pair {
            (Some(a), Some(b)) if a.is_alphanumeric() && b.is_alphanumeric() => {
                let hex: String = [a, b].iter().collect();
                let byte = u8::from_str_radix(&hex, 16).ok()?;
                let c = char::from(byte);
                if is_unreserved(c) {
                    out.push(c);
                    out.push_str(chars.as_str());
                } else {
                    out.push('%');
                    out.push_str(part);
                }
            }
            _ => {
                out.push('%');
                out.push_str(part);
            }
        }
    }
    Some(out)
}

/// Passes `uri` through an unquote/quote cycle so it is consistently escaped.
///
/// # Examples
///
/// - `"http://a.example/%7Euser"` → `"http://a.example/~user"`
/// - `"http://a.example/a b"` → `"http://a.example/a%20b"`
/// - `"http://a.example/%zz"` → `"http://a.example/%25zz"`
pub fn requote(uri: &str) -> String {
    match unquote_unreserved(uri) {
        Some(unquoted) => utf8_percent_encode(&unquoted, SAFE_WITH_PERCENT).to_string(),
        None => utf8_percent_encode(uri, SAFE_WITHOUT_PERCENT).to_string(),
    }
}

/// Fully percent-decodes `s`; invalid UTF-8 is replaced.
pub fn unquote(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreserved_escapes_are_decoded() {
        assert_eq!(requote("http://a.example/%7Euser"), "http://a.example/~user");
        assert_eq!(requote("http://a.example/%41%2F"), "http://a.example/A%2F");
    }

    #[test]
    fn unsafe_characters_are_escaped() {
        assert_eq!(requote("http://a.example/a b"), "http://a.example/a%20b");
        assert_eq!(requote("http://a.example/é"), "http://a.example/%C3%A9");
        assert_eq!(
            requote("http://a.example/?q=a&b=c#x"),
            "http://a.example/?q=a&b=c#x"
        );
    }

    #[test]
    fn broken_escapes_fall_back_to_quoting_percent() {
        assert_eq!(unquote_unreserved("%zz"), None);
        assert_eq!(requote("http://a.example/%zz"), "http://a.example/%25zz");
    }

    #[test]
    fn trailing_percent_is_kept() {
        assert_eq!(unquote_unreserved("100%").as_deref(), Some("100%"));
        assert_eq!(requote("http://a.example/100%"), "http://a.example/100%");
    }

    #[test]
    fn unquote_decodes_everything() {
        assert_eq!(
            unquote("https%3A%2F%2Fexample.com%2Fa%3Fb%3D1"),
            "https://example.com/a?b=1"
        );
    }
}
