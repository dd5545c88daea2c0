//! Resolve `Location`/`Content-Location` values against the current URL.

use crate::url_model::UrlValue;

/// Absolute URL a redirect header points at.
///
/// # Examples
///
/// Against `http://a.example:8080/dir/page?x=1`:
///
/// - `https://b.example/` → unchanged
/// - `//b.example/p` → `http://b.example/p`
/// - `/root` → `http://a.example:8080/root`
/// - `next` → `http://a.example:8080/dir/next`
pub fn resolve_location(current: &UrlValue, location: &str) -> String {
    let location = location.trim();
    if is_absolute(location) {
        return location.to_string();
    }
    if let Some(rest) = location.strip_prefix("//") {
        return format!("{}://{}", current.scheme, rest);
    }
    if location.starts_with('/') {
        return format!("{}{}", current.origin(), location);
    }
    let dir = match current.path.rfind('/') {
        Some(i) => &current.path[..=i],
        None => "/",
    };
    format!("{}{}{}", current.origin(), dir, location)
}

fn is_absolute(location: &str) -> bool {
    let lower = location.get(..8).unwrap_or(location).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
