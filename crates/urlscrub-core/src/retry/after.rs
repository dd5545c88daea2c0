//! `Retry-After` header parsing.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Delay requested by a `Retry-After` value: delta seconds or an HTTP date.
///
/// A date in the past yields zero; anything unparsable yields `None`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
