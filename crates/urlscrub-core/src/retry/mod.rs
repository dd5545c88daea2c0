//! Retry and backoff policy.
//!
//! Error classification (timeouts, throttling, connection failures), the
//! retry budget with exponential backoff, and `Retry-After` parsing, shared
//! by every resolver hop.

mod after;
mod classify;
mod policy;

pub use after::parse_retry_after;
pub use classify::{classify_curl_error, classify_http_status, DEFAULT_STATUS_RETRY};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
