//! Classify HTTP status and curl errors into retry policy error kinds.

use crate::retry::policy::ErrorKind;

/// Status codes retried by default.
pub const DEFAULT_STATUS_RETRY: [u32; 5] = [429, 500, 502, 503, 504];

/// Classify an HTTP status code; only codes in `retryable` are ever retried.
pub fn classify_http_status(code: u32, retryable: &[u32]) -> ErrorKind {
    if !retryable.contains(&code) {
        return ErrorKind::Other;
    }
    match code {
        429 | 503 => ErrorKind::Throttled,
        _ => ErrorKind::RetryableStatus(code),
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
        || e.is_ssl_connect_error()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}
