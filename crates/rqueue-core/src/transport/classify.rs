//! Classify HTTP status and curl errors into retryable or terminal failures.

use super::TransportError;

/// High-level classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Network-level failure (connection refused/reset, DNS, etc.).
    Connection,
    /// Server-side HTTP failure (5xx).
    Http5xx(u16),
    /// Client-side HTTP failure (4xx).
    Client(u16),
    /// Anything else (malformed URL, unexpected status, local setup errors).
    Other,
}

impl ErrorKind {
    /// Server-side and network-level failures are worth retrying.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::Connection | ErrorKind::Http5xx(_)
        )
    }

    /// HTTP status carried by the kind, if any.
    pub fn status(self) -> Option<u16> {
        match self {
            ErrorKind::Http5xx(code) | ErrorKind::Client(code) => Some(code),
            ErrorKind::Timeout | ErrorKind::Connection | ErrorKind::Other => None,
        }
    }

    /// Build the transport error matching this kind.
    pub fn into_error(self, reason: impl Into<String>) -> TransportError {
        let status = self.status();
        let reason = reason.into();
        if self.is_transient() {
            TransportError::Transient { status, reason }
        } else {
            TransportError::Client { status, reason }
        }
    }
}

// libcurl result codes treated as network-level failures.
const CURLE_COULDNT_RESOLVE_PROXY: i32 = 5;
const CURLE_COULDNT_RESOLVE_HOST: i32 = 6;
const CURLE_COULDNT_CONNECT: i32 = 7;
const CURLE_PARTIAL_FILE: i32 = 18;
const CURLE_READ_ERROR: i32 = 26;
const CURLE_OPERATION_TIMEDOUT: i32 = 28;
const CURLE_GOT_NOTHING: i32 = 52;
const CURLE_SEND_ERROR: i32 = 55;
const CURLE_RECV_ERROR: i32 = 56;

impl ErrorKind {
    /// Kind of a non-2xx HTTP status code.
    pub fn from_status(code: u32) -> Self {
        match u16::try_from(code) {
            Ok(code @ 500..=599) => ErrorKind::Http5xx(code),
            Ok(code @ 400..=499) => ErrorKind::Client(code),
            _ => ErrorKind::Other,
        }
    }

    /// Kind of a failed libcurl transfer.
    pub fn from_curl(e: &curl::Error) -> Self {
        match e.code() as i32 {
            CURLE_OPERATION_TIMEDOUT => ErrorKind::Timeout,
            CURLE_COULDNT_RESOLVE_PROXY
            | CURLE_COULDNT_RESOLVE_HOST
            | CURLE_COULDNT_CONNECT
            | CURLE_PARTIAL_FILE
            | CURLE_READ_ERROR
            | CURLE_GOT_NOTHING
            | CURLE_SEND_ERROR
            | CURLE_RECV_ERROR => ErrorKind::Connection,
            _ => ErrorKind::Other,
        }
    }
}

impl From<curl::Error> for TransportError {
    fn from(e: curl::Error) -> Self {
        ErrorKind::from_curl(&e).into_error(e.to_string())
    }
}
