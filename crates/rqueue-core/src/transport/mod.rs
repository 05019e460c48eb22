//! Transport seam: performs the actual network call for one attempt.
//!
//! A transport reports exactly one result per call. Failures say explicitly
//! whether they are worth retrying (`Transient`) or must surface to the
//! caller immediately (`Client`).

mod classify;
mod libcurl;

pub use self::classify::ErrorKind;
pub use self::libcurl::{CurlOptions, CurlTransport};

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::queue::BoxFuture;
use crate::request::Method;

/// Content type used for JSON request bodies unless overridden.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Normalized request handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    /// JSON body; sent for POST and DELETE.
    pub data: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
    /// Per-request total timeout, overriding the transport default.
    pub timeout: Option<Duration>,
    /// Overrides [`JSON_CONTENT_TYPE`] when a body is sent.
    pub content_type: Option<String>,
}

/// Successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    /// Body as UTF-8 text, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Failed transport call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Server-side (5xx) or network-level failure; the request is retried.
    #[error("transient failure: {reason}")]
    Transient { status: Option<u16>, reason: String },

    /// Failure that must not be retried (4xx, malformed request, ...).
    #[error("request failed: {reason}")]
    Client { status: Option<u16>, reason: String },
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Transient { status, .. } | TransportError::Client { status, .. } => {
                *status
            }
        }
    }
}

/// Performs network calls for the request queue.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: TransportRequest) -> BoxFuture<Result<Response, TransportError>>;
}
