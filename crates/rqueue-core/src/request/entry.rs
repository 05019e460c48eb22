//! Request payloads stored in the queue.

use std::time::Duration;

use serde::Serialize;

use super::Method;
use crate::strategy::WriteClass;
use crate::transport::TransportRequest;

/// Extra per-request settings passed through to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub content_type: Option<String>,
}

impl RequestOptions {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Field-by-field merge: values set in `overrides` win, headers accumulate
    /// (defaults first).
    pub fn merge(&self, overrides: RequestOptions) -> RequestOptions {
        let mut headers = self.headers.clone();
        headers.extend(overrides.headers);
        RequestOptions {
            headers,
            timeout: overrides.timeout.or(self.timeout),
            content_type: overrides.content_type.or_else(|| self.content_type.clone()),
        }
    }
}

/// One queued request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestEntry {
    pub method: Method,
    pub url: String,
    pub data: Option<serde_json::Value>,
    pub options: RequestOptions,
}

impl RequestEntry {
    pub(crate) fn to_transport_request(&self) -> TransportRequest {
        TransportRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            data: self.data.clone(),
            headers: self.options.headers.clone(),
            timeout: self.options.timeout,
            content_type: self.options.content_type.clone(),
        }
    }
}

impl WriteClass for RequestEntry {
    fn is_write(&self) -> bool {
        self.method == Method::Post
    }
}
