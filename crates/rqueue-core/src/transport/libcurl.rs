//! libcurl-backed transport.
//!
//! Each request uses its own `Easy` handle on tokio's blocking pool. Bodies
//! are JSON; responses are collected in memory.

use std::time::Duration;

use super::{ErrorKind, Response, Transport, TransportError, TransportRequest, JSON_CONTENT_TYPE};
use crate::queue::BoxFuture;
use crate::request::Method;

/// Timeouts and identity applied to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Total timeout per request unless the request sets its own.
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(60),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: CurlOptions,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.options
    }
}

impl Transport for CurlTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<Result<Response, TransportError>> {
        let options = self.options.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || perform(&options, &request))
                .await
                .unwrap_or_else(|e| {
                    Err(TransportError::Client {
                        status: None,
                        reason: format!("transport worker failed: {e}"),
                    })
                })
        })
    }
}

/// Performs one request on the current thread.
fn perform(options: &CurlOptions, request: &TransportRequest) -> Result<Response, TransportError> {
    url::Url::parse(&request.url).map_err(|e| TransportError::Client {
        status: None,
        reason: format!("invalid URL {}: {e}", request.url),
    })?;

    let mut easy = curl::easy::Easy::new();
    easy.url(&request.url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(options.connect_timeout)?;
    easy.timeout(request.timeout.unwrap_or(options.timeout))?;
    if let Some(agent) = &options.user_agent {
        easy.useragent(agent)?;
    }

    let body = match &request.method {
        Method::Get => {
            easy.get(true)?;
            None
        }
        Method::Post => {
            easy.post(true)?;
            // Always set fields; without them libcurl reads the body from stdin.
            Some(encode_body(request)?.unwrap_or_default())
        }
        Method::Delete => {
            easy.custom_request("DELETE")?;
            encode_body(request)?
        }
        Method::Other(name) => {
            return Err(TransportError::Client {
                status: None,
                reason: format!("unsupported method {name}"),
            });
        }
    };

    let mut list = curl::easy::List::new();
    if let Some(bytes) = &body {
        easy.post_fields_copy(bytes)?;
        if !bytes.is_empty() {
            let content_type = request.content_type.as_deref().unwrap_or(JSON_CONTENT_TYPE);
            list.append(&format!("Content-Type: {content_type}"))?;
        }
    }
    for (k, v) in &request.headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    easy.http_headers(list)?;

    let mut received = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            received.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(ErrorKind::from_status(code).into_error(format!(
            "{} {} returned HTTP {}",
            request.method, request.url, code
        )));
    }

    Ok(Response {
        status: code as u16,
        body: received,
    })
}

fn encode_body(request: &TransportRequest) -> Result<Option<Vec<u8>>, TransportError> {
    request
        .data
        .as_ref()
        .map(serde_json::to_vec)
        .transpose()
        .map_err(|e| TransportError::Client {
            status: None,
            reason: format!("could not encode request body: {e}"),
        })
}
