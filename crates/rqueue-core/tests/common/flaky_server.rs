//! Minimal HTTP/1.1 server for integration tests.
//!
//! Routes:
//! - `/flaky`: 503 for the first `failures` requests, then 200 `ok`.
//! - `/missing`: always 404.
//! - `/echo`: 200 with the request's Content-Type on the first line (if
//!   any), followed by the request body.
//! - anything else: 200 with `<METHOD> <path>`.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Handle to a running server.
pub struct FlakyServer {
    pub base_url: String,
    hits: Arc<AtomicU32>,
}

impl FlakyServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Number of requests that reached `/flaky`.
    pub fn flaky_hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start(failures: u32) -> FlakyServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, failures, &counter));
        }
    });
    FlakyServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        hits,
    }
}

struct Request {
    method: String,
    path: String,
    content_type: Option<String>,
    body: Vec<u8>,
}

fn handle(mut stream: TcpStream, failures: u32, hits: &AtomicU32) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };

    let (status, body) = match req.path.as_str() {
        "/flaky" => {
            let n = hits.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                ("503 Service Unavailable", b"busy".to_vec())
            } else {
                ("200 OK", b"ok".to_vec())
            }
        }
        "/missing" => ("404 Not Found", b"no such thing".to_vec()),
        "/echo" => {
            let mut body = Vec::new();
            if let Some(ct) = &req.content_type {
                body.extend_from_slice(format!("{ct}\n").as_bytes());
            }
            body.extend_from_slice(&req.body);
            ("200 OK", body)
        }
        path => ("200 OK", format!("{} {}", req.method, path).into_bytes()),
    };

    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = std::str::from_utf8(&data[..header_end]).ok()?;
    let mut lines = head.lines();
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let path = first.next()?.to_string();
    let mut content_length = 0usize;
    let mut content_type = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("content-type") {
                content_type = Some(value.trim().to_string());
            }
        }
    }

    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);

    Some(Request {
        method,
        path,
        content_type,
        body,
    })
}
