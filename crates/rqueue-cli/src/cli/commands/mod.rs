//! CLI command handlers, one file per command.

mod batch;
mod completions;
mod config;
mod send;

pub use batch::run_batch;
pub use completions::run_completions;
pub use config::run_config;
pub use send::run_send;

use std::sync::Arc;

use rqueue_core::config::RqueueConfig;
use rqueue_core::request::RequestQueue;
use rqueue_core::transport::{CurlTransport, Transport};

/// Request queue over libcurl configured from `cfg`.
fn build_queue(cfg: &RqueueConfig) -> RequestQueue {
    let transport: Arc<dyn Transport> = Arc::new(CurlTransport::new(cfg.transport_options()));
    RequestQueue::new(transport, cfg.queue.to_options())
}
