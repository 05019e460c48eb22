//! `rqueue batch <file>` – submit a list of requests at once.

use anyhow::{bail, Context, Result};
use rqueue_core::config::RqueueConfig;
use rqueue_core::request::{Method, RequestOptions};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::build_queue;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchItem {
    pub method: Method,
    pub url: String,
    #[serde(default)]
    pub data: Option<Value>,
}

pub fn parse_batch(raw: &str) -> Result<Vec<BatchItem>> {
    serde_json::from_str(raw).context("batch file must be a JSON array of {method, url, data?}")
}

pub async fn run_batch(cfg: &RqueueConfig, path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let items = parse_batch(&raw)?;
    if items.is_empty() {
        println!("Nothing to send.");
        return Ok(());
    }

    let queue = build_queue(cfg);
    let listener = queue.on_queue_length_change(|len| println!("queue length: {len}"));

    let pending: Vec<_> = items
        .iter()
        .map(|item| {
            queue.request(
                item.method.clone(),
                item.url.clone(),
                item.data.clone(),
                RequestOptions::default(),
            )
        })
        .collect();

    let mut failed = 0usize;
    for (item, request) in items.iter().zip(pending) {
        match request.await {
            Ok(response) => println!("{} {} -> {}", item.method, item.url, response.status),
            Err(err) => {
                failed += 1;
                println!("{} {} -> error: {}", item.method, item.url, err);
            }
        }
    }
    // The listener ends once the queue is gone and its last events are printed.
    drop(queue);
    if let Err(err) = listener.await {
        tracing::warn!("queue length listener stopped: {err}");
    }

    tracing::info!(total = items.len(), failed, "batch finished");
    if failed > 0 {
        bail!("{failed} of {} requests failed", items.len());
    }
    Ok(())
}
