//! `rqueue get|post|delete <url>` – send one request through the queue.

use anyhow::{Context, Result};
use rqueue_core::config::RqueueConfig;
use rqueue_core::request::{Method, RequestOptions};
use serde_json::Value;

use super::build_queue;

pub async fn run_send(
    cfg: &RqueueConfig,
    method: Method,
    url: &str,
    data: Option<&str>,
) -> Result<()> {
    let data = parse_data(data)?;
    let queue = build_queue(cfg);
    let response = queue
        .request(method.clone(), url, data, RequestOptions::default())
        .await
        .with_context(|| format!("{method} {url}"))?;
    tracing::info!(%method, url, status = response.status, "request completed");
    println!("{}", response.text());
    Ok(())
}

fn parse_data(data: Option<&str>) -> Result<Option<Value>> {
    data.map(|raw| serde_json::from_str(raw).context("--data must be valid JSON"))
        .transpose()
}
