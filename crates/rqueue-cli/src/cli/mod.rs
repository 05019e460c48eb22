//! CLI for the rqueue request queue.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use rqueue_core::config::{self, QueueConfig, RqueueConfig};
use rqueue_core::request::Method;
use rqueue_core::strategy::StrategyKind;
use std::path::PathBuf;

use commands::{run_batch, run_completions, run_config, run_send};

/// Top-level CLI for rqueue.
#[derive(Debug, Parser)]
#[command(name = "rqueue")]
#[command(about = "rqueue: retrying HTTP request queue", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: QueueOverrides,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Per-invocation overrides of the `[queue]` config section.
#[derive(Debug, Default, Args)]
pub struct QueueOverrides {
    /// Scheduling strategy: parallel (alias all), sequential, or priority (alias sequentialPost).
    #[arg(long, global = true, value_name = "NAME")]
    pub strategy: Option<StrategyKind>,

    /// Maximum attempts per request, including the first.
    #[arg(long, global = true, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Delay in milliseconds before a failed request is retried.
    #[arg(long, global = true, value_name = "MS")]
    pub retry_timeout_ms: Option<u64>,
}

impl QueueOverrides {
    pub fn apply(&self, queue: &mut QueueConfig) {
        if let Some(strategy) = self.strategy {
            queue.strategy = strategy;
        }
        if let Some(max_retries) = self.max_retries {
            queue.max_retries = max_retries;
        }
        if let Some(ms) = self.retry_timeout_ms {
            queue.retry_timeout_ms = ms;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send a GET request and print the response body.
    Get {
        url: String,
    },

    /// Send a POST request with an optional JSON body.
    Post {
        url: String,

        /// JSON request body.
        #[arg(long, value_name = "JSON")]
        data: Option<String>,
    },

    /// Send a DELETE request.
    Delete {
        url: String,
    },

    /// Submit every request in a JSON file at once: `[{"method": "GET", "url": "..."}, ...]`.
    Batch {
        /// Path to the batch file.
        path: PathBuf,
    },

    /// Print the effective configuration as TOML.
    Config,

    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        cli.overrides.apply(&mut cfg.queue);
        tracing::debug!("effective config: {:?}", cfg);
        cli.command.run(&cfg).await
    }

    async fn run(self, cfg: &RqueueConfig) -> Result<()> {
        match self {
            CliCommand::Get { url } => run_send(cfg, Method::Get, &url, None).await?,
            CliCommand::Post { url, data } => {
                run_send(cfg, Method::Post, &url, data.as_deref()).await?
            }
            CliCommand::Delete { url } => run_send(cfg, Method::Delete, &url, None).await?,
            CliCommand::Batch { path } => run_batch(cfg, &path).await?,
            CliCommand::Config => run_config(cfg)?,
            CliCommand::Completions { shell } => run_completions(shell),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
