//! `rqueue config` – print the effective configuration.

use anyhow::Result;
use rqueue_core::config::{self, RqueueConfig};

pub fn run_config(cfg: &RqueueConfig) -> Result<()> {
    if let Ok(path) = config::config_path() {
        println!("# {}", path.display());
    }
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
