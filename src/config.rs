//! TOML configuration for the `kg` CLI.
//!
//! Every section is optional; a missing file section falls back to the
//! defaults below. See `config/kg.example.toml`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Delay before a live (`kg shell`) search fires.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Cap on results per search; unlimited when unset.
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_results: None,
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

/// Output format for search results.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Html,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// Characters of message text shown per result in text output.
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            snippet_chars: default_snippet_chars(),
            format: OutputFormat::default(),
        }
    }
}

fn default_snippet_chars() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummaryConfig {
    /// Characters kept from the first user/assistant message.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    /// Conversations listed by `kg recent`.
    #[serde(default = "default_summary_limit")]
    pub limit: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
            limit: default_summary_limit(),
        }
    }
}

fn default_preview_chars() -> usize {
    100
}
fn default_summary_limit() -> usize {
    20
}

impl Config {
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.search.debounce_ms == 0 {
        anyhow::bail!("search.debounce_ms must be > 0");
    }
    if config.search.max_results == Some(0) {
        anyhow::bail!("search.max_results must be >= 1 when set");
    }
    if config.display.snippet_chars == 0 {
        anyhow::bail!("display.snippet_chars must be > 0");
    }
    if config.summary.preview_chars == 0 {
        anyhow::bail!("summary.preview_chars must be > 0");
    }
    if config.summary.limit == 0 {
        anyhow::bail!("summary.limit must be >= 1");
    }
    Ok(())
}
