//! Tiger package inspector library
//!
//! This library provides the core functionality for the `tiger` CLI tool.

pub mod commands;
pub mod output;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tiger_formats::hash::parse_text_hash;
use tiger_formats::{ContentId, TagHash64};
use tiger_storage::{PackageStore, StoreConfig};

/// Output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON output
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

/// Context for command execution
#[derive(Clone, Debug)]
pub struct CommandContext {
    /// Output format
    pub format: OutputFormat,
    /// Whether to disable colors
    pub no_color: bool,
}

/// Package set selection shared by every store-backed command
#[derive(Args, Clone, Debug, Default)]
pub struct StoreArgs {
    /// Directory containing the package set
    #[arg(short, long, env = tiger_storage::config::ENV_PACKAGES_DIR, global = true)]
    pub packages: Option<PathBuf>,

    /// JSON store configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Byte cache budget in bytes
    #[arg(long, env = tiger_storage::config::ENV_CACHE_BUDGET, global = true)]
    pub cache_budget: Option<usize>,

    /// Persist the hash64 table at this path
    #[arg(long, global = true)]
    pub hash64_cache: Option<PathBuf>,
}

impl StoreArgs {
    /// Merge the configuration file with command-line overrides
    pub fn store_config(&self) -> Result<StoreConfig> {
        let mut config = match &self.config {
            Some(path) => StoreConfig::from_file(path)?,
            None => StoreConfig::default(),
        };

        if let Some(dir) = &self.packages {
            config = config.with_package_dir(dir);
        } else if self.config.is_none() {
            anyhow::bail!(
                "No package directory given; pass --packages or set {}",
                tiger_storage::config::ENV_PACKAGES_DIR
            );
        }
        if let Some(budget) = self.cache_budget {
            config = config.with_cache_budget(budget);
        }
        if let Some(path) = &self.hash64_cache {
            config = config.with_hash64_cache(path);
        }
        Ok(config)
    }

    /// Open the selected package set
    pub async fn open(&self) -> Result<PackageStore> {
        let config = self.store_config()?;
        let dir = config.package_dir.clone();
        tracing::debug!("Opening package set at {}", dir.display());
        PackageStore::open(config)
            .await
            .with_context(|| format!("Failed to open package set at {}", dir.display()))
    }
}

/// Parse a user-supplied identifier.
///
/// Sixteen hex digits name a 64-bit global hash; anything shorter is a
/// package hash in text form.
pub fn parse_content_id(text: &str, big_endian: bool) -> Result<ContentId> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    if digits.len() == 16 {
        let value = u64::from_str_radix(digits, 16)
            .with_context(|| format!("Invalid 64-bit hash: {text}"))?;
        return Ok(ContentId::Global(TagHash64(value)));
    }

    let hash = parse_text_hash(text, big_endian)?;
    Ok(ContentId::Local(hash))
}

/// Print `value` as JSON in the requested flavor
pub fn print_json<T: serde::Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
        _ => serde_json::to_string(value)?,
    };
    println!("{text}");
    Ok(())
}
