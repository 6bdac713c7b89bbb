//! Package set storage for Tiger game packages.
//!
//! This crate turns a directory of `*.pkg` files into an addressable store:
//!
//! - **Package set**: headers and entry tables of every package, highest
//!   patch per package id, plus the hash64 translation table
//! - **Reads**: entry bytes by [`TagHash`](tiger_formats::TagHash), with
//!   redirects followed once, zlib entries inflated, concurrent reads of the
//!   same entry coalesced into one file read and results kept in a byte LRU
//! - **Reload**: atomic swap of the whole package set generation
//! - **Hash64 cache**: optional on-disk copy of the translation table keyed
//!   by a fingerprint of the package set
//!
//! # Example
//!
//! ```rust,ignore
//! use tiger_storage::{PackageStore, StoreConfig};
//! use tiger_formats::hash::parse_text_hash;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PackageStore::open(StoreConfig::new("/path/to/packages")).await?;
//! let hash = parse_text_hash("2D3BAE80", false)?;
//! let bytes = store.read(hash).await?;
//! println!("{} bytes, type {:#010x}", bytes.len(), store.metadata(hash)?.type_tag);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]

use thiserror::Error;
use tiger_formats::ContentId;

// Byte LRU
pub mod cache;

// Configuration
pub mod config;

// Persisted hash64 translation table
pub mod hash64_cache;

// Package headers and entry tables
pub mod package_set;

// Retry with exponential backoff
pub mod retry;

// Entry reads and generations
pub mod store;

pub use config::StoreConfig;
pub use package_set::{EntryMetadata, PackageInfo, PackageSet};
pub use retry::RetryPolicy;
pub use store::{PackageStore, StoreStats};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Identifier is a sentinel or a string hash.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(ContentId),

    /// Identifier does not address any known entry.
    #[error("Content not found: {0}")]
    NotFound(ContentId),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No file in the package directory has a recognizable header.
    #[error("No packages found in {0}")]
    NoPackages(std::path::PathBuf),

    /// Package file could not be parsed.
    #[error("Package error: {0}")]
    Package(#[from] tiger_formats::package::PackageError),

    /// Invalid data format.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Corruption detected.
    #[error("Data corruption detected: {0}")]
    Corruption(String),

    /// Concurrent operation failed.
    #[error("Concurrent operation failed: {0}")]
    ConcurrencyError(String),
}

impl StorageError {
    /// Whether the operation that produced this error is worth retrying
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<binrw::Error> for StorageError {
    fn from(error: binrw::Error) -> Self {
        Self::InvalidFormat(error.to_string())
    }
}

/// Version information for the storage crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// File extension of package files.
pub const PACKAGE_EXTENSION: &str = "pkg";
