//! Configuration for the package store

use crate::{Result, RetryPolicy, StorageError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the package directory
pub const ENV_PACKAGES_DIR: &str = "TIGER_PACKAGES_DIR";

/// Environment variable holding the byte cache budget
pub const ENV_CACHE_BUDGET: &str = "TIGER_CACHE_BUDGET";

/// Configuration for the package store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory containing `*.pkg` files
    pub package_dir: PathBuf,

    /// Memory budget of the entry byte cache (in bytes, 0 disables caching)
    pub cache_budget_bytes: usize,

    /// Where to persist the hash64 translation table
    pub hash64_cache_path: Option<PathBuf>,

    /// Retry policy for entry reads
    pub retry: RetryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            package_dir: PathBuf::from("./packages"),
            cache_budget_bytes: 256 * 1024 * 1024, // 256 MB
            hash64_cache_path: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Create a new configuration for a package directory
    pub fn new<P: AsRef<Path>>(package_dir: P) -> Self {
        Self {
            package_dir: package_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| StorageError::Config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Build a configuration from `TIGER_PACKAGES_DIR` and `TIGER_CACHE_BUDGET`
    pub fn from_env() -> Result<Self> {
        let package_dir = std::env::var_os(ENV_PACKAGES_DIR)
            .ok_or_else(|| StorageError::Config(format!("{ENV_PACKAGES_DIR} is not set")))?;

        let mut config = Self::new(package_dir);
        if let Ok(budget) = std::env::var(ENV_CACHE_BUDGET) {
            config.cache_budget_bytes = budget.parse().map_err(|e| {
                StorageError::Config(format!("Invalid {ENV_CACHE_BUDGET} {budget:?}: {e}"))
            })?;
        }
        config.retry = RetryPolicy::from_env();
        Ok(config)
    }

    /// Set the package directory
    #[must_use]
    pub fn with_package_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.package_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the byte cache budget
    #[must_use]
    pub const fn with_cache_budget(mut self, bytes: usize) -> Self {
        self.cache_budget_bytes = bytes;
        self
    }

    /// Persist the hash64 table at `path`
    #[must_use]
    pub fn with_hash64_cache<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.hash64_cache_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check that the package directory exists and is a directory
    pub fn validate(&self) -> Result<()> {
        let metadata = std::fs::metadata(&self.package_dir).map_err(|e| {
            StorageError::Config(format!(
                "Package directory {} is not accessible: {e}",
                self.package_dir.display()
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Config(format!(
                "Package path {} is not a directory",
                self.package_dir.display()
            )));
        }

        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(StorageError::Config(format!(
                "Retry multiplier must be >= 1.0, got {}",
                self.retry.multiplier
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_builder() {
        let config = StoreConfig::new("/tmp/pkgs")
            .with_cache_budget(1024)
            .with_hash64_cache("/tmp/h64.bin")
            .with_retry_policy(RetryPolicy::none());
        assert_eq!(config.package_dir, PathBuf::from("/tmp/pkgs"));
        assert_eq!(config.cache_budget_bytes, 1024);
        assert_eq!(config.hash64_cache_path, Some(PathBuf::from("/tmp/h64.bin")));
        assert_eq!(config.retry.max_attempts, 0);
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(
            &path,
            r#"{ "package_dir": "/data/packages", "retry": { "max_attempts": 5 } }"#,
        )
        .unwrap();

        let config = StoreConfig::from_file(&path).unwrap();
        assert_eq!(config.package_dir, PathBuf::from("/data/packages"));
        assert_eq!(config.cache_budget_bytes, StoreConfig::default().cache_budget_bytes);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(50));
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            StoreConfig::from_file(&path),
            Err(StorageError::Config(_))
        ));
    }

    #[test]
    fn test_validate_paths() {
        let dir = tempfile::tempdir().unwrap();
        StoreConfig::new(dir.path()).validate().unwrap();

        let missing = dir.path().join("missing");
        assert!(matches!(
            StoreConfig::new(&missing).validate(),
            Err(StorageError::Config(_))
        ));

        let file = dir.path().join("file.pkg");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            StoreConfig::new(&file).validate(),
            Err(StorageError::Config(_))
        ));
    }
}
