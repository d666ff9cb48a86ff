//! Configuration loading and management
//!
//! Handles parsing of optional `taskvault.toml` files placed in the data
//! directory root. Every field has a default, so a missing file yields a
//! usable configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name of the optional configuration file inside the data directory
pub const CONFIG_FILE: &str = "taskvault.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,
}

/// Search-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of archive snapshot documents inspected per query
    #[serde(default = "default_max_archive_scan")]
    pub max_archive_scan: usize,

    /// Page size used when the caller does not supply one
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

fn default_max_archive_scan() -> usize {
    10
}

fn default_page_size() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_archive_scan: default_max_archive_scan(),
            default_page_size: default_page_size(),
        }
    }
}

impl StoreConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load the configuration from `<root>/taskvault.toml`, falling back to
    /// defaults when the file does not exist.
    pub async fn load_or_default(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Self::from_toml(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = StoreConfig::default();
        assert_eq!(config.search.max_archive_scan, 10);
        assert_eq!(config.search.default_page_size, 5);
    }

    #[test]
    fn parses_partial_config() {
        let config = StoreConfig::from_toml(
            r#"
            [search]
            max_archive_scan = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.search.max_archive_scan, 3);
        assert_eq!(config.search.default_page_size, 5);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(StoreConfig::from_toml("[search\nmax = ").is_err());
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StoreConfig::load_or_default(dir.path()).await.unwrap();
        assert_eq!(config.search.default_page_size, 5);
    }

    #[tokio::test]
    async fn reads_config_file_from_root() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[search]\nmax_archive_scan = 2\ndefault_page_size = 20\n",
        )
        .unwrap();
        let config = StoreConfig::load_or_default(dir.path()).await.unwrap();
        assert_eq!(config.search.max_archive_scan, 2);
        assert_eq!(config.search.default_page_size, 20);
    }
}
