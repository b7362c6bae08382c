/**
 * Configuration Loader
 *
 * DESIGN DECISION: One struct, one TOML document, field-level defaults
 * WHY: §6 of the design names exactly three tunables (two TTLs, one registry
 * URL); every field is `#[serde(default)]` so a document that sets only one
 * of them still loads cleanly
 *
 * PATTERN: Pattern-CONFIG-001 (Configuration Loading), single tier
 */

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_license_cache_ttl_hours() -> u64 {
    24
}

fn default_registry_cache_ttl_hours() -> u64 {
    1
}

fn default_registry_base_url() -> String {
    "https://registry.npmjs.org".to_string()
}

/// The complete set of tunables the core exposes (§6 Configuration surface).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    /// Hours a cached `PackageLicenseInfo` entry stays fresh before re-fetch.
    #[serde(default = "default_license_cache_ttl_hours")]
    pub license_cache_ttl_hours: u64,

    /// Hours a cached `PackageVersionData` entry stays fresh before re-fetch.
    #[serde(default = "default_registry_cache_ttl_hours")]
    pub registry_cache_ttl_hours: u64,

    /// Base URL of the upstream package registry.
    #[serde(default = "default_registry_base_url")]
    pub registry_base_url: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            license_cache_ttl_hours: default_license_cache_ttl_hours(),
            registry_cache_ttl_hours: default_registry_cache_ttl_hours(),
            registry_base_url: default_registry_base_url(),
        }
    }
}

impl CoreConfig {
    pub fn license_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.license_cache_ttl_hours * 3600)
    }

    pub fn registry_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.registry_cache_ttl_hours * 3600)
    }
}

/// Loads a `CoreConfig` from a TOML document, string, or file.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Parse a TOML document already in memory. Missing fields fall back to defaults.
    pub fn from_str(toml_str: &str) -> Result<CoreConfig> {
        let config: CoreConfig = toml::from_str(toml_str).map_err(Error::from)?;
        Ok(config)
    }

    /// Read and parse a TOML config file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<CoreConfig> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(Error::from)?;
        Self::from_str(&content)
    }

    /// The default configuration, used when no document is supplied.
    pub fn defaults() -> CoreConfig {
        CoreConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = CoreConfig::default();
        assert_eq!(config.license_cache_ttl_hours, 24);
        assert_eq!(config.registry_cache_ttl_hours, 1);
        assert_eq!(config.registry_base_url, "https://registry.npmjs.org");
    }

    #[test]
    fn partial_document_fills_in_remaining_defaults() {
        let config = ConfigLoader::from_str("registry_cache_ttl_hours = 6\n").unwrap();
        assert_eq!(config.registry_cache_ttl_hours, 6);
        assert_eq!(config.license_cache_ttl_hours, 24);
        assert_eq!(config.registry_base_url, "https://registry.npmjs.org");
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = ConfigLoader::from_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let result = ConfigLoader::from_str("not = [valid");
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[test]
    fn ttl_durations_convert_hours_to_seconds() {
        let config = CoreConfig {
            registry_cache_ttl_hours: 2,
            ..CoreConfig::default()
        };
        assert_eq!(config.registry_cache_ttl().as_secs(), 7200);
    }
}
