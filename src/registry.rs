/**
 * Package Registry Client Contract
 *
 * DESIGN DECISION: Injected async trait object, not a concrete HTTP client
 * WHY: The concrete HTTP client is an external collaborator (§1 Out of
 * scope); the core only ever parses whatever a `RegistryClient` hands it
 *
 * REASONING CHAIN:
 * 1. `async-trait` keeps the trait object-safe while allowing `async fn`
 * 2. A `CancellationToken` is threaded through every fetch so a caller can
 *    abort a slow registry call; cancellation surfaces as `RegistryError`
 * 3. Response shape mirrors npm's registry document (§6 External interfaces)
 *    with every optional key tolerated via `#[serde(default)]`
 *
 * PATTERN: trait-object collaborator at the I/O boundary (grounded on the
 * cancellation-token pattern used for in-flight request lifecycles)
 */

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Per-version metadata as published by the registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageVersion {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub deprecated: Option<String>,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: HashMap<String, String>,
    #[serde(default, rename = "peerDependencies")]
    pub peer_dependencies: HashMap<String, String>,
    #[serde(default)]
    pub engines: HashMap<String, String>,
    #[serde(default)]
    pub scripts: HashMap<String, String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub dist: Option<DistInfo>,
    #[serde(default)]
    pub license: Option<serde_json::Value>,
    #[serde(default)]
    pub repository: Option<serde_json::Value>,
    #[serde(default)]
    pub bugs: Option<serde_json::Value>,
    #[serde(default)]
    pub author: Option<serde_json::Value>,
    #[serde(default)]
    pub maintainers: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DistInfo {
    #[serde(default)]
    pub tarball: Option<String>,
    #[serde(default)]
    pub shasum: Option<String>,
    #[serde(default)]
    pub integrity: Option<String>,
    #[serde(default, rename = "fileCount")]
    pub file_count: Option<u64>,
    #[serde(default, rename = "unpackedSize")]
    pub unpacked_size: Option<u64>,
}

/// A full registry snapshot for one package.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageVersionData {
    pub name: String,
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: HashMap<String, String>,
    #[serde(default)]
    pub versions: HashMap<String, PackageVersion>,
    #[serde(default)]
    pub time: HashMap<String, String>,
}

impl PackageVersionData {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }
}

/// The upstream package registry collaborator, injected by the host.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn fetch_package(
        &self,
        name: &str,
        cancel: CancellationToken,
    ) -> Result<PackageVersionData>;
}

/// Split `name@version` into its parts. Scoped names (`@scope/name@version`)
/// split on the last `@`; an empty version segment defaults to `"latest"`.
pub fn parse_package_specifier(spec: &str) -> (String, String) {
    let spec = spec.trim();
    match spec.rfind('@') {
        Some(idx) if idx > 0 => {
            let name = &spec[..idx];
            let version = &spec[idx + 1..];
            let version = if version.is_empty() { "latest" } else { version };
            (name.to_string(), version.to_string())
        }
        _ => (spec.to_string(), "latest".to_string()),
    }
}
