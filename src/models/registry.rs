use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response from a registry package endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryMetadata {
    /// Package name
    #[serde(default)]
    pub name: Option<String>,
    /// All published versions keyed by version string
    #[serde(default)]
    pub versions: BTreeMap<String, ReleaseDescriptor>,
    /// Distribution tags (latest, beta, etc.)
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
}

/// Version-specific information from the registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Entry file declared by the release
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub dist: Option<DistInfo>,
}

/// Distribution information for a release
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistInfo {
    /// Download URL for the package tarball
    pub tarball: String,
    /// SHA-1 checksum of the tarball
    #[serde(default)]
    pub shasum: Option<String>,
    /// Subresource-integrity string (`sha512-<base64>`)
    #[serde(default)]
    pub integrity: Option<String>,
}

/// On-disk `package.json`, only the fields the cache needs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
}
