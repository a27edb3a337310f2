use std::path::{Path, PathBuf};

use semver::Version;

use crate::models::version::RequestedVersion;
use crate::utils::error::{CliError, Result};

/// Identifies one resolvable command package and where it lives on disk
#[derive(Debug, Clone)]
pub struct PackageSpec {
    /// Registry package name
    name: String,
    /// Version asked for at dispatch time
    requested: RequestedVersion,
    /// Concrete version, assigned at most once
    resolved: Option<Version>,
    /// Directory the package files should exist under
    target_path: PathBuf,
    /// Shared cache root; `None` means the package lives at `target_path`
    store_dir: Option<PathBuf>,
}

impl PackageSpec {
    /// Spec for a package kept in the shared cache under `store_dir`
    pub fn cached(
        name: impl Into<String>,
        requested: RequestedVersion,
        target_path: PathBuf,
        store_dir: PathBuf,
    ) -> Result<Self> {
        Self::build(name.into(), requested, target_path, Some(store_dir))
    }

    /// Spec for a package that already sits at a local directory
    pub fn local(name: impl Into<String>, requested: RequestedVersion, target_path: PathBuf) -> Result<Self> {
        Self::build(name.into(), requested, target_path, None)
    }

    fn build(
        name: String,
        requested: RequestedVersion,
        target_path: PathBuf,
        store_dir: Option<PathBuf>,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(CliError::InvalidArguments(
                "package name cannot be empty".to_string(),
            ));
        }
        let resolved = requested.concrete().cloned();
        Ok(Self {
            name,
            requested,
            resolved,
            target_path,
            store_dir,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn requested(&self) -> &RequestedVersion {
        &self.requested
    }

    pub const fn resolved(&self) -> Option<&Version> {
        self.resolved.as_ref()
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn store_dir(&self) -> Option<&Path> {
        self.store_dir.as_deref()
    }

    /// Record the concrete version. A second assignment is ignored and the
    /// first value is returned.
    pub fn resolve(&mut self, version: Version) -> &Version {
        self.resolved.get_or_insert(version)
    }

    /// Directory-safe form of the name (`@scope/pkg` becomes `@scope+pkg`)
    pub fn fs_name(&self) -> String {
        self.name.replace('/', "+")
    }
}
