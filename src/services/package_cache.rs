use std::path::PathBuf;

use semver::Version;
use tokio::fs;
use tracing::{debug, info};

use crate::models::package_spec::PackageSpec;
use crate::models::version::{is_newer, parse_version};
use crate::services::installer::{InstallRequest, Installer, PackageVersion};
use crate::services::version_resolver::VersionResolver;
use crate::utils::error::{CliError, Result};
use crate::utils::fs_utils::{find_package_dir, format_path, read_descriptor, PACKAGE_DESCRIPTOR};

/// Result of [`PackageCache::update`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Cached copy is already the newest release
    Current(Version),
    /// A newer release was installed; `from` is `None` when the cached copy
    /// had no readable descriptor
    Upgraded { from: Option<Version>, to: Version },
}

/// One fetchable, cacheable, runnable command package.
///
/// Installs and updates only change the on-disk cache; the [`PackageSpec`]'s
/// `target_path` and `store_dir` never move.
#[derive(Debug)]
pub struct PackageCache<'a, I> {
    spec: PackageSpec,
    resolver: &'a VersionResolver,
    installer: &'a I,
    /// Version installed by `update()` when it moved past the resolved one
    upgraded_to: Option<Version>,
}

impl<'a, I: Installer> PackageCache<'a, I> {
    pub const fn new(spec: PackageSpec, resolver: &'a VersionResolver, installer: &'a I) -> Self {
        Self {
            spec,
            resolver,
            installer,
            upgraded_to: None,
        }
    }

    pub const fn spec(&self) -> &PackageSpec {
        &self.spec
    }

    /// Version the cache currently points at
    pub fn effective_version(&self) -> Option<&Version> {
        self.upgraded_to.as_ref().or_else(|| self.spec.resolved())
    }

    /// Ensure the store exists and turn `latest` into a concrete version.
    /// Idempotent: a resolved version is never looked up again.
    pub async fn prepare(&mut self) -> Result<()> {
        if let Some(store_dir) = self.spec.store_dir() {
            if !store_dir.exists() {
                fs::create_dir_all(store_dir).await?;
            }
        }

        if self.spec.resolved().is_none() {
            let latest = self.latest().await?;
            debug!(package = self.spec.name(), version = %latest, "resolved latest");
            self.spec.resolve(latest);
        }
        Ok(())
    }

    /// Install root for one version inside the shared store
    pub fn install_root(&self, version: &Version) -> Option<PathBuf> {
        self.spec
            .store_dir()
            .map(|store| store.join(format!("{}@{}", self.spec.fs_name(), version)))
    }

    /// Versioned cache path of the effective version, `None` outside the store
    /// or before a version is known
    pub fn cache_file_path(&self) -> Option<PathBuf> {
        let version = self.effective_version()?;
        self.install_root(version)
            .map(|root| InstallRequest::package_dir(&root, self.spec.name()))
    }

    /// Whether the package is present on disk
    pub async fn exists(&mut self) -> Result<bool> {
        if self.spec.store_dir().is_some() {
            self.prepare().await?;
            Ok(self.cache_file_path().is_some_and(|path| path.exists()))
        } else {
            Ok(self.spec.target_path().exists())
        }
    }

    pub async fn install(&mut self) -> Result<()> {
        self.prepare().await?;
        let version = self
            .spec
            .resolved()
            .cloned()
            .ok_or_else(|| CliError::MetadataUnavailable(self.spec.name().to_string()))?;
        self.install_version(&version).await
    }

    /// Install the newest release if it is strictly newer than the cached
    /// copy. Never downgrades.
    pub async fn update(&mut self) -> Result<UpdateOutcome> {
        let latest = self.latest().await?;
        if self.spec.resolved().is_none() {
            self.spec.resolve(latest.clone());
        }
        self.prepare().await?;

        let cached = self.cached_version();
        if let Some(current) = &cached {
            if !is_newer(&latest, current) {
                debug!(package = self.spec.name(), version = %current, "cache is current");
                return Ok(UpdateOutcome::Current(current.clone()));
            }
        }

        self.install_version(&latest).await?;
        if self.spec.resolved() != Some(&latest) {
            self.upgraded_to = Some(latest.clone());
        }
        info!(
            package = self.spec.name(),
            from = %cached.as_ref().map_or_else(|| "none".to_string(), ToString::to_string),
            to = %latest,
            "updated cached package"
        );
        Ok(UpdateOutcome::Upgraded {
            from: cached,
            to: latest,
        })
    }

    /// Absolute path of the entry file declared by the nearest `package.json`
    /// at or above the package directory. `None` means nothing to run.
    pub async fn root_file_path(&mut self) -> Result<Option<PathBuf>> {
        let start = if self.spec.store_dir().is_some() {
            self.prepare().await?;
            match self.cache_file_path() {
                Some(path) => path,
                None => return Ok(None),
            }
        } else {
            self.spec.target_path().to_path_buf()
        };

        let Some(package_dir) = find_package_dir(&start) else {
            debug!(start = %start.display(), "no {} found", PACKAGE_DESCRIPTOR);
            return Ok(None);
        };

        let descriptor = read_descriptor(&package_dir)?;
        Ok(descriptor
            .main
            .filter(|main| !main.trim().is_empty())
            .map(|main| format_path(&package_dir.join(main))))
    }

    async fn latest(&self) -> Result<Version> {
        self.resolver
            .resolve_latest(self.spec.name())
            .await?
            .ok_or_else(|| CliError::MetadataUnavailable(self.spec.name().to_string()))
    }

    /// Version declared by the cached copy's descriptor, if readable
    fn cached_version(&self) -> Option<Version> {
        let dir = match self.spec.store_dir() {
            Some(_) => self.cache_file_path()?,
            None => self.spec.target_path().to_path_buf(),
        };
        let descriptor = match read_descriptor(&dir) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                debug!(error = %e, "no readable cached descriptor");
                return None;
            }
        };
        descriptor
            .version
            .as_deref()
            .and_then(|raw| parse_version(raw).ok())
    }

    async fn install_version(&self, version: &Version) -> Result<()> {
        let target = self.spec.target_path().to_path_buf();
        let root = self.install_root(version).unwrap_or_else(|| target.clone());
        let store_dir = self.spec.store_dir().map_or(target, PathBuf::from);
        let request = InstallRequest {
            root,
            store_dir,
            registry: self.resolver.client().registry_url().to_string(),
            pkgs: vec![PackageVersion {
                name: self.spec.name().to_string(),
                version: version.to_string(),
            }],
        };

        let label = format!("{}@{}", self.spec.name(), version);
        info!(package = %label, root = %request.root.display(), "installing");
        self.installer.install(&request).await.map_err(|e| match e {
            failed @ CliError::InstallFailed { .. } => failed,
            other => CliError::install_failed(label, other),
        })
    }
}
