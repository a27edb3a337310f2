use semver::Version;
use tracing::debug;

use crate::models::version::{is_newer, precedence};
use crate::services::registry_client::RegistryClient;
use crate::utils::error::{CliError, Result};

/// Picks the version of a package to fetch from what the registry publishes
#[derive(Debug, Clone)]
pub struct VersionResolver {
    client: RegistryClient,
}

impl VersionResolver {
    pub const fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    pub const fn client(&self) -> &RegistryClient {
        &self.client
    }

    /// Every published version of `package_name`. Keys that are not valid
    /// semantic versions are skipped.
    pub async fn list_versions(&self, package_name: &str) -> Result<Vec<Version>> {
        let metadata = self
            .client
            .fetch_metadata(package_name)
            .await?
            .ok_or_else(|| CliError::MetadataUnavailable(package_name.to_string()))?;

        Ok(metadata
            .versions
            .keys()
            .filter_map(|raw| match Version::parse(raw) {
                Ok(version) => Some(version),
                Err(e) => {
                    debug!(package = package_name, version = %raw, error = %e, "skipping unparseable version");
                    None
                }
            })
            .collect())
    }

    /// The releases in `versions` strictly newer than `base`. Pre-releases
    /// are never selected.
    pub fn select_versions(base: &Version, versions: &[Version]) -> Vec<Version> {
        versions
            .iter()
            .filter(|candidate| candidate.pre.is_empty() && is_newer(candidate, base))
            .cloned()
            .collect()
    }

    /// Highest of `versions` strictly newer than `base`, or `base` itself
    pub fn latest_above(base: &Version, versions: &[Version]) -> Version {
        let mut newer = Self::select_versions(base, versions);
        // Stable descending sort; equal precedence keeps publication order.
        newer.sort_by(|a, b| precedence(b, a));
        newer.into_iter().next().unwrap_or_else(|| base.clone())
    }

    pub async fn resolve_latest_above(&self, package_name: &str, base: &Version) -> Result<Version> {
        let versions = self.list_versions(package_name).await?;
        let latest = Self::latest_above(base, &versions);
        debug!(package = package_name, base = %base, latest = %latest, "resolved version");
        Ok(latest)
    }

    /// Newest published version, `None` when nothing newer than `0.0.0` exists.
    ///
    /// A registry whose only (or highest) release is literally `0.0.0` is
    /// indistinguishable from one with no releases and also yields `None`.
    pub async fn resolve_latest(&self, package_name: &str) -> Result<Option<Version>> {
        let floor = Version::new(0, 0, 0);
        let latest = self.resolve_latest_above(package_name, &floor).await?;
        Ok((latest != floor).then_some(latest))
    }
}
