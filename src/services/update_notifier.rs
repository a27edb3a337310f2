use semver::Version;
use tracing::{debug, warn};

use crate::models::version::{is_newer, parse_version};
use crate::services::version_resolver::VersionResolver;
use crate::utils::error::Result;

/// Newer release of `package` than `current`, if the registry has one
pub async fn newer_release(resolver: &VersionResolver, package: &str, current: &Version) -> Result<Option<Version>> {
    let latest = resolver.resolve_latest_above(package, current).await?;
    Ok(is_newer(&latest, current).then_some(latest))
}

/// Warn when a newer CLI release is published. Never fails the run.
pub async fn check_for_update(resolver: &VersionResolver, package: &str) {
    let current = match parse_version(env!("CARGO_PKG_VERSION")) {
        Ok(version) => version,
        Err(e) => {
            debug!(error = %e, "cannot parse own version");
            return;
        }
    };

    match newer_release(resolver, package, &current).await {
        Ok(Some(latest)) => warn!(
            "A newer {package} is available: {current} -> {latest}. Update with: npm install -g {package}"
        ),
        Ok(None) => debug!(package, version = %current, "CLI is up to date"),
        Err(e) => debug!(error = %e, "update check skipped"),
    }
}
