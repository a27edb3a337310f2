use std::path::PathBuf;

use mockito::Server;
use semver::Version;
use tempfile::TempDir;

use scaffold::models::package_spec::PackageSpec;
use scaffold::models::version::RequestedVersion;
use scaffold::services::package_cache::{PackageCache, UpdateOutcome};
use scaffold::services::registry_client::RegistryClient;
use scaffold::services::version_resolver::VersionResolver;
use scaffold::utils::error::CliError;

use super::support::{mock_package, write_package, FakeInstaller};

const NAME: &str = "scaffold-init";

fn cached_spec(temp: &TempDir, requested: RequestedVersion) -> PackageSpec {
    let target = temp.path().join("dependencies");
    PackageSpec::cached(NAME, requested, target.clone(), target.join("node_modules")).unwrap()
}

fn store_dir(temp: &TempDir) -> PathBuf {
    temp.path().join("dependencies").join("node_modules")
}

#[tokio::test]
async fn test_prepare_creates_store_and_resolves_once() {
    let mut server = Server::new_async().await;
    let mock = mock_package(&mut server, NAME, &["1.0.0", "1.3.0"], 1).await;
    let temp = TempDir::new().unwrap();
    let resolver = VersionResolver::new(RegistryClient::with_registry_url(server.url()));
    let installer = FakeInstaller::default();

    let mut pkg = PackageCache::new(cached_spec(&temp, RequestedVersion::Latest), &resolver, &installer);
    pkg.prepare().await.unwrap();
    pkg.prepare().await.unwrap();

    assert!(store_dir(&temp).is_dir());
    assert_eq!(pkg.spec().resolved(), Some(&Version::new(1, 3, 0)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_install_into_empty_cache() {
    let mut server = Server::new_async().await;
    let _mock = mock_package(&mut server, NAME, &["1.0.0", "1.3.0"], 1).await;
    let temp = TempDir::new().unwrap();
    let resolver = VersionResolver::new(RegistryClient::with_registry_url(server.url()));
    let installer = FakeInstaller::default();

    let mut pkg = PackageCache::new(cached_spec(&temp, RequestedVersion::Latest), &resolver, &installer);
    assert!(!pkg.exists().await.unwrap());
    assert!(!pkg.exists().await.unwrap());

    pkg.install().await.unwrap();
    assert!(pkg.exists().await.unwrap());

    let requests = installer.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].root, store_dir(&temp).join("scaffold-init@1.3.0"));
    assert_eq!(requests[0].store_dir, store_dir(&temp));
    assert_eq!(requests[0].registry, server.url());

    let entry = pkg.root_file_path().await.unwrap().unwrap();
    assert!(entry.ends_with("scaffold-init@1.3.0/node_modules/scaffold-init/index.js"));
}

#[tokio::test]
async fn test_update_is_noop_when_current() {
    let mut server = Server::new_async().await;
    let _mock = mock_package(&mut server, NAME, &["1.0.0", "1.3.0"], 2).await;
    let temp = TempDir::new().unwrap();
    let resolver = VersionResolver::new(RegistryClient::with_registry_url(server.url()));
    let installer = FakeInstaller::default();
    write_package(
        &store_dir(&temp).join("scaffold-init@1.3.0/node_modules/scaffold-init"),
        NAME,
        "1.3.0",
    );

    let mut pkg = PackageCache::new(cached_spec(&temp, RequestedVersion::Latest), &resolver, &installer);
    assert!(pkg.exists().await.unwrap());
    let outcome = pkg.update().await.unwrap();

    assert_eq!(outcome, UpdateOutcome::Current(Version::new(1, 3, 0)));
    assert!(installer.installed_versions().is_empty());
}

#[tokio::test]
async fn test_update_installs_newer_release() {
    let mut server = Server::new_async().await;
    let _mock = mock_package(&mut server, NAME, &["1.0.0", "1.1.0"], 1).await;
    let temp = TempDir::new().unwrap();
    let resolver = VersionResolver::new(RegistryClient::with_registry_url(server.url()));
    let installer = FakeInstaller::default();
    write_package(
        &store_dir(&temp).join("scaffold-init@1.0.0/node_modules/scaffold-init"),
        NAME,
        "1.0.0",
    );

    let requested = RequestedVersion::Concrete(Version::new(1, 0, 0));
    let mut pkg = PackageCache::new(cached_spec(&temp, requested), &resolver, &installer);
    let outcome = pkg.update().await.unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Upgraded {
            from: Some(Version::new(1, 0, 0)),
            to: Version::new(1, 1, 0)
        }
    );
    assert_eq!(installer.installed_versions(), vec!["1.1.0".to_string()]);
    // The resolved version stays put; the cache now points at the upgrade.
    assert_eq!(pkg.spec().resolved(), Some(&Version::new(1, 0, 0)));
    assert_eq!(pkg.effective_version(), Some(&Version::new(1, 1, 0)));

    let entry = pkg.root_file_path().await.unwrap().unwrap();
    assert!(entry.ends_with("scaffold-init@1.1.0/node_modules/scaffold-init/index.js"));
}

#[tokio::test]
async fn test_update_never_downgrades() {
    let mut server = Server::new_async().await;
    let _mock = mock_package(&mut server, NAME, &["1.0.0", "1.5.0"], 1).await;
    let temp = TempDir::new().unwrap();
    let resolver = VersionResolver::new(RegistryClient::with_registry_url(server.url()));
    let installer = FakeInstaller::default();
    write_package(
        &store_dir(&temp).join("scaffold-init@2.0.0/node_modules/scaffold-init"),
        NAME,
        "2.0.0",
    );

    let requested = RequestedVersion::Concrete(Version::new(2, 0, 0));
    let mut pkg = PackageCache::new(cached_spec(&temp, requested), &resolver, &installer);
    let outcome = pkg.update().await.unwrap();

    assert_eq!(outcome, UpdateOutcome::Current(Version::new(2, 0, 0)));
    assert!(installer.installed_versions().is_empty());
    assert_eq!(pkg.effective_version(), Some(&Version::new(2, 0, 0)));
}

#[tokio::test]
async fn test_update_reinstalls_when_descriptor_is_missing() {
    let mut server = Server::new_async().await;
    let _mock = mock_package(&mut server, NAME, &["1.0.0"], 1).await;
    let temp = TempDir::new().unwrap();
    let resolver = VersionResolver::new(RegistryClient::with_registry_url(server.url()));
    let installer = FakeInstaller::default();
    // Leftover of an interrupted install: directory without package.json.
    std::fs::create_dir_all(store_dir(&temp).join("scaffold-init@1.0.0/node_modules/scaffold-init")).unwrap();

    let requested = RequestedVersion::Concrete(Version::new(1, 0, 0));
    let mut pkg = PackageCache::new(cached_spec(&temp, requested), &resolver, &installer);
    let outcome = pkg.update().await.unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Upgraded {
            from: None,
            to: Version::new(1, 0, 0)
        }
    );
    assert_eq!(installer.installed_versions(), vec!["1.0.0".to_string()]);
}

#[tokio::test]
async fn test_installer_error_is_install_failed() {
    let temp = TempDir::new().unwrap();
    // Concrete version: no registry lookup is needed to install.
    let resolver = VersionResolver::new(RegistryClient::with_registry_url("http://127.0.0.1:9"));
    let installer = FakeInstaller::failing();

    let requested = RequestedVersion::Concrete(Version::new(1, 0, 0));
    let mut pkg = PackageCache::new(cached_spec(&temp, requested), &resolver, &installer);
    let result = pkg.install().await;

    assert!(matches!(result, Err(CliError::InstallFailed { .. })));
    assert!(!pkg.exists().await.unwrap());
}

#[tokio::test]
async fn test_root_file_path_without_descriptor_is_none() {
    let temp = TempDir::new().unwrap();
    let resolver = VersionResolver::new(RegistryClient::with_registry_url("http://127.0.0.1:9"));
    let installer = FakeInstaller::default();

    let spec = PackageSpec::local(NAME, RequestedVersion::Latest, temp.path().join("nothing-here")).unwrap();
    let mut pkg = PackageCache::new(spec, &resolver, &installer);

    assert_eq!(pkg.root_file_path().await.unwrap(), None);
    assert!(installer.installed_versions().is_empty());
}
