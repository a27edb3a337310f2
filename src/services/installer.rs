// Adapters for the external package-installation service

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;

use base64::{engine::general_purpose, Engine as _};
use flate2::read::GzDecoder;
use futures_util::StreamExt;
use sha2::{Digest, Sha256, Sha512};
use tar::Archive;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

use crate::models::registry::DistInfo;
use crate::services::registry_client::RegistryClient;
use crate::utils::config::{Config, InstallerKind};
use crate::utils::error::{CliError, Result};
use crate::utils::fs_utils::PACKAGE_DESCRIPTOR;

/// One package to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    pub name: String,
    pub version: String,
}

/// What the installation service is asked to do.
///
/// After success each package's files live at `<root>/node_modules/<name>`.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub root: PathBuf,
    pub store_dir: PathBuf,
    pub registry: String,
    pub pkgs: Vec<PackageVersion>,
}

impl InstallRequest {
    pub fn package_dir(root: &Path, name: &str) -> PathBuf {
        root.join("node_modules").join(name)
    }
}

/// Installs packages into the on-disk cache
#[allow(async_fn_in_trait)]
pub trait Installer {
    async fn install(&self, request: &InstallRequest) -> Result<()>;
}

/// Installer chosen by configuration at startup
#[derive(Debug, Clone)]
pub enum ConfiguredInstaller {
    Npm(NpmInstaller),
    Tarball(TarballInstaller),
}

impl ConfiguredInstaller {
    pub fn from_config(config: &Config, client: &RegistryClient) -> Self {
        match config.installer {
            InstallerKind::Npm => Self::Npm(NpmInstaller::new(config.npm_program.clone())),
            InstallerKind::Tarball => Self::Tarball(TarballInstaller::new(client.clone())),
        }
    }
}

impl Installer for ConfiguredInstaller {
    async fn install(&self, request: &InstallRequest) -> Result<()> {
        match self {
            Self::Npm(installer) => installer.install(request).await,
            Self::Tarball(installer) => installer.install(request).await,
        }
    }
}

/// Delegates to the npm client, which also installs transitive dependencies
#[derive(Debug, Clone)]
pub struct NpmInstaller {
    program: String,
}

impl NpmInstaller {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, request: &InstallRequest) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("install")
            .arg("--prefix")
            .arg(&request.root)
            .arg("--registry")
            .arg(&request.registry)
            .args(["--no-save", "--no-package-lock", "--no-audit", "--no-fund"])
            .args(request.pkgs.iter().map(|pkg| format!("{}@{}", pkg.name, pkg.version)))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }
}

impl Installer for NpmInstaller {
    async fn install(&self, request: &InstallRequest) -> Result<()> {
        let label = describe(request);
        fs::create_dir_all(&request.root)
            .await
            .map_err(|e| CliError::install_failed(&label, e))?;

        debug!(program = %self.program, root = %request.root.display(), "running installer");
        let output = self
            .command(request)
            .output()
            .await
            .map_err(|e| CliError::install_failed(&label, format!("cannot run '{}': {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            let reason = tail.into_iter().rev().collect::<Vec<_>>().join("\n");
            return Err(CliError::install_failed(
                label,
                format!("{} exited with {}\n{}", self.program, output.status, reason),
            ));
        }

        Ok(())
    }
}

/// Fetches a single release tarball and unpacks it; no transitive dependencies
#[derive(Debug, Clone)]
pub struct TarballInstaller {
    client: RegistryClient,
}

impl TarballInstaller {
    pub const fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    async fn install_one(&self, request: &InstallRequest, pkg: &PackageVersion) -> Result<()> {
        let label = format!("{}@{}", pkg.name, pkg.version);
        let destination = InstallRequest::package_dir(&request.root, &pkg.name);
        if destination.exists() {
            debug!(package = %label, "already unpacked");
            return Ok(());
        }

        let dist = self.dist_for(pkg).await?;
        let data = self.download(&dist.tarball, &label).await?;
        verify_integrity(&dist, &data).map_err(|reason| CliError::install_failed(&label, reason))?;

        fs::create_dir_all(&request.store_dir)
            .await
            .map_err(|e| CliError::install_failed(&label, e))?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&request.store_dir)
            .map_err(|e| CliError::install_failed(&label, e))?;
        let unpacked = staging.path().join("package");

        let target = unpacked.clone();
        tokio::task::spawn_blocking(move || extract_tarball(&data, &target))
            .await
            .map_err(|e| CliError::install_failed(&label, e))?
            .map_err(|e| CliError::install_failed(&label, e))?;

        move_into_place(&unpacked, &destination)
            .await
            .map_err(|e| CliError::install_failed(&label, e))?;

        info!(package = %label, path = %destination.display(), "unpacked tarball");
        Ok(())
    }

    async fn dist_for(&self, pkg: &PackageVersion) -> Result<DistInfo> {
        let metadata = self
            .client
            .fetch_metadata(&pkg.name)
            .await?
            .ok_or_else(|| CliError::MetadataUnavailable(pkg.name.clone()))?;

        metadata
            .versions
            .get(&pkg.version)
            .and_then(|release| release.dist.clone())
            .ok_or_else(|| {
                CliError::install_failed(
                    format!("{}@{}", pkg.name, pkg.version),
                    "release has no tarball in registry metadata",
                )
            })
    }

    async fn download(&self, url: &str, label: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .http()
            .get(url)
            .header("User-Agent", self.client.user_agent())
            .send()
            .await
            .map_err(|source| CliError::RegistryUnreachable {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CliError::install_failed(
                label,
                format!("tarball download returned {}", response.status()),
            ));
        }

        let mut data = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CliError::install_failed(label, format!("download stream error: {e}")))?;
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }
}

impl Installer for TarballInstaller {
    async fn install(&self, request: &InstallRequest) -> Result<()> {
        for pkg in &request.pkgs {
            self.install_one(request, pkg).await?;
        }
        Ok(())
    }
}

/// Rename an unpacked package to its final location. A destination that
/// appeared meanwhile (another invocation finished first) is kept.
async fn move_into_place(unpacked: &Path, destination: &Path) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await?;
    }
    match fs::rename(unpacked, destination).await {
        Ok(()) => Ok(()),
        Err(_) if destination.join(PACKAGE_DESCRIPTOR).is_file() => {
            debug!(path = %destination.display(), "lost install race, keeping existing copy");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn describe(request: &InstallRequest) -> String {
    request
        .pkgs
        .iter()
        .map(|pkg| format!("{}@{}", pkg.name, pkg.version))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check a tarball against its SRI `integrity` string.
///
/// Releases that only carry a sha1 `shasum` are accepted unverified.
fn verify_integrity(dist: &DistInfo, data: &[u8]) -> std::result::Result<(), String> {
    let Some(integrity) = dist.integrity.as_deref() else {
        debug!(tarball = %dist.tarball, "no integrity string, skipping verification");
        return Ok(());
    };

    for entry in integrity.split_whitespace() {
        let Some((algorithm, expected)) = entry.split_once('-') else {
            continue;
        };
        let actual = match algorithm {
            "sha512" => Sha512::digest(data).to_vec(),
            "sha256" => Sha256::digest(data).to_vec(),
            _ => continue,
        };
        let expected = general_purpose::STANDARD
            .decode(expected)
            .map_err(|e| format!("malformed integrity string '{entry}': {e}"))?;
        return if actual == expected {
            Ok(())
        } else {
            Err(format!(
                "integrity check failed: expected {entry}, got {algorithm}-{}",
                general_purpose::STANDARD.encode(actual)
            ))
        };
    }

    debug!(integrity, "no supported hash algorithm, skipping verification");
    Ok(())
}

/// Unpack a gzip'd npm tarball, dropping its top-level directory (`package/`).
/// Symlink and hard-link entries are not unpacked.
fn extract_tarball(data: &[u8], target_dir: &Path) -> std::io::Result<()> {
    let decoder = GzDecoder::new(Cursor::new(data));
    let mut archive = Archive::new(decoder);
    std::fs::create_dir_all(target_dir)?;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();

        // Links could point writes of later entries outside `target_dir`.
        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            debug!(path = %path.display(), "skipping link entry");
            continue;
        }
        let relative: PathBuf = path.components().skip(1).collect();

        if relative.as_os_str().is_empty() {
            continue;
        }
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("refusing to unpack '{}'", path.display()),
            ));
        }

        let target_path = target_dir.join(&relative);
        if let Some(parent) = target_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry.unpack(&target_path)?;
    }

    Ok(())
}
