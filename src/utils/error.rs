// Common error types for the scaffold CLI

use std::path::PathBuf;

/// Every failure a dispatch or a command lifecycle can end with
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Transport-level failure talking to the registry
    #[error("Registry unreachable at {url}: {source}")]
    RegistryUnreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Registry answered but had nothing usable for the package
    #[error("No registry metadata available for '{0}'")]
    MetadataUnavailable(String),

    /// The package-installation service reported an error
    #[error("Failed to install {package}: {reason}")]
    InstallFailed { package: String, reason: String },

    /// Resolved package declares no runnable main file
    #[error("Package '{0}' has no entry file to run")]
    EntryPointMissing(String),

    /// Host runtime is older than the configured minimum
    #[error("scaffold requires runtime v{minimum} or newer (found v{current})")]
    VersionTooLow {
        current: semver::Version,
        minimum: semver::Version,
    },

    /// Host runtime could not be probed at all
    #[error("Runtime '{program}' is unavailable: {reason}")]
    RuntimeUnavailable { program: String, reason: String },

    /// The child process could not be started
    #[error("Failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown command '{name}'. Available commands: {available}")]
    UnknownCommand { name: String, available: String },

    #[error("Invalid version '{input}': {source}")]
    InvalidVersion {
        input: String,
        #[source]
        source: semver::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path}: {reason}")]
    Descriptor { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code used when this error ends a run
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArguments(_) | Self::UnknownCommand { .. } => 2,
            _ => 1,
        }
    }

    pub fn install_failed(package: impl Into<String>, reason: impl ToString) -> Self {
        Self::InstallFailed {
            package: package.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
