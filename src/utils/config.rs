// Configuration loading: defaults, optional config.toml, environment overrides

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::Deserialize;

use crate::models::version::parse_version;
use crate::utils::error::{CliError, Result};

/// CLI home directory name under the user's home
pub const DEFAULT_CLI_HOME: &str = ".scaffold-cli";
/// Optional configuration file inside the CLI home
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Directory under the CLI home holding fetched command packages
pub const CACHE_DIR: &str = "dependencies";
pub const DEFAULT_REGISTRY_ALIAS: &str = "npm";
pub const DEFAULT_RUNTIME: &str = "node";
pub const LOWEST_RUNTIME_VERSION: &str = "12.0.0";
pub const DEFAULT_CLI_PACKAGE: &str = "@scaffold-cli/core";

const DEFAULT_REGISTRIES: &[(&str, &str)] = &[
    ("npm", "https://registry.npmjs.org"),
    ("taobao", "https://registry.npmmirror.com"),
    ("tencent", "https://mirrors.cloud.tencent.com/npm"),
];

const DEFAULT_COMMANDS: &[(&str, &str)] = &[("init", "@scaffold-cli/init")];

/// Values taken from flags and environment variables, applied last
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub cli_home: Option<PathBuf>,
    pub target_path: Option<PathBuf>,
    pub registry: Option<String>,
    pub no_update_check: bool,
    pub debug: bool,
}

/// Which package-installation service to hand installs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallerKind {
    #[default]
    Npm,
    Tarball,
}

/// Shape of `config.toml`; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub registry: Option<String>,
    pub default_registry: Option<String>,
    pub registries: BTreeMap<String, String>,
    pub commands: Option<BTreeMap<String, String>>,
    pub runtime: Option<String>,
    pub min_runtime_version: Option<String>,
    pub installer: Option<InstallerKind>,
    pub npm_program: Option<String>,
    pub update_check: Option<bool>,
    pub cli_package: Option<String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CliError::Config(format!("invalid config file: {e}")))
    }
}

/// Registry aliases mapped to base URLs, with a fallback alias
#[derive(Debug, Clone)]
pub struct RegistryTable {
    aliases: BTreeMap<String, String>,
    default_alias: String,
}

impl RegistryTable {
    pub fn new(aliases: BTreeMap<String, String>, default_alias: impl Into<String>) -> Result<Self> {
        let default_alias = default_alias.into();
        if !aliases.contains_key(&default_alias) {
            return Err(CliError::Config(format!(
                "default registry '{default_alias}' is not defined"
            )));
        }
        Ok(Self { aliases, default_alias })
    }

    /// Base URL for `alias`, or the default alias's URL when unrecognized
    pub fn url_for(&self, alias: &str) -> &str {
        self.aliases
            .get(alias)
            .or_else(|| self.aliases.get(&self.default_alias))
            .map_or("", String::as_str)
    }

    pub fn default_alias(&self) -> &str {
        &self.default_alias
    }
}

impl Default for RegistryTable {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_REGISTRIES
                .iter()
                .map(|(alias, url)| ((*alias).to_string(), (*url).to_string()))
                .collect(),
            default_alias: DEFAULT_REGISTRY_ALIAS.to_string(),
        }
    }
}

/// Subcommands served by a registry package instead of built-in code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTable {
    entries: BTreeMap<String, String>,
}

impl CommandTable {
    /// Entries with an empty package name are dropped (the command stays built-in).
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .filter(|(_, package)| !package.trim().is_empty())
                .collect(),
        }
    }

    pub fn package_for(&self, command: &str) -> Option<&str> {
        self.entries.get(command).map(String::as_str)
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_COMMANDS
                .iter()
                .map(|(command, package)| ((*command).to_string(), (*package).to_string()))
                .collect(),
        )
    }
}

/// Process-wide settings, built once at startup and passed by reference
#[derive(Debug, Clone)]
pub struct Config {
    pub cli_home: PathBuf,
    /// Local package directory that bypasses the cache and registry
    pub target_path: Option<PathBuf>,
    pub registry_alias: String,
    pub registries: RegistryTable,
    pub commands: CommandTable,
    /// Program that runs fetched entry files
    pub runtime: String,
    pub min_runtime_version: Version,
    pub installer: InstallerKind,
    pub npm_program: String,
    pub update_check: bool,
    /// Package queried for newer CLI releases
    pub cli_package: String,
    pub debug: bool,
}

impl Config {
    /// Resolve the CLI home, read its config.toml and apply overrides
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let home = dirs::home_dir()
            .filter(|home| home.exists())
            .ok_or_else(|| CliError::Config("current user's home directory does not exist".to_string()))?;

        let cli_home = match &overrides.cli_home {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => home.join(path),
            None => home.join(DEFAULT_CLI_HOME),
        };

        let file = ConfigFile::load(&cli_home.join(CONFIG_FILE_NAME))?;
        Self::from_file(cli_home, file, overrides)
    }

    pub fn from_file(cli_home: PathBuf, file: ConfigFile, overrides: &ConfigOverrides) -> Result<Self> {
        let mut aliases: BTreeMap<String, String> = RegistryTable::default().aliases;
        aliases.extend(file.registries);
        let default_alias = file
            .default_registry
            .unwrap_or_else(|| DEFAULT_REGISTRY_ALIAS.to_string());
        let registries = RegistryTable::new(aliases, default_alias)?;

        let registry_alias = overrides
            .registry
            .clone()
            .or(file.registry)
            .unwrap_or_else(|| registries.default_alias().to_string());

        let commands = file.commands.map_or_else(CommandTable::default, CommandTable::new);

        let min_runtime_version = parse_version(
            file.min_runtime_version
                .as_deref()
                .unwrap_or(LOWEST_RUNTIME_VERSION),
        )?;

        Ok(Self {
            cli_home,
            target_path: overrides.target_path.clone(),
            registry_alias,
            registries,
            commands,
            runtime: file.runtime.unwrap_or_else(|| DEFAULT_RUNTIME.to_string()),
            min_runtime_version,
            installer: file.installer.unwrap_or_default(),
            npm_program: file.npm_program.unwrap_or_else(|| "npm".to_string()),
            update_check: file.update_check.unwrap_or(true) && !overrides.no_update_check,
            cli_package: file
                .cli_package
                .unwrap_or_else(|| DEFAULT_CLI_PACKAGE.to_string()),
            debug: overrides.debug,
        })
    }

    /// Defaults rooted at `cli_home`, no file and no overrides
    pub fn with_cli_home(cli_home: PathBuf) -> Result<Self> {
        Self::from_file(cli_home, ConfigFile::default(), &ConfigOverrides::default())
    }

    pub fn registry_url(&self) -> &str {
        self.registries.url_for(&self.registry_alias)
    }

    /// Root the shared package cache is installed under
    pub fn cache_target_path(&self) -> PathBuf {
        self.cli_home.join(CACHE_DIR)
    }

    pub fn store_dir(&self) -> PathBuf {
        self.cache_target_path().join("node_modules")
    }
}
