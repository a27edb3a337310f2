// CLI module for command-line interface

pub mod init;

use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::models::invocation::InvocationContext;
use crate::services::dispatcher::Dispatcher;
use crate::services::installer::ConfiguredInstaller;
use crate::services::launcher::NodeLauncher;
use crate::services::lifecycle::{execute, Command, VersionGate};
use crate::services::registry_client::RegistryClient;
use crate::services::update_notifier::check_for_update;
use crate::services::version_resolver::VersionResolver;
use crate::utils::config::{Config, ConfigOverrides};
use crate::utils::error::CliError;

use self::init::InitCommand;

/// Environment variable that turns off the startup update notice
pub const NO_UPDATE_CHECK_ENV: &str = "SCAFFOLD_NO_UPDATE_CHECK";

/// Options key naming the subcommand; stripped before reaching a child process
pub const COMMAND_KEY: &str = "_command";

/// Main CLI structure
#[derive(Debug, Parser)]
#[command(name = "scaffold")]
#[command(about = "Project scaffolding with commands fetched on demand from an npm registry")]
#[command(long_about = r#"scaffold runs project-generation commands that live in registry packages.

Mapped subcommands are resolved against the registry, installed into a local
cache under the CLI home, kept up to date, and run in a separate runtime
process that receives the command's arguments.

Examples:
  scaffold init my-app                  Create a project with the init package
  scaffold init my-app --force          Reuse a non-empty directory
  scaffold --registry taobao init app   Fetch command packages from a mirror
  scaffold --debug init app             Show resolution and cache details"#)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Run command packages from this local directory instead of the cache
    #[arg(long, global = true, env = "SCAFFOLD_TARGET_PATH")]
    pub target_path: Option<PathBuf>,

    /// CLI home directory (relative paths are under your home directory)
    #[arg(long, global = true, env = "SCAFFOLD_HOME")]
    pub home: Option<PathBuf>,

    /// Registry alias used to fetch command packages (npm, taobao, tencent, ...)
    #[arg(long, global = true, env = "SCAFFOLD_REGISTRY")]
    pub registry: Option<String>,

    /// Skip the check for a newer scaffold release
    #[arg(
        long,
        global = true,
        env = NO_UPDATE_CHECK_ENV,
        value_parser = FalseyValueParser::new()
    )]
    pub no_update_check: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            cli_home: self.home.clone(),
            target_path: self.target_path.clone(),
            registry: self.registry.clone(),
            no_update_check: self.no_update_check,
            debug: self.debug,
        }
    }
}

/// All available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new project
    Init {
        /// Project directory name (default: current directory)
        project_name: Option<String>,

        /// Initialize even if the directory is not empty
        #[arg(short, long)]
        force: bool,
    },

    /// Any other command served by a registry package
    #[command(external_subcommand)]
    External(Vec<String>),
}

impl Commands {
    /// Subcommand name and its invocation context
    pub fn into_invocation(self) -> (String, InvocationContext) {
        match self {
            Self::Init { project_name, force } => {
                let mut options = Map::new();
                options.insert("force".to_string(), Value::Bool(force));
                let args = project_name.into_iter().map(Value::String).collect();
                let ctx = InvocationContext::new(args, options).with_option(COMMAND_KEY, "init");
                ("init".to_string(), ctx)
            }
            Self::External(words) => {
                let (name, rest) = words
                    .split_first()
                    .map_or((String::new(), &[][..]), |(name, rest)| (name.clone(), rest));
                let ctx = InvocationContext::from_cli_args(rest).with_option(COMMAND_KEY, name.as_str());
                (name, ctx)
            }
        }
    }
}

/// CLI command dispatcher
pub struct CliDispatcher<'a> {
    config: &'a Config,
}

impl<'a> CliDispatcher<'a> {
    pub const fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Execute a CLI command and return the process exit code
    pub async fn execute(&self, command: Commands) -> i32 {
        let (name, ctx) = command.into_invocation();
        let resolver = VersionResolver::new(RegistryClient::from_config(self.config));

        if self.config.update_check {
            check_for_update(&resolver, &self.config.cli_package).await;
        }

        if let Some(package) = self.config.commands.package_for(&name) {
            debug!(command = %name, package, "dispatching to command package");
            let installer = ConfiguredInstaller::from_config(self.config, resolver.client());
            let launcher = NodeLauncher::new(self.config.runtime.clone());
            let dispatcher = Dispatcher::new(self.config, resolver, installer, launcher);
            return dispatcher.dispatch(&name, &ctx).await.exit_code();
        }

        match name.as_str() {
            "init" => self.run_builtin(&mut InitCommand::default(), ctx).await,
            _ => {
                let mut available: Vec<&str> = self.config.commands.commands().collect();
                if !available.contains(&"init") {
                    available.push("init");
                }
                available.sort_unstable();
                let err = CliError::UnknownCommand {
                    name,
                    available: available.join(", "),
                };
                error!("{err}");
                err.exit_code()
            }
        }
    }

    /// Run a built-in command through the lifecycle pipeline
    async fn run_builtin<C: Command>(&self, command: &mut C, ctx: InvocationContext) -> i32 {
        let gate = match VersionGate::probe(&self.config.runtime, self.config.min_runtime_version.clone()).await {
            Ok(gate) => gate,
            Err(e) => {
                error!("{e}");
                return e.exit_code();
            }
        };

        let mut argv = ctx.args;
        argv.push(Value::Object(ctx.options));
        execute(command, argv, &gate).await
    }
}
