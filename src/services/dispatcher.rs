use std::fmt;
use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::models::invocation::InvocationContext;
use crate::models::package_spec::PackageSpec;
use crate::models::version::RequestedVersion;
use crate::services::installer::Installer;
use crate::services::launcher::{run_entry, Launcher};
use crate::services::package_cache::{PackageCache, UpdateOutcome};
use crate::services::version_resolver::VersionResolver;
use crate::utils::config::Config;
use crate::utils::error::{CliError, Result};

/// States one dispatch moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Resolving,
    Cached,
    Fetching,
    Ready,
    Running,
    Done,
    Failed,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Cached => "cached",
            Self::Fetching => "fetching",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What happened during one dispatch
#[derive(Debug)]
pub struct DispatchReport {
    /// Every state entered, in order
    pub trace: Vec<DispatchState>,
    /// Child exit code, or the error that moved the dispatch to `Failed`
    pub result: Result<i32>,
}

impl DispatchReport {
    /// Exit code the parent process should finish with
    pub fn exit_code(&self) -> i32 {
        match &self.result {
            Ok(code) => *code,
            Err(e) => e.exit_code(),
        }
    }

    pub fn final_state(&self) -> Option<DispatchState> {
        self.trace.last().copied()
    }
}

/// Resolves mapped subcommands to command packages and runs them out of process
#[derive(Debug)]
pub struct Dispatcher<'a, I, L> {
    config: &'a Config,
    resolver: VersionResolver,
    installer: I,
    launcher: L,
}

impl<'a, I: Installer, L: Launcher> Dispatcher<'a, I, L> {
    pub const fn new(config: &'a Config, resolver: VersionResolver, installer: I, launcher: L) -> Self {
        Self {
            config,
            resolver,
            installer,
            launcher,
        }
    }

    /// Package serving `command`, `None` for built-in commands
    pub fn package_for(&self, command: &str) -> Option<&str> {
        self.config.commands.package_for(command)
    }

    /// Run one mapped subcommand end to end. Failures are logged here and
    /// reported in the returned [`DispatchReport`].
    pub async fn dispatch(&self, command: &str, ctx: &InvocationContext) -> DispatchReport {
        let mut trace = vec![DispatchState::Resolving];
        let result = self.drive(command, ctx, &mut trace).await;

        match &result {
            Ok(code) => {
                trace.push(DispatchState::Done);
                debug!(command, code, "command finished");
            }
            Err(e) => {
                trace.push(DispatchState::Failed);
                error!("{e}");
            }
        }

        DispatchReport { trace, result }
    }

    async fn drive(&self, command: &str, ctx: &InvocationContext, trace: &mut Vec<DispatchState>) -> Result<i32> {
        let package_name = self.package_for(command).ok_or_else(|| CliError::UnknownCommand {
            name: command.to_string(),
            available: self.config.commands.commands().collect::<Vec<_>>().join(", "),
        })?;

        let mut pkg = PackageCache::new(self.spec_for(package_name)?, &self.resolver, &self.installer);

        if pkg.spec().store_dir().is_some() {
            debug!(
                target_path = %pkg.spec().target_path().display(),
                store_dir = %pkg.spec().store_dir().map(|p| p.display().to_string()).unwrap_or_default(),
                "using shared package cache"
            );
            if pkg.exists().await? {
                enter(trace, DispatchState::Cached);
                if let UpdateOutcome::Upgraded { to, .. } = pkg.update().await? {
                    info!(package = package_name, version = %to, "command package updated");
                }
            } else {
                enter(trace, DispatchState::Fetching);
                pkg.install().await?;
            }
        } else {
            debug!(target_path = %pkg.spec().target_path().display(), "using local command package");
        }
        enter(trace, DispatchState::Ready);

        let entry = pkg
            .root_file_path()
            .await?
            .ok_or_else(|| CliError::EntryPointMissing(package_name.to_string()))?;

        enter(trace, DispatchState::Running);
        run_entry(&self.launcher, &entry, ctx).await
    }

    /// Local override wins; otherwise the package lives in the shared cache
    fn spec_for(&self, package_name: &str) -> Result<PackageSpec> {
        match &self.config.target_path {
            Some(target) => PackageSpec::local(package_name, RequestedVersion::Latest, PathBuf::from(target)),
            None => PackageSpec::cached(
                package_name,
                RequestedVersion::Latest,
                self.config.cache_target_path(),
                self.config.store_dir(),
            ),
        }
    }
}

fn enter(trace: &mut Vec<DispatchState>, state: DispatchState) {
    debug!(state = %state, "dispatch state");
    trace.push(state);
}
