// Four-phase pipeline every subcommand implementation runs through

use semver::Version;
use serde_json::Value;
use tokio::process::Command as ProcessCommand;
use tracing::{debug, error};

use crate::models::invocation::InvocationContext;
use crate::models::version::{is_newer, parse_version};
use crate::utils::error::{CliError, Result};

/// A subcommand implementation. Both phases are required.
#[allow(async_fn_in_trait)]
pub trait Command {
    /// Validate and derive fields from the normalized arguments
    fn init(&mut self, ctx: &InvocationContext) -> Result<()>;

    /// Perform the command's effect
    async fn exec(&mut self) -> Result<()>;
}

/// Minimum host runtime version check
#[derive(Debug, Clone)]
pub struct VersionGate {
    pub current: Version,
    pub minimum: Version,
}

impl VersionGate {
    pub const fn new(current: Version, minimum: Version) -> Self {
        Self { current, minimum }
    }

    /// Probe `<runtime> --version` once and pair it with the minimum
    pub async fn probe(runtime: &str, minimum: Version) -> Result<Self> {
        let unavailable = |reason: String| CliError::RuntimeUnavailable {
            program: runtime.to_string(),
            reason,
        };

        let output = ProcessCommand::new(runtime)
            .arg("--version")
            .output()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        if !output.status.success() {
            return Err(unavailable(format!("--version exited with {}", output.status)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let current = parse_version(stdout.trim()).map_err(|e| unavailable(e.to_string()))?;
        debug!(runtime, version = %current, "probed host runtime");
        Ok(Self::new(current, minimum))
    }

    pub fn check(&self) -> Result<()> {
        if is_newer(&self.minimum, &self.current) {
            return Err(CliError::VersionTooLow {
                current: self.current.clone(),
                minimum: self.minimum.clone(),
            });
        }
        Ok(())
    }
}

/// Run the phases strictly in order, stopping at the first failure:
/// version gate, argument normalization, `init`, `exec`.
pub async fn run_command<C: Command>(command: &mut C, argv: Vec<Value>, gate: &VersionGate) -> Result<()> {
    gate.check()?;
    let ctx = InvocationContext::from_argv(argv)?;
    command.init(&ctx)?;
    command.exec().await
}

/// [`run_command`] with the failure caught and reported once; returns the
/// process exit code.
pub async fn execute<C: Command>(command: &mut C, argv: Vec<Value>, gate: &VersionGate) -> i32 {
    match run_command(command, argv, gate).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{e}");
            e.exit_code()
        }
    }
}
