// Runs a fetched entry file in its own process

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::debug;

use crate::models::invocation::InvocationContext;
use crate::utils::error::{CliError, Result};

/// Builds the child process for an entry file and its serialized arguments
pub trait Launcher {
    fn command(&self, entry: &Path, payload: &str) -> Command;
}

/// `node -e 'require(<entry>)(<payload>)'`
#[derive(Debug, Clone)]
pub struct NodeLauncher {
    program: String,
}

impl NodeLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Script evaluated by the runtime; both values are embedded as JSON literals
    pub fn script(entry: &Path, payload: &str) -> String {
        let entry = serde_json::Value::String(entry.to_string_lossy().into_owned());
        format!("require({entry})({payload})")
    }
}

impl Launcher for NodeLauncher {
    fn command(&self, entry: &Path, payload: &str) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-e").arg(Self::script(entry, payload));
        command
    }
}

/// Spawn the entry file with the sanitized invocation context and wait for it.
///
/// The child shares the parent's working directory, standard streams and
/// process group, so a terminal interrupt reaches both. Returns the child's
/// exit code.
pub async fn run_entry<L: Launcher>(launcher: &L, entry: &Path, ctx: &InvocationContext) -> Result<i32> {
    let payload = ctx.to_payload()?;
    let mut command = launcher.command(entry, &payload);
    let program = command.as_std().get_program().to_string_lossy().into_owned();

    if let Ok(cwd) = std::env::current_dir() {
        command.current_dir(cwd);
    }
    command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    debug!(program = %program, entry = %entry.display(), "spawning child");
    let mut child = command
        .spawn()
        .map_err(|source| CliError::SpawnFailed { program, source })?;
    let status = child.wait().await?;
    debug!(%status, "child exited");
    Ok(exit_code(status))
}

/// Exit code of a finished child; a signal death maps to `128 + signal`
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
