use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, info};

use crate::models::invocation::InvocationContext;
use crate::services::lifecycle::Command;
use crate::utils::error::{CliError, Result};
use crate::utils::fs_utils::{ensure_directory_exists, is_valid_project_name};

/// Built-in `init`, used when no command package is mapped for it
#[derive(Debug, Default)]
pub struct InitCommand {
    pub project_name: String,
    pub force: bool,
    pub target_dir: PathBuf,
}

impl InitCommand {
    async fn is_empty_dir(&self) -> Result<bool> {
        if !self.target_dir.exists() {
            return Ok(true);
        }
        let mut entries = fs::read_dir(&self.target_dir).await?;
        Ok(entries.next_entry().await?.is_none())
    }
}

impl Command for InitCommand {
    fn init(&mut self, ctx: &InvocationContext) -> Result<()> {
        let cwd = std::env::current_dir()?;

        let (project_name, target_dir) = match ctx.positional_str(0).filter(|name| !name.is_empty()) {
            Some(name) => (name.to_string(), cwd.join(name)),
            None => {
                let name = cwd
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (name, cwd)
            }
        };

        if !is_valid_project_name(&project_name) {
            return Err(CliError::InvalidArguments(format!(
                "Invalid project name '{project_name}'.\n\nProject names may contain letters, digits, '-', '_' and '.':\n  ✓ my-app\n  ✓ web_console\n  ✗ my app"
            )));
        }

        self.project_name = project_name;
        self.target_dir = target_dir;
        self.force = ctx.option_bool("force");
        debug!(project_name = %self.project_name, force = self.force, "init arguments");
        Ok(())
    }

    async fn exec(&mut self) -> Result<()> {
        if !self.force && !self.is_empty_dir().await? {
            return Err(CliError::InvalidArguments(format!(
                "Directory {} is not empty. Use --force to initialize anyway.",
                self.target_dir.display()
            )));
        }

        ensure_directory_exists(&self.target_dir)?;
        info!(
            "Project {} is ready at {}",
            self.project_name,
            self.target_dir.display()
        );
        Ok(())
    }
}
