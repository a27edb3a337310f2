// File system utilities

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::models::registry::PackageDescriptor;
use crate::utils::error::{CliError, Result};

pub const PACKAGE_DESCRIPTOR: &str = "package.json";

pub fn ensure_directory_exists(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Nearest directory at or above `start` that holds a `package.json`
pub fn find_package_dir(start: &Path) -> Option<PathBuf> {
    let start = absolutize(start);
    start
        .ancestors()
        .find(|dir| dir.join(PACKAGE_DESCRIPTOR).is_file())
        .map(Path::to_path_buf)
}

/// Parse `<dir>/package.json`
pub fn read_descriptor(dir: &Path) -> Result<PackageDescriptor> {
    let path = dir.join(PACKAGE_DESCRIPTOR);
    let content = fs::read_to_string(&path).map_err(|e| CliError::Descriptor {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| CliError::Descriptor {
        path,
        reason: e.to_string(),
    })
}

/// Absolute, lexically cleaned path with `/` separators on every platform
pub fn format_path(path: &Path) -> PathBuf {
    let cleaned = normalize(&absolutize(path));
    if cfg!(windows) {
        PathBuf::from(cleaned.to_string_lossy().replace('\\', "/"))
    } else {
        cleaned
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

pub fn is_valid_project_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !name.starts_with(['-', '.'])
        && !name.ends_with('-')
}
