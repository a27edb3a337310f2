// Package name validation

use std::sync::OnceLock;

use regex::Regex;

use crate::utils::error::{CliError, Result};

const MAX_NAME_LENGTH: usize = 214;

fn npm_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:@[a-z0-9][a-z0-9._~-]*/)?[a-z0-9][a-z0-9._~-]*$")
            .unwrap_or_else(|e| unreachable!("static pattern is valid: {e}"))
    })
}

/// Validate an npm package name according to npm naming rules
pub fn validate_npm_package_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(CliError::InvalidArguments(format!(
            "package name '{name}' is too long (max {MAX_NAME_LENGTH} characters)"
        )));
    }

    if !npm_name_pattern().is_match(name) {
        return Err(CliError::InvalidArguments(format!(
            "'{name}' is not a valid npm package name.\n\nValid package names:\n  ✓ express\n  ✓ @scaffold-cli/init\n  ✗ Express\n  ✗ .hidden"
        )));
    }

    Ok(())
}
