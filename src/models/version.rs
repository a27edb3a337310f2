// Version requests and semantic-version precedence

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::utils::error::{CliError, Result};

/// The version a caller asked for: a concrete release or whatever is newest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedVersion {
    Latest,
    Concrete(Version),
}

impl RequestedVersion {
    pub const fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }

    pub const fn concrete(&self) -> Option<&Version> {
        match self {
            Self::Latest => None,
            Self::Concrete(version) => Some(version),
        }
    }
}

impl fmt::Display for RequestedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Concrete(version) => write!(f, "{version}"),
        }
    }
}

impl FromStr for RequestedVersion {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        parse_version(trimmed).map(Self::Concrete)
    }
}

/// Parse a semantic version, tolerating a leading `v` as runtimes print it
pub fn parse_version(input: &str) -> Result<Version> {
    let cleaned = input.trim().trim_start_matches('v');
    Version::parse(cleaned).map_err(|source| CliError::InvalidVersion {
        input: input.to_string(),
        source,
    })
}

/// Semantic-version precedence. Build metadata does not take part in ordering,
/// and a pre-release sorts below its release.
pub fn precedence(a: &Version, b: &Version) -> Ordering {
    a.major
        .cmp(&b.major)
        .then(a.minor.cmp(&b.minor))
        .then(a.patch.cmp(&b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

pub fn is_newer(candidate: &Version, than: &Version) -> bool {
    precedence(candidate, than) == Ordering::Greater
}
