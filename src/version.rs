//! Version resolution and validation
//!
//! Versions come from one of two places: an explicit CLI argument, or an
//! environment variable derived from the tool name (`del-cli` reads
//! `DEL_CLI_VERSION`). Either way the value must pass the semver policy
//! before an install is attempted.

use semver::Version;
use thiserror::Error;

/// Suffix appended to the transformed tool name to form the env var key
const VERSION_SUFFIX: &str = "_VERSION";

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("version must not be empty")]
    Empty,
    #[error("invalid version '{version}': {source}")]
    Invalid {
        version: String,
        source: semver::Error,
    },
}

/// Build the environment variable key for a tool name
///
/// Uppercases the name and replaces every non-alphanumeric character with
/// an underscore, then appends `_VERSION`.
pub fn env_var_name(tool: &str) -> String {
    let mut key: String = tool
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    key.push_str(VERSION_SUFFIX);
    key
}

/// Resolve a version for the given tool from the process environment
///
/// Returns `None` when the variable is unset or empty.
pub fn resolve(tool: &str) -> Option<String> {
    std::env::var(env_var_name(tool))
        .ok()
        .filter(|v| !v.is_empty())
}

/// Validate a user-supplied version string against the accepted policy
///
/// Accepts full semantic versions, with an optional leading 'v'.
pub fn validate(version: &str) -> Result<String, VersionError> {
    if version.is_empty() {
        return Err(VersionError::Empty);
    }
    let cleaned = version.strip_prefix('v').unwrap_or(version);
    Version::parse(cleaned).map_err(|source| VersionError::Invalid {
        version: version.to_string(),
        source,
    })?;
    Ok(version.to_string())
}
