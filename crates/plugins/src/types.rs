//! Core types for plugin management.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Stack configuration handed to providers (`aws:region`, ...).
pub type PluginConfig = BTreeMap<String, Value>;

/// A pinned provider plugin.
///
/// # Example
///
/// ```
/// use plugins::PluginRequirement;
///
/// let req: PluginRequirement = "aws@v5.16.2".parse().unwrap();
/// assert_eq!(req.name, "aws");
/// assert_eq!(req.dir_name(), "resource-aws-v5.16.2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PluginRequirement {
    /// Plugin name, which is also the provider package.
    pub name: String,
    /// Exact version.
    pub version: String,
}

impl PluginRequirement {
    /// Create a requirement.
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    /// Directory the plugin is installed into.
    #[must_use]
    pub fn dir_name(&self) -> String {
        format!("resource-{}-{}", self.name, self.version)
    }
}

impl fmt::Display for PluginRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl FromStr for PluginRequirement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('@') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                Ok(Self::new(name, version))
            }
            _ => Err(Error::InvalidRequirement(s.to_string())),
        }
    }
}

/// Metadata written next to an installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name.
    pub name: String,
    /// Installed version.
    pub version: String,
    /// Plugin kind; always `resource`.
    pub kind: String,
    /// Source the plugin was resolved from.
    pub source: String,
    /// Installation time.
    pub installed_at: DateTime<Utc>,
}

/// Result of ensuring one requirement is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    /// Installed by this call.
    Installed,
    /// Found already installed; nothing was written.
    AlreadyInstalled,
}

/// Outcome of installing one requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// The requirement.
    pub requirement: PluginRequirement,
    /// What happened.
    pub status: InstallStatus,
    /// Plugin directory.
    pub path: PathBuf,
}

/// A plugin found in the plugin directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlugin {
    /// Manifest contents.
    pub manifest: PluginManifest,
    /// Plugin directory.
    pub path: PathBuf,
}

impl InstalledPlugin {
    /// The requirement this plugin satisfies.
    #[must_use]
    pub fn requirement(&self) -> PluginRequirement {
        PluginRequirement::new(&self.manifest.name, &self.manifest.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_parse() {
        let req: PluginRequirement = "aws@v5.16.2".parse().unwrap();
        assert_eq!(req, PluginRequirement::new("aws", "v5.16.2"));
        assert_eq!(req.to_string(), "aws@v5.16.2");

        for bad in ["aws", "@v1", "aws@", ""] {
            assert!(bad.parse::<PluginRequirement>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_dir_name() {
        let req = PluginRequirement::new("aws", "v5.16.2");
        assert_eq!(req.dir_name(), "resource-aws-v5.16.2");
    }
}
