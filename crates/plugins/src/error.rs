//! Error types for plugin operations.
//!
//! This module provides error types and categories for resolving,
//! installing and loading provider plugins.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of plugin errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Plugin or version unknown to the source.
    NotFound,
    /// Plugin is known but not installed in the workspace.
    NotInstalled,
    /// Permission denied in the plugin directory.
    Permission,
    /// Manifest or requirement could not be parsed.
    Format,
    /// Provider could not be instantiated from its configuration.
    Configuration,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Plugin or version not found",
            Self::NotInstalled => "Plugin not installed",
            Self::Permission => "Permission denied",
            Self::Format => "Invalid plugin metadata",
            Self::Configuration => "Invalid provider configuration",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Verify the plugin name and pinned version",
            Self::NotInstalled => "Run `sitestack plugins install`",
            Self::Permission => "Check permissions of the workspace plugin directory",
            Self::Format => "Remove the damaged plugin directory and install again",
            Self::Configuration => "Check the stack configuration (aws:region, aws:storageRoot)",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during plugin operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No plugin with this name exists at the source.
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// The plugin exists but not in the requested version.
    #[error("version {version} not found for plugin {plugin}")]
    VersionNotFound {
        /// Plugin name.
        plugin: String,
        /// Requested version.
        version: String,
    },

    /// Loading a plugin that was never installed.
    #[error("plugin {plugin}@{version} is not installed")]
    NotInstalled {
        /// Plugin name.
        plugin: String,
        /// Requested version.
        version: String,
    },

    /// Requirement string is not `name@version`.
    #[error("invalid plugin requirement '{0}', expected name@version")]
    InvalidRequirement(String),

    /// IO error in the plugin directory.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Installed manifest could not be decoded.
    #[error("invalid plugin manifest {path}: {source}")]
    InvalidManifest {
        /// Manifest path.
        path: PathBuf,
        /// Decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Provider construction failed.
    #[error("failed to start provider {plugin}: {message}")]
    Instantiate {
        /// Plugin name.
        plugin: String,
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::PluginNotFound(_) | Error::VersionNotFound { .. } => ErrorCategory::NotFound,
            Error::NotInstalled { .. } => ErrorCategory::NotInstalled,
            Error::InvalidRequirement(_) | Error::InvalidManifest { .. } => ErrorCategory::Format,
            Error::Io { source, .. } => {
                if source.kind() == io::ErrorKind::PermissionDenied {
                    ErrorCategory::Permission
                } else {
                    ErrorCategory::Other
                }
            }
            Error::Instantiate { .. } => ErrorCategory::Configuration,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}
