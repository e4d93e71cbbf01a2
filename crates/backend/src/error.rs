//! Error types for backend operations.
//!
//! Errors are categorized so callers can tell a misconfigured backend from
//! a stack that is simply busy.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of backend errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Backend URL or secrets provider is malformed or unsupported.
    Config,
    /// Backend storage could not be read or written.
    Unavailable,
    /// Another operation holds the stack lease.
    Conflict,
    /// Stack name is not usable.
    InvalidInput,
    /// A stored record could not be decoded.
    Corrupt,
    /// The stack still tracks resources.
    NotEmpty,
}

impl ErrorCategory {
    /// Whether retrying later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Config => "Backend configuration error",
            Self::Unavailable => "Backend unavailable",
            Self::Conflict => "Stack is locked",
            Self::InvalidInput => "Invalid stack name",
            Self::Corrupt => "Corrupt backend record",
            Self::NotEmpty => "Stack still has resources",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Config => {
                "Check SITESTACK_PROJECT, SITESTACK_BACKEND_URL and SITESTACK_SECRETS_PROVIDER"
            }
            Self::Unavailable => "Check that the backend directory exists and is writable",
            Self::Conflict => {
                "Wait for the other operation to finish, or run `sitestack unlock` if it crashed"
            }
            Self::InvalidInput => "Use letters, digits, '-', '_' and '.' only",
            Self::Corrupt => "Inspect or remove the damaged record under .sitestack/",
            Self::NotEmpty => "Destroy the stack before removing it",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur in the backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backend URL could not be parsed.
    #[error("invalid backend URL '{0}'")]
    InvalidUrl(String),

    /// Backend URL scheme is recognized but has no client here.
    #[error("unsupported backend scheme '{scheme}' in {url}")]
    UnsupportedBackend {
        /// URL scheme (`s3`, `gs`, ...).
        scheme: String,
        /// Full URL.
        url: String,
    },

    /// Secrets provider identifier is not recognized.
    #[error("unsupported secrets provider '{0}'")]
    InvalidSecretsProvider(String),

    /// Project name cannot address backend records.
    #[error("invalid project name '{0}'")]
    InvalidProjectName(String),

    /// Stack name cannot be stored.
    #[error("invalid stack name '{0}'")]
    InvalidStackName(String),

    /// IO error during backend operations.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// A stored record is not valid JSON for its type.
    #[error("corrupt record {path}: {source}")]
    Corrupt {
        /// Record path.
        path: PathBuf,
        /// Decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Lease held by another operation.
    #[error("stack {stack} is locked by {holder}")]
    Locked {
        /// Stack name.
        stack: String,
        /// Description of the lease holder.
        holder: String,
    },

    /// Stack cannot be removed while it tracks resources.
    #[error("stack {stack} still has {resources} resources")]
    StackNotEmpty {
        /// Stack name.
        stack: String,
        /// Number of tracked resources.
        resources: usize,
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
            Error::InvalidUrl(_)
            | Error::UnsupportedBackend { .. }
            | Error::InvalidSecretsProvider(_)
            | Error::InvalidProjectName(_) => ErrorCategory::Config,
            Error::InvalidStackName(_) => ErrorCategory::InvalidInput,
            Error::Io { .. } => ErrorCategory::Unavailable,
            Error::Corrupt { .. } => ErrorCategory::Corrupt,
            Error::Locked { .. } => ErrorCategory::Conflict,
            Error::StackNotEmpty { .. } => ErrorCategory::NotEmpty,
        }
    }

    /// Whether retrying later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}
