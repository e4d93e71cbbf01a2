//! Orchestrator errors and the kinds reported to callers

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Failure class reported in every failed result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Bad request: name, operation or parameters
    Validation,
    /// Backend or plugin problem, raised before anything was changed
    Dependency,
    /// A provider failed while converging; partial progress is kept
    Reconcile,
    /// Another operation holds the stack
    Conflict,
}

impl ErrorKind {
    /// Whether the same request may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Dependency => "dependency",
            Self::Reconcile => "reconcile",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Backend(#[from] backend::Error),

    #[error(transparent)]
    Plugin(#[from] plugins::Error),

    #[error(transparent)]
    Engine(#[from] declarative::Error),
}

impl OrchestratorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Category description and remedy for backend and plugin failures
    pub fn advice(&self) -> Option<String> {
        let (description, advice) = match self {
            Self::Backend(e) => (e.category().description(), e.category().advice()),
            Self::Plugin(e) => (e.category().description(), e.category().advice()),
            Self::Validation(_) | Self::Engine(_) => return None,
        };
        Some(format!("{description}: {advice}"))
    }

    pub fn kind(&self) -> ErrorKind {
        use backend::ErrorCategory;
        use declarative::Error as Engine;

        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Backend(e) => match e.category() {
                ErrorCategory::Conflict => ErrorKind::Conflict,
                ErrorCategory::InvalidInput => ErrorKind::Validation,
                _ => ErrorKind::Dependency,
            },
            Self::Plugin(_) => ErrorKind::Dependency,
            Self::Engine(e) => match e {
                Engine::MissingProvider(_) => ErrorKind::Dependency,
                Engine::InvalidType(_)
                | Engine::DuplicateResource(_)
                | Engine::UnknownReference { .. }
                | Engine::Program { .. } => ErrorKind::Validation,
                Engine::UnresolvedOutput { .. }
                | Engine::Provider { .. }
                | Engine::Checkpoint(_) => ErrorKind::Reconcile,
            },
        }
    }
}

/// Render an error with its causes, outermost first
///
/// Causes already spelled out by the message above them are skipped.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
