//! Engine errors

use crate::types::StepOp;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while evaluating programs or converging stacks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Type token is not `package:module:Type`.
    #[error("invalid resource type token: {0}")]
    InvalidType(String),

    /// Two declarations share a URN.
    #[error("duplicate resource: {0}")]
    DuplicateResource(String),

    /// A declaration references a resource not registered before it.
    #[error("{urn} references undeclared resource {reference}")]
    UnknownReference { urn: String, reference: String },

    /// The program itself failed.
    #[error("program {program} failed: {message}")]
    Program { program: String, message: String },

    /// No provider is loaded for a resource package.
    #[error("no provider loaded for package '{0}'")]
    MissingProvider(String),

    /// An input references an output that was never produced.
    #[error("output '{property}' of {urn} is not available")]
    UnresolvedOutput { urn: String, property: String },

    /// A provider call failed.
    #[error("{op} of {urn} failed: {message}")]
    Provider {
        urn: String,
        op: StepOp,
        message: String,
    },

    /// The checkpoint could not be persisted.
    #[error("failed to persist checkpoint: {0}")]
    Checkpoint(String),
}

impl Error {
    /// Whether the error happened inside a provider call.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }

    pub(crate) fn provider(urn: &str, op: StepOp, err: &anyhow::Error) -> Self {
        Self::Provider {
            urn: urn.to_string(),
            op,
            message: format!("{err:#}"),
        }
    }
}
