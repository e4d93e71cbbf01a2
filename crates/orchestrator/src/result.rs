//! Operation results handed back to callers

use crate::error::ErrorKind;
use crate::program::WEBSITE_URL;
use declarative::{ChangeSummary, DiffSummary, PlannedStep, ResourceChange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Lifecycle operation on a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Destroy,
    Preview,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Destroy => "destroy",
            Self::Preview => "preview",
        }
    }

    /// Whether the operation mutates the stack
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Preview)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "destroy" => Ok(Self::Destroy),
            "preview" => Ok(Self::Preview),
            _ => Err(format!(
                "unknown operation '{}': expected create, destroy or preview",
                s.trim()
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Created,
    Destroyed,
    Previewed,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Destroyed => "destroyed",
            Self::Previewed => "previewed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Outcome of one orchestrated operation
#[derive(Debug, Clone)]
pub struct LifecycleResult {
    /// Stack the operation addressed, empty when the name was rejected
    pub stack: String,
    pub operation: Option<Operation>,
    pub status: Status,
    /// Stack outputs, partial when a create failed halfway
    pub outputs: BTreeMap<String, String>,
    pub summary: ChangeSummary,
    /// Executed steps, in order
    pub changes: Vec<ResourceChange>,
    /// Steps a preview would run
    pub planned: Vec<PlannedStep>,
    pub message: String,
    pub error_kind: Option<ErrorKind>,
    /// What to check before retrying, when the failure has a known remedy
    pub advice: Option<String>,
}

impl LifecycleResult {
    pub(crate) fn new(stack: &str, operation: Operation, status: Status) -> Self {
        Self {
            stack: stack.to_string(),
            operation: Some(operation),
            status,
            outputs: BTreeMap::new(),
            summary: ChangeSummary::default(),
            changes: Vec::new(),
            planned: Vec::new(),
            message: String::new(),
            error_kind: None,
            advice: None,
        }
    }

    pub(crate) fn failed(
        stack: &str,
        operation: Option<Operation>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stack: stack.to_string(),
            operation,
            status: Status::Failed,
            outputs: BTreeMap::new(),
            summary: ChangeSummary::default(),
            changes: Vec::new(),
            planned: Vec::new(),
            message: message.into(),
            error_kind: Some(kind),
            advice: None,
        }
    }

    #[must_use]
    pub(crate) fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub(crate) fn with_advice(mut self, advice: Option<String>) -> Self {
        self.advice = advice;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status != Status::Failed
    }

    pub fn website_url(&self) -> Option<&str> {
        self.outputs.get(WEBSITE_URL).map(String::as_str)
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        self.error_kind.is_some_and(|kind| kind.is_retryable())
    }

    /// Planned changes of a preview
    pub fn plan_summary(&self) -> DiffSummary {
        DiffSummary::from_steps(&self.planned)
    }
}
