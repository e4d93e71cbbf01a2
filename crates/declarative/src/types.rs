//! Core types for declarative stack management

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation a step performs against a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOp {
    /// Resource is new
    Create,
    /// Resource is changed in place
    Update,
    /// Resource is recreated (new physical resource, old one deleted)
    Replace,
    /// Resource is removed
    Delete,
    /// Resource already matches
    Same,
}

impl StepOp {
    /// Check if the op mutates anything
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Same)
    }

    /// Short symbol used in plan displays
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace => "+-",
            Self::Delete => "-",
            Self::Same => " ",
        }
    }
}

impl fmt::Display for StepOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::Same => "same",
        };
        f.write_str(s)
    }
}

/// How a provider classifies recorded vs desired inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    /// Nothing to do
    Same,
    /// Can be changed in place
    Update,
    /// Needs a new physical resource
    Replace,
}

/// Result of a single executed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepOutcome {
    Succeeded,
    Failed { error: String },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Record of one step the engine executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChange {
    pub urn: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub op: StepOp,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl ResourceChange {
    pub fn succeeded(urn: &str, resource_type: &str, op: StepOp) -> Self {
        Self {
            urn: urn.to_string(),
            resource_type: resource_type.to_string(),
            op,
            outcome: StepOutcome::Succeeded,
        }
    }

    pub fn failed(urn: &str, resource_type: &str, op: StepOp, error: impl Into<String>) -> Self {
        Self {
            urn: urn.to_string(),
            resource_type: resource_type.to_string(),
            op,
            outcome: StepOutcome::Failed {
                error: error.into(),
            },
        }
    }

    /// Logical resource name (last URN segment)
    pub fn name(&self) -> &str {
        crate::program::urn_name(&self.urn)
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub same: usize,
    pub failed: usize,
}

impl ChangeSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.replaced + self.deleted
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.same + self.failed
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ChangeSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.replaced += other.replaced;
        self.deleted += other.deleted;
        self.same += other.same;
        self.failed += other.failed;
    }

    /// Add a change to the summary
    pub fn add_change(&mut self, change: &ResourceChange) {
        if !change.outcome.is_success() {
            self.failed += 1;
            return;
        }
        match change.op {
            StepOp::Create => self.created += 1,
            StepOp::Update => self.updated += 1,
            StepOp::Replace => self.replaced += 1,
            StepOp::Delete => self.deleted += 1,
            StepOp::Same => self.same += 1,
        }
    }
}

/// Kind of pass recorded in the checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    Update,
    Destroy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_failures_separately() {
        let mut summary = ChangeSummary::default();
        summary.add_change(&ResourceChange::succeeded("a", "t", StepOp::Create));
        summary.add_change(&ResourceChange::succeeded("b", "t", StepOp::Same));
        summary.add_change(&ResourceChange::failed("c", "t", StepOp::Update, "boom"));

        assert_eq!(summary.created, 1);
        assert_eq!(summary.same, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total_changes(), 1);
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_summary_merge() {
        let mut a = ChangeSummary {
            created: 1,
            deleted: 2,
            ..Default::default()
        };
        let b = ChangeSummary {
            created: 2,
            same: 1,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.created, 3);
        assert_eq!(a.deleted, 2);
        assert_eq!(a.same, 1);
    }

    #[test]
    fn test_change_serializes_flat() {
        let change = ResourceChange::failed("urn:x::y", "aws:s3/bucket:Bucket", StepOp::Create, "nope");
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["op"], "create");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "nope");
        assert_eq!(json["type"], "aws:s3/bucket:Bucket");
    }
}
