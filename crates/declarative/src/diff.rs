//! Diff computation for stack resources

use crate::program::urn_name;
use crate::types::StepOp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// A step planned between recorded and desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub urn: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub op: StepOp,
    /// Input properties whose value changes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_keys: Vec<String>,
}

impl PlannedStep {
    pub fn new(urn: &str, resource_type: &str, op: StepOp) -> Self {
        Self {
            urn: urn.to_string(),
            resource_type: resource_type.to_string(),
            op,
            changed_keys: Vec::new(),
        }
    }

    pub fn with_changed_keys(mut self, keys: Vec<String>) -> Self {
        self.changed_keys = keys;
        self
    }

    /// Logical resource name
    pub fn name(&self) -> &str {
        urn_name(&self.urn)
    }
}

/// Top-level input properties that differ between two input objects
pub fn changed_keys(olds: &Value, news: &Value) -> Vec<String> {
    let keys: BTreeSet<&String> = olds
        .as_object()
        .into_iter()
        .chain(news.as_object())
        .flat_map(|m| m.keys())
        .collect();

    keys.into_iter()
        .filter(|k| olds.get(k.as_str()) != news.get(k.as_str()))
        .cloned()
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to change in place
    pub updates: usize,
    /// Number of resources to replace
    pub replacements: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources already converged
    pub unchanged: usize,
}

impl DiffSummary {
    /// Create a summary from a list of planned steps
    pub fn from_steps(steps: &[PlannedStep]) -> Self {
        let mut summary = Self::default();
        for step in steps {
            match step.op {
                StepOp::Create => summary.additions += 1,
                StepOp::Update => summary.updates += 1,
                StepOp::Replace => summary.replacements += 1,
                StepOp::Delete => summary.removals += 1,
                StepOp::Same => summary.unchanged += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.updates + self.replacements + self.removals
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group steps by resource type
pub fn group_by_type(steps: &[PlannedStep]) -> HashMap<String, Vec<&PlannedStep>> {
    let mut groups: HashMap<String, Vec<&PlannedStep>> = HashMap::new();
    for step in steps {
        groups
            .entry(step.resource_type.clone())
            .or_default()
            .push(step);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_changed_keys() {
        let olds = json!({"a": 1, "b": 2, "gone": true});
        let news = json!({"a": 1, "b": 3, "new": "x"});
        assert_eq!(changed_keys(&olds, &news), vec!["b", "gone", "new"]);
    }

    #[test]
    fn test_summary_from_steps() {
        let steps = vec![
            PlannedStep::new("u::a", "t", StepOp::Create),
            PlannedStep::new("u::b", "t", StepOp::Same),
            PlannedStep::new("u::c", "t", StepOp::Replace),
            PlannedStep::new("u::d", "t2", StepOp::Delete),
        ];
        let summary = DiffSummary::from_steps(&steps);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.replacements, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.total(), 3);
        assert!(summary.has_changes());

        let groups = group_by_type(&steps);
        assert_eq!(groups["t"].len(), 3);
        assert_eq!(groups["t2"][0].name(), "d");
    }
}
