//! Checkpoint: the recorded state of a stack

use crate::program::OutputMap;
use crate::types::{ChangeSummary, UpdateKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A resource the engine created and still tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub urn: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Provider-assigned physical id
    pub id: String,
    /// Resolved inputs the resource was last converged with
    pub inputs: Value,
    pub outputs: Value,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary of the last pass run against the stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub kind: UpdateKind,
    pub finished_at: DateTime<Utc>,
    pub succeeded: bool,
    pub summary: ChangeSummary,
}

/// Recorded state of a stack
///
/// Resources are kept in creation order, so dependencies always come
/// before their dependents and teardown walks the list backwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    /// Physical resources replaced but not yet deleted
    #[serde(default)]
    pub pending_deletes: Vec<ResourceRecord>,
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
    #[serde(default)]
    pub last_update: Option<UpdateInfo>,
}

impl Checkpoint {
    pub fn find(&self, urn: &str) -> Option<&ResourceRecord> {
        self.resources.iter().find(|r| r.urn == urn)
    }

    /// Insert a record, keeping the position of an existing one
    pub fn upsert(&mut self, record: ResourceRecord) {
        match self.resources.iter_mut().find(|r| r.urn == record.urn) {
            Some(existing) => *existing = record,
            None => self.resources.push(record),
        }
    }

    pub fn remove(&mut self, urn: &str) -> Option<ResourceRecord> {
        let index = self.resources.iter().position(|r| r.urn == urn)?;
        Some(self.resources.remove(index))
    }

    /// No tracked or pending resources remain
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.pending_deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Outputs of every tracked resource, keyed by URN
    pub fn output_map(&self) -> OutputMap {
        self.resources
            .iter()
            .map(|r| (r.urn.clone(), r.outputs.clone()))
            .collect()
    }

    /// Stack outputs rendered as strings
    pub fn output_strings(&self) -> BTreeMap<String, String> {
        stringify_outputs(&self.outputs)
    }
}

/// Render output values as plain strings (strings unquoted)
pub fn stringify_outputs(outputs: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    outputs
        .iter()
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), s)
        })
        .collect()
}

/// Durable home of a checkpoint
///
/// The engine calls `persist` after every mutating step, so partial
/// progress survives a failure mid-pass.
pub trait CheckpointSink {
    fn persist(&mut self, checkpoint: &Checkpoint) -> anyhow::Result<()>;
}
