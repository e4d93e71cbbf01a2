//! Request/response contract and structured change records

use crate::error::ErrorKind;
use crate::program::ProgramParameters;
use crate::result::{LifecycleResult, Status};
use declarative::ChangeSummary;
use serde::{Deserialize, Serialize};

/// Log target for machine-readable change records
pub const CHANGES_TARGET: &str = "sitestack::changes";

/// An incoming lifecycle request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub name: String,
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_content: Option<String>,
}

impl Request {
    pub fn parameters(&self) -> Option<ProgramParameters> {
        self.index_content.clone().map(ProgramParameters::new)
    }
}

/// Reply to a [`Request`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSummary>,
}

impl From<&LifecycleResult> for Response {
    fn from(result: &LifecycleResult) -> Self {
        let ran_steps = !result.changes.is_empty();
        Self {
            status: result.status,
            website_url: result.website_url().map(str::to_string),
            message: (!result.message.is_empty()).then(|| result.message.clone()),
            error: result.error_kind,
            changes: ran_steps.then(|| result.summary.clone()),
        }
    }
}

/// Emit one JSON record per executed step plus a closing summary
pub fn log_changes(result: &LifecycleResult) {
    if !log::log_enabled!(target: CHANGES_TARGET, log::Level::Info) {
        return;
    }

    for change in &result.changes {
        let record = serde_json::json!({
            "stack": result.stack,
            "operation": result.operation,
            "change": change,
        });
        log::info!(target: CHANGES_TARGET, "{record}");
    }

    let summary = serde_json::json!({
        "stack": result.stack,
        "operation": result.operation,
        "status": result.status,
        "summary": result.summary,
        "planned": result.plan_summary(),
        "error": result.error_kind,
    });
    log::info!(target: CHANGES_TARGET, "{summary}");
}
