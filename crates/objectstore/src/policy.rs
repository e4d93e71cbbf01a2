//! Bucket policies

use crate::error::{Result, StoreError};
use crate::meta::BucketMeta;
use crate::{req_str, ObjectStore};
use declarative::CreateResponse;
use serde_json::{json, Value};

/// Accept a policy given as a JSON object or as a JSON document string
fn parse_policy(inputs: &Value) -> Result<Value> {
    match inputs.get("policy") {
        Some(Value::String(doc)) => serde_json::from_str(doc)
            .map_err(|e| StoreError::MalformedPolicy(format!("policy is not valid JSON: {e}"))),
        Some(policy @ Value::Object(_)) => Ok(policy.clone()),
        _ => Err(StoreError::MissingInput("policy")),
    }
}

/// Statements as a list, whether given as one object or an array
fn statements(policy: &Value) -> Vec<&Value> {
    match policy.get("Statement") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    }
}

fn as_list(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Check the statements S3 would reject
pub fn validate_policy(bucket: &str, policy: &Value) -> Result<()> {
    let malformed = |msg: String| Err(StoreError::MalformedPolicy(msg));
    let stmts = statements(policy);
    if stmts.is_empty() {
        return malformed("policy has no statements".to_string());
    }

    let arn = format!("arn:aws:s3:::{bucket}");
    for stmt in stmts {
        match stmt.get("Effect").and_then(Value::as_str) {
            Some("Allow" | "Deny") => {}
            other => return malformed(format!("invalid effect {other:?}")),
        }
        if as_list(stmt.get("Action")).is_empty() {
            return malformed("statement has no action".to_string());
        }
        let resources = as_list(stmt.get("Resource"));
        if resources.is_empty() {
            return malformed("statement has no resource".to_string());
        }
        for resource in resources {
            let ours = resource == arn
                || resource
                    .strip_prefix(&arn)
                    .is_some_and(|rest| rest.starts_with('/'));
            if !ours {
                return malformed(format!("Policy has invalid resource {resource}"));
            }
        }
    }
    Ok(())
}

/// Whether a policy lets anybody read objects
pub fn allows_public_read(policy: &Value) -> bool {
    statements(policy).into_iter().any(|stmt| {
        let allow = stmt.get("Effect").and_then(Value::as_str) == Some("Allow");
        let anyone = match stmt.get("Principal") {
            Some(Value::String(p)) => p == "*",
            Some(Value::Object(p)) => as_list(p.get("AWS")).contains(&"*"),
            _ => false,
        };
        let reads = as_list(stmt.get("Action"))
            .iter()
            .any(|a| matches!(*a, "s3:GetObject" | "s3:*" | "*"));
        allow && anyone && reads
    })
}

impl ObjectStore {
    pub(crate) fn put_policy(&self, inputs: &Value) -> Result<CreateResponse> {
        let bucket = req_str(inputs, "bucket")?;
        let policy = parse_policy(inputs)?;
        validate_policy(bucket, &policy)?;

        let mut meta = self.load_bucket(bucket)?;
        meta.policy = Some(policy.clone());
        meta.save(&self.meta_path(bucket))?;

        log::debug!("set policy on {bucket}");
        Ok(CreateResponse {
            id: bucket.to_string(),
            outputs: json!({
                "id": bucket,
                "bucket": bucket,
                "policy": policy,
                "region": self.region(),
            }),
        })
    }

    /// Remove a bucket policy; a missing bucket is not an error
    pub(crate) fn delete_policy(&self, bucket: &str) -> Result<()> {
        let path = self.meta_path(bucket);
        if let Some(mut meta) = BucketMeta::load(&path)?
            && meta.policy.take().is_some()
        {
            meta.save(&path)?;
        }
        Ok(())
    }

    /// Whether anonymous readers may fetch objects of `bucket`
    pub fn is_public_read(&self, bucket: &str) -> Result<bool> {
        let meta = self.load_bucket(bucket)?;
        Ok(meta.policy.as_ref().is_some_and(allows_public_read))
    }
}
