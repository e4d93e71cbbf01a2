//! # objectstore
//!
//! An S3-compatible provider that keeps buckets on the local filesystem.
//!
//! Each region is a directory under the storage root. A bucket is a
//! directory inside its region and every object is a file inside its
//! bucket. Bucket settings (website hosting, policy, object content types)
//! live in `<root>/<region>/.buckets/<bucket>.json`.
//!
//! The provider serves the `aws` package:
//!
//! | Type | Id | Replaced when |
//! |------|----|---------------|
//! | `aws:s3/bucket:Bucket` | bucket name | `bucket` changes |
//! | `aws:s3/bucketObject:BucketObject` | `<bucket>/<key>` | `bucket` or `key` changes |
//! | `aws:s3/bucketPolicy:BucketPolicy` | bucket name | `bucket` changes |
//!
//! Buckets declared without an explicit `bucket` name get a generated one
//! (`<logical-name>-<7 hex>`) that is stable for the resource URN.
//!
//! Every resource records its `region` in its outputs. Updates and deletes
//! go to that region, whatever region the store was opened for.

mod bucket;
pub mod error;
mod meta;
pub mod naming;
mod object;
pub mod policy;

pub use error::{Result, StoreError};
pub use meta::{BucketMeta, ObjectMeta, Website};
pub use object::DEFAULT_CONTENT_TYPE;

use declarative::{CreateRequest, CreateResponse, DeleteRequest, Provider, UpdateRequest};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Provider package
pub const PACKAGE: &str = "aws";
/// Plugin version this provider implements
pub const VERSION: &str = "v5.16.2";

pub const BUCKET: &str = "aws:s3/bucket:Bucket";
pub const BUCKET_OBJECT: &str = "aws:s3/bucketObject:BucketObject";
pub const BUCKET_POLICY: &str = "aws:s3/bucketPolicy:BucketPolicy";

/// Stack config key holding the region
pub const REGION_KEY: &str = "aws:region";
/// Stack config key holding the storage root directory
pub const STORAGE_ROOT_KEY: &str = "aws:storageRoot";

const META_DIR: &str = ".buckets";

/// Filesystem-backed object store for one region
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    region: String,
}

impl ObjectStore {
    /// Open the store for `region` under `root`
    ///
    /// Nothing is created until the first bucket is.
    pub fn new(root: impl Into<PathBuf>, region: &str) -> Result<Self> {
        let valid = !region.is_empty()
            && region
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(StoreError::InvalidRegion(region.to_string()));
        }
        Ok(Self {
            root: root.into(),
            region: region.to_string(),
        })
    }

    /// Build a store from stack configuration
    pub fn from_config(config: &BTreeMap<String, Value>) -> anyhow::Result<Self> {
        let region = config
            .get(REGION_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("{REGION_KEY} is not set"))?;
        let root = config
            .get(STORAGE_ROOT_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("{STORAGE_ROOT_KEY} is not set"))?;
        Ok(Self::new(root, region)?)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn region_dir(&self) -> PathBuf {
        self.root.join(&self.region)
    }

    /// Directory holding the objects of a bucket
    pub fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.region_dir().join(bucket)
    }

    fn meta_path(&self, bucket: &str) -> PathBuf {
        self.region_dir()
            .join(META_DIR)
            .join(format!("{bucket}.json"))
    }

    /// Store for the region a resource was created in
    ///
    /// Falls back to this store when `outputs` carries no region.
    fn located(&self, outputs: &Value) -> Result<Self> {
        match opt_str(outputs, "region") {
            Some(region) if region != self.region => Self::new(self.root.clone(), region),
            _ => Ok(self.clone()),
        }
    }

    fn load_bucket(&self, bucket: &str) -> Result<BucketMeta> {
        BucketMeta::load(&self.meta_path(bucket))?
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))
    }

    /// Settings of a bucket, `None` if it does not exist
    pub fn bucket(&self, bucket: &str) -> Result<Option<BucketMeta>> {
        BucketMeta::load(&self.meta_path(bucket))
    }

    /// Names of all buckets in the region
    pub fn list_buckets(&self) -> Result<Vec<String>> {
        let dir = self.region_dir().join(META_DIR);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut names: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".json").map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

pub(crate) fn req_str<'a>(inputs: &'a Value, key: &'static str) -> Result<&'a str> {
    opt_str(inputs, key).ok_or(StoreError::MissingInput(key))
}

pub(crate) fn opt_str<'a>(inputs: &'a Value, key: &str) -> Option<&'a str> {
    inputs.get(key).and_then(Value::as_str)
}

impl Provider for ObjectStore {
    fn package(&self) -> &str {
        PACKAGE
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn replace_keys(&self, type_token: &str) -> &'static [&'static str] {
        match type_token {
            BUCKET | BUCKET_POLICY => &["bucket"],
            BUCKET_OBJECT => &["bucket", "key"],
            _ => &[],
        }
    }

    fn create(&self, req: &CreateRequest<'_>) -> anyhow::Result<CreateResponse> {
        let created = match req.type_token {
            BUCKET => self.create_bucket(req.urn, req.name, req.inputs)?,
            BUCKET_OBJECT => self.create_object(req.inputs)?,
            BUCKET_POLICY => self.put_policy(req.inputs)?,
            other => return Err(StoreError::UnknownType(other.to_string()).into()),
        };
        Ok(created)
    }

    fn update(&self, req: &UpdateRequest<'_>) -> anyhow::Result<Value> {
        let store = self.located(req.old_outputs)?;
        let outputs = match req.type_token {
            BUCKET => store.update_bucket(req.id, req.news)?,
            BUCKET_OBJECT => store.update_object(req.id, req.news)?,
            BUCKET_POLICY => store.put_policy(req.news)?.outputs,
            other => return Err(StoreError::UnknownType(other.to_string()).into()),
        };
        Ok(outputs)
    }

    fn delete(&self, req: &DeleteRequest<'_>) -> anyhow::Result<()> {
        let store = self.located(req.outputs)?;
        match req.type_token {
            BUCKET => store.delete_bucket(req.id)?,
            BUCKET_OBJECT => store.delete_object(req.id)?,
            BUCKET_POLICY => store.delete_policy(req.id)?,
            other => return Err(StoreError::UnknownType(other.to_string()).into()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{DiffKind, Provider};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_region_validation() {
        assert!(ObjectStore::new("/tmp", "us-east-1").is_ok());
        for bad in ["", "US-EAST-1", "../up", "us east"] {
            assert!(ObjectStore::new("/tmp", bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_from_config() {
        let mut config = BTreeMap::new();
        assert!(ObjectStore::from_config(&config).is_err());

        config.insert(REGION_KEY.to_string(), json!("eu-west-1"));
        let err = ObjectStore::from_config(&config).unwrap_err();
        assert!(err.to_string().contains(STORAGE_ROOT_KEY));

        config.insert(STORAGE_ROOT_KEY.to_string(), json!("/srv/objects"));
        let store = ObjectStore::from_config(&config).unwrap();
        assert_eq!(store.region(), "eu-west-1");
        assert_eq!(store.bucket_dir("b"), PathBuf::from("/srv/objects/eu-west-1/b"));
    }

    #[test]
    fn test_replace_keys_per_type() {
        let store = ObjectStore::new("/tmp", "us-east-1").unwrap();
        let olds = json!({"bucket": "a", "key": "index.html", "content": "x"});

        assert_eq!(
            store.diff(BUCKET_OBJECT, &olds, &json!({"bucket": "a", "key": "index.html", "content": "y"})),
            DiffKind::Update
        );
        assert_eq!(
            store.diff(BUCKET_OBJECT, &olds, &json!({"bucket": "a", "key": "home.html", "content": "x"})),
            DiffKind::Replace
        );
        assert_eq!(
            store.diff(BUCKET, &json!({"website": {}}), &json!({"bucket": "named"})),
            DiffKind::Replace
        );
    }

    #[test]
    fn test_provider_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path(), "us-east-1").unwrap();
        let urn = "urn:sitestack:p.s::p::aws:s3/bucket:Bucket::site";

        let bucket = store
            .create(&CreateRequest {
                urn,
                type_token: BUCKET,
                name: "site",
                inputs: &json!({"website": {"indexDocument": "index.html"}}),
            })
            .unwrap();
        let object_inputs = json!({"bucket": bucket.id, "key": "index.html", "content": "hi"});
        let object = store
            .create(&CreateRequest {
                urn: "urn:o",
                type_token: BUCKET_OBJECT,
                name: "index",
                inputs: &object_inputs,
            })
            .unwrap();
        assert_eq!(store.list_buckets().unwrap(), vec![bucket.id.clone()]);

        let err = store
            .delete(&DeleteRequest {
                urn,
                type_token: BUCKET,
                id: &bucket.id,
                outputs: &bucket.outputs,
            })
            .unwrap_err();
        assert!(err.to_string().contains("BucketNotEmpty"));

        for (type_token, resp) in [(BUCKET_OBJECT, &object), (BUCKET, &bucket)] {
            store
                .delete(&DeleteRequest {
                    urn,
                    type_token,
                    id: &resp.id,
                    outputs: &resp.outputs,
                })
                .unwrap();
        }
        assert!(store.list_buckets().unwrap().is_empty());
    }

    #[test]
    fn test_delete_follows_recorded_region() {
        let dir = TempDir::new().unwrap();
        let east = ObjectStore::new(dir.path(), "us-east-1").unwrap();
        let west = ObjectStore::new(dir.path(), "eu-west-1").unwrap();
        let urn = "urn:sitestack:p.s::p::aws:s3/bucket:Bucket::site";

        let bucket = east
            .create(&CreateRequest {
                urn,
                type_token: BUCKET,
                name: "site",
                inputs: &json!({}),
            })
            .unwrap();
        assert_eq!(bucket.outputs["region"], "us-east-1");

        west.delete(&DeleteRequest {
            urn,
            type_token: BUCKET,
            id: &bucket.id,
            outputs: &bucket.outputs,
        })
        .unwrap();
        assert!(east.list_buckets().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_type() {
        let store = ObjectStore::new("/tmp", "us-east-1").unwrap();
        let err = store
            .create(&CreateRequest {
                urn: "u",
                type_token: "aws:ec2/instance:Instance",
                name: "vm",
                inputs: &json!({}),
            })
            .unwrap_err();
        assert!(err.to_string().contains("unknown resource type"));
    }
}
