//! Objects stored as files inside their bucket directory

use crate::error::{Result, StoreError};
use crate::meta::ObjectMeta;
use crate::naming::validate_key;
use crate::{opt_str, req_str, ObjectStore};
use chrono::Utc;
use declarative::CreateResponse;
use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::Path;

/// Content type S3 assigns when none is given
pub const DEFAULT_CONTENT_TYPE: &str = "binary/octet-stream";

fn etag(content: &[u8]) -> String {
    blake3::hash(content).to_hex()[..32].to_string()
}

/// Object id is `<bucket>/<key>`
fn split_id(id: &str) -> Result<(&str, &str)> {
    id.split_once('/')
        .ok_or_else(|| StoreError::InvalidKey(id.to_string()))
}

impl ObjectStore {
    pub(crate) fn create_object(&self, inputs: &Value) -> Result<CreateResponse> {
        let bucket = req_str(inputs, "bucket")?;
        let key = req_str(inputs, "key")?;
        let outputs = self.put_object(bucket, key, inputs)?;
        Ok(CreateResponse {
            id: format!("{bucket}/{key}"),
            outputs,
        })
    }

    pub(crate) fn update_object(&self, id: &str, news: &Value) -> Result<Value> {
        let (bucket, key) = split_id(id)?;
        self.put_object(bucket, key, news)
    }

    fn put_object(&self, bucket: &str, key: &str, inputs: &Value) -> Result<Value> {
        validate_key(key)?;
        let mut meta = self.load_bucket(bucket)?;

        let content = opt_str(inputs, "content").unwrap_or_default();
        let content_type = opt_str(inputs, "contentType").unwrap_or(DEFAULT_CONTENT_TYPE);

        let path = self.bucket_dir(bucket).join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        fs::write(&path, content).map_err(|e| StoreError::io(&path, e))?;

        let object = ObjectMeta {
            content_type: content_type.to_string(),
            etag: etag(content.as_bytes()),
            size: content.len() as u64,
            last_modified: Utc::now(),
        };
        meta.objects.insert(key.to_string(), object.clone());
        meta.save(&self.meta_path(bucket))?;

        log::debug!("put s3://{bucket}/{key} ({} bytes)", object.size);
        Ok(json!({
            "id": format!("{bucket}/{key}"),
            "bucket": bucket,
            "key": key,
            "etag": object.etag,
            "contentType": object.content_type,
            "size": object.size,
            "region": self.region(),
        }))
    }

    /// Delete an object; a missing object or bucket is not an error
    pub(crate) fn delete_object(&self, id: &str) -> Result<()> {
        let (bucket, key) = split_id(id)?;
        validate_key(key)?;

        let bucket_dir = self.bucket_dir(bucket);
        let path = bucket_dir.join(key);
        match fs::remove_file(&path) {
            Ok(()) => prune_empty_dirs(&path, &bucket_dir),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&path, e)),
        }

        let meta_path = self.meta_path(bucket);
        if let Some(mut meta) = crate::meta::BucketMeta::load(&meta_path)?
            && meta.objects.remove(key).is_some()
        {
            meta.save(&meta_path)?;
        }
        log::debug!("deleted s3://{bucket}/{key}");
        Ok(())
    }

    /// Read an object back, with its metadata
    pub fn get_object(&self, bucket: &str, key: &str) -> Result<Option<(Vec<u8>, ObjectMeta)>> {
        validate_key(key)?;
        let meta = self.load_bucket(bucket)?;
        let Some(object) = meta.objects.get(key) else {
            return Ok(None);
        };
        let path = self.bucket_dir(bucket).join(key);
        let content = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        Ok(Some((content, object.clone())))
    }
}

/// Remove directories left empty by a delete, stopping at the bucket root
fn prune_empty_dirs(file: &Path, bucket_dir: &Path) {
    let mut dir = file.parent();
    while let Some(d) = dir {
        if d == bucket_dir || fs::remove_dir(d).is_err() {
            break;
        }
        dir = d.parent();
    }
}
