//! Buckets with optional website hosting

use crate::error::{Result, StoreError};
use crate::meta::{BucketMeta, Website};
use crate::naming::{auto_name, validate_bucket_name};
use crate::{opt_str, ObjectStore};
use chrono::Utc;
use declarative::CreateResponse;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use walkdir::WalkDir;

/// Parsed bucket inputs
#[derive(Debug, Clone, PartialEq, Eq)]
struct BucketArgs {
    name: Option<String>,
    website: Option<Website>,
    force_destroy: bool,
}

impl BucketArgs {
    fn parse(inputs: &Value) -> Result<Self> {
        let website = match inputs.get("website") {
            None | Some(Value::Null) => None,
            Some(w) => Some(
                serde_json::from_value(w.clone())
                    .map_err(|_| StoreError::MissingInput("website.indexDocument"))?,
            ),
        };
        Ok(Self {
            name: opt_str(inputs, "bucket").map(str::to_string),
            website,
            force_destroy: inputs
                .get("forceDestroy")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}

impl ObjectStore {
    pub(crate) fn create_bucket(
        &self,
        urn: &str,
        logical: &str,
        inputs: &Value,
    ) -> Result<CreateResponse> {
        let args = BucketArgs::parse(inputs)?;
        let name = args.name.unwrap_or_else(|| auto_name(logical, urn));
        validate_bucket_name(&name)?;

        let region_dir = self.region_dir();
        fs::create_dir_all(&region_dir).map_err(|e| StoreError::io(&region_dir, e))?;
        let dir = self.bucket_dir(&name);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::BucketAlreadyExists(name));
            }
            Err(e) => return Err(StoreError::io(&dir, e)),
        }

        let meta = BucketMeta {
            name: name.clone(),
            region: self.region().to_string(),
            created_at: Utc::now(),
            force_destroy: args.force_destroy,
            website: args.website,
            policy: None,
            objects: BTreeMap::new(),
        };
        if let Err(e) = meta.save(&self.meta_path(&name)) {
            let _ = fs::remove_dir(&dir);
            return Err(e);
        }

        log::debug!("created bucket {name} in {}", self.region());
        Ok(CreateResponse {
            outputs: self.bucket_outputs(&meta),
            id: name,
        })
    }

    pub(crate) fn update_bucket(&self, name: &str, news: &Value) -> Result<Value> {
        let args = BucketArgs::parse(news)?;
        let mut meta = self.load_bucket(name)?;
        meta.website = args.website;
        meta.force_destroy = args.force_destroy;
        meta.save(&self.meta_path(name))?;
        Ok(self.bucket_outputs(&meta))
    }

    /// Delete a bucket; an already missing bucket is not an error
    pub(crate) fn delete_bucket(&self, name: &str) -> Result<()> {
        let meta = BucketMeta::load(&self.meta_path(name))?;
        let dir = self.bucket_dir(name);
        let force = meta.as_ref().is_some_and(|m| m.force_destroy);

        let objects = count_files(&dir);
        if objects > 0 && !force {
            return Err(StoreError::BucketNotEmpty {
                bucket: name.to_string(),
                objects,
            });
        }

        match fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&dir, e)),
        }
        let meta_path = self.meta_path(name);
        match fs::remove_file(&meta_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&meta_path, e)),
        }

        log::debug!("deleted bucket {name}");
        Ok(())
    }

    fn bucket_outputs(&self, meta: &BucketMeta) -> Value {
        let mut outputs = json!({
            "id": meta.name,
            "bucket": meta.name,
            "arn": format!("arn:aws:s3:::{}", meta.name),
            "region": meta.region,
            "forceDestroy": meta.force_destroy,
        });
        if let Some(website) = &meta.website {
            let endpoint = self.bucket_dir(&meta.name).join(&website.index_document);
            outputs["website"] = json!(website);
            outputs["websiteEndpoint"] = json!(format!("file://{}", endpoint.display()));
        }
        outputs
    }
}

fn count_files(dir: &std::path::Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const URN: &str = "urn:sitestack:p.s::p::aws:s3/bucket:Bucket::site";

    fn store(dir: &TempDir) -> ObjectStore {
        ObjectStore::new(dir.path(), "us-east-1").unwrap()
    }

    #[test]
    fn test_create_bucket_with_website() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let created = store
            .create_bucket(URN, "site", &json!({"website": {"indexDocument": "index.html"}}))
            .unwrap();

        assert!(created.id.starts_with("site-"));
        assert!(store.bucket_dir(&created.id).is_dir());
        assert_eq!(created.outputs["arn"], json!(format!("arn:aws:s3:::{}", created.id)));
        let endpoint = created.outputs["websiteEndpoint"].as_str().unwrap();
        assert!(endpoint.starts_with("file://"));
        assert!(endpoint.ends_with(&format!("{}/index.html", created.id)));
    }

    #[test]
    fn test_explicit_name_conflicts() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let inputs = json!({"bucket": "taken-name"});

        store.create_bucket(URN, "site", &inputs).unwrap();
        assert!(matches!(
            store.create_bucket("urn:other", "site", &inputs),
            Err(StoreError::BucketAlreadyExists(_))
        ));
        assert!(matches!(
            store.create_bucket(URN, "site", &json!({"bucket": "Bad_Name"})),
            Err(StoreError::InvalidBucketName { .. })
        ));
    }

    #[test]
    fn test_update_website() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let created = store.create_bucket(URN, "site", &json!({})).unwrap();
        assert!(created.outputs.get("websiteEndpoint").is_none());

        let outputs = store
            .update_bucket(&created.id, &json!({"website": {"indexDocument": "home.html"}}))
            .unwrap();
        assert!(outputs["websiteEndpoint"].as_str().unwrap().ends_with("home.html"));
    }

    #[test]
    fn test_delete_bucket_refuses_objects_without_force() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let created = store.create_bucket(URN, "site", &json!({})).unwrap();
        fs::write(store.bucket_dir(&created.id).join("stray.txt"), "x").unwrap();

        assert!(matches!(
            store.delete_bucket(&created.id),
            Err(StoreError::BucketNotEmpty { objects: 1, .. })
        ));

        store
            .update_bucket(&created.id, &json!({"forceDestroy": true}))
            .unwrap();
        store.delete_bucket(&created.id).unwrap();
        assert!(!store.bucket_dir(&created.id).exists());
        // deleting again is fine
        store.delete_bucket(&created.id).unwrap();
    }

    #[test]
    fn test_bad_website_input() {
        let dir = TempDir::new().unwrap();
        let err = store(&dir)
            .create_bucket(URN, "site", &json!({"website": {"errorDocument": "404.html"}}))
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingInput(_)));
    }
}
