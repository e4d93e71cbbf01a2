//! Object store errors, named after their S3 counterparts

use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("InvalidBucketName: {name}: {reason}")]
    InvalidBucketName { name: String, reason: &'static str },

    #[error("BucketAlreadyExists: {0}")]
    BucketAlreadyExists(String),

    #[error("NoSuchBucket: {0}")]
    NoSuchBucket(String),

    #[error("BucketNotEmpty: {bucket} still holds {objects} objects")]
    BucketNotEmpty { bucket: String, objects: usize },

    #[error("InvalidKey: {0}")]
    InvalidKey(String),

    #[error("MalformedPolicy: {0}")]
    MalformedPolicy(String),

    #[error("missing required input '{0}'")]
    MissingInput(&'static str),

    #[error("invalid region '{0}'")]
    InvalidRegion(String),

    #[error("unknown resource type {0}")]
    UnknownType(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt bucket metadata {path}: {source}")]
    CorruptMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
