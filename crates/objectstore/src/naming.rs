//! Bucket names and object keys

use crate::error::{Result, StoreError};

/// Length of the hash suffix of generated bucket names
const SUFFIX_LEN: usize = 7;

/// Generate a bucket name from a logical name and the resource URN
///
/// The suffix is derived from the URN, so the same resource always gets
/// the same name while different stacks never collide.
pub fn auto_name(logical: &str, urn: &str) -> String {
    let hash = blake3::hash(urn.as_bytes()).to_hex();
    let mut prefix: String = logical
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    prefix.truncate(63 - SUFFIX_LEN - 1);
    let prefix = prefix.trim_matches('-');
    let prefix = if prefix.is_empty() { "bucket" } else { prefix };
    format!("{prefix}-{}", &hash[..SUFFIX_LEN])
}

/// Check S3 bucket naming rules
pub fn validate_bucket_name(name: &str) -> Result<()> {
    let fail = |reason| {
        Err(StoreError::InvalidBucketName {
            name: name.to_string(),
            reason,
        })
    };

    if !(3..=63).contains(&name.len()) {
        return fail("must be between 3 and 63 characters");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return fail("only lowercase letters, digits, '-' and '.' are allowed");
    }
    let edges_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !edges_ok(name.chars().next()) || !edges_ok(name.chars().last()) {
        return fail("must start and end with a letter or digit");
    }
    if name.contains("..") {
        return fail("must not contain adjacent periods");
    }
    Ok(())
}

/// Object keys map onto relative paths inside the bucket directory
pub fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        Err(StoreError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}
