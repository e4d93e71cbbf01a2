//! Backend URL parsing

use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;

/// Schemes with a known meaning but no client in this crate
const REMOTE_SCHEMES: &[&str] = &["s3", "gs", "azblob", "http", "https"];

/// Where stack state lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendUrl {
    /// A directory on the local filesystem (`file://`)
    Local(PathBuf),
}

impl BackendUrl {
    /// Parse a backend URL
    ///
    /// `file://~/state` and `file:///abs/path` are accepted. Remote schemes
    /// fail with [`Error::UnsupportedBackend`].
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(Error::InvalidUrl(url.to_string()));
        };

        match scheme.to_ascii_lowercase().as_str() {
            "file" => {
                if rest.is_empty() {
                    return Err(Error::InvalidUrl(url.to_string()));
                }
                let expanded = shellexpand::tilde(rest);
                Ok(Self::Local(PathBuf::from(expanded.as_ref())))
            }
            s if REMOTE_SCHEMES.contains(&s) => Err(Error::UnsupportedBackend {
                scheme: s.to_string(),
                url: url.to_string(),
            }),
            _ => Err(Error::InvalidUrl(url.to_string())),
        }
    }

    /// Build a local backend URL for a directory
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local(path.into())
    }

    /// Root directory of a local backend
    pub fn root(&self) -> &PathBuf {
        match self {
            Self::Local(path) => path,
        }
    }
}

impl fmt::Display for BackendUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "file://{}", path.display()),
        }
    }
}
