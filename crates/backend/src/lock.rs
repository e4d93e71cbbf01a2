//! Per-stack leases
//!
//! A lease is a lock file created with exclusive-create semantics. Holding
//! the [`StackLock`] value holds the lease; dropping it releases it, also
//! while unwinding.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Who holds a lease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub stack: String,
    pub operation: String,
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    /// One-line description of the holder
    pub fn describe(&self) -> String {
        format!(
            "{} (pid {}, since {})",
            self.operation,
            self.pid,
            self.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// An acquired stack lease
#[derive(Debug)]
pub struct StackLock {
    path: PathBuf,
    info: LockInfo,
}

impl StackLock {
    /// Try to take the lease at `path`
    pub(crate) fn acquire(path: PathBuf, stack: &str, operation: &str) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let holder = read_info(&path)
                    .map(|info| info.describe())
                    .unwrap_or_else(|| "another operation".to_string());
                return Err(Error::Locked {
                    stack: stack.to_string(),
                    holder,
                });
            }
            Err(e) => return Err(Error::io(&path, e)),
        };

        let info = LockInfo {
            stack: stack.to_string(),
            operation: operation.to_string(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        // the lease exists from here on; release it if the info write fails
        let lock = Self { path, info };
        let json = serde_json::to_vec(&lock.info).unwrap_or_default();
        file.write_all(&json).map_err(|e| Error::io(&lock.path, e))?;

        log::debug!("acquired lease on {} for {}", lock.info.stack, operation);
        Ok(lock)
    }

    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StackLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("released lease on {}", self.info.stack),
            Err(e) => log::warn!(
                "failed to release lease {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Read the holder of a lease, if the file is readable
pub(crate) fn read_info(path: &Path) -> Option<LockInfo> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_conflicts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locks/p/p.s.lock");

        let lock = StackLock::acquire(path.clone(), "p.s", "create").unwrap();
        assert_eq!(lock.info().operation, "create");

        let err = StackLock::acquire(path.clone(), "p.s", "destroy").unwrap_err();
        match err {
            Error::Locked { stack, holder } => {
                assert_eq!(stack, "p.s");
                assert!(holder.starts_with("create"));
            }
            other => panic!("unexpected error: {other}"),
        }

        drop(lock);
        assert!(!path.exists());
        assert!(StackLock::acquire(path, "p.s", "destroy").is_ok());
    }

    #[test]
    fn test_released_on_unwind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.s.lock");

        let p = path.clone();
        let result = std::panic::catch_unwind(move || {
            let _lock = StackLock::acquire(p, "p.s", "create").unwrap();
            panic!("operation crashed");
        });

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
