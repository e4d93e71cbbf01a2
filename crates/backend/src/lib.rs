//! # Backend
//!
//! Persistent stack state behind a backend URL.
//!
//! A [`Workspace`] binds a project to a backend. Each stack has one record
//! holding its config and the engine [`declarative::Checkpoint`];
//! [`StackHandle`] implements [`declarative::CheckpointSink`] so the engine
//! can persist progress directly. Running operations hold a [`StackLock`].
//!
//! Only `file://` backends have a client. Records are written atomically,
//! and stack creation uses create-if-absent writes so concurrent callers
//! agree on a single record.
//!
//! ## Example
//!
//! ```ignore
//! use backend::{Workspace, WorkspaceConfig};
//!
//! let config = WorkspaceConfig::new("sites", "file://~/.sitestack", "/tmp/work");
//! let workspace = Workspace::select_or_create(config)?;
//! let (mut stack, created) = workspace.select_or_create_stack("sites.alpha")?;
//! let _lease = workspace.lock_stack("sites.alpha", "create")?;
//! stack.set_config("aws:region", "us-east-1")?;
//! ```

pub mod config;
pub mod error;
pub mod lock;
mod store;
pub mod url;
pub mod workspace;

pub use config::{validate_project_name, validate_secrets_provider, WorkspaceConfig};
pub use error::{Error, ErrorCategory, Result};
pub use lock::{LockInfo, StackLock};
pub use url::BackendUrl;
pub use workspace::{ProjectSettings, StackHandle, StackRecord, StackSummary, Workspace};
