//! Workspaces and stack records
//!
//! Layout of a local backend:
//!
//! ```text
//! <root>/.sitestack/
//!   projects/<project>.json          project settings
//!   stacks/<project>/<stack>.json    stack record (config + checkpoint)
//!   locks/<project>/<stack>.lock     lease of a running operation
//! ```

use crate::config::{is_file_name_safe, WorkspaceConfig};
use crate::error::{Error, Result};
use crate::lock::{read_info, LockInfo, StackLock};
use crate::store;
use chrono::{DateTime, Utc};
use declarative::{Checkpoint, CheckpointSink};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Version written into new stack records
pub const RECORD_VERSION: u32 = 1;

const META_DIR: &str = ".sitestack";

/// Project settings recorded the first time a workspace is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub name: String,
    pub runtime: String,
    pub backend: String,
    pub created_at: DateTime<Utc>,
}

/// Everything persisted for one stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackRecord {
    pub version: u32,
    pub project: String,
    pub stack: String,
    pub secrets_provider: String,
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
    #[serde(default)]
    pub checkpoint: Checkpoint,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StackRecord {
    fn new(project: &str, stack: &str, config: &WorkspaceConfig) -> Self {
        let now = Utc::now();
        Self {
            version: RECORD_VERSION,
            project: project.to_string(),
            stack: stack.to_string(),
            secrets_provider: config.secrets_provider.clone(),
            config: config.stack_settings.clone(),
            checkpoint: Checkpoint::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A stack as shown by listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackSummary {
    pub name: String,
    pub resources: usize,
    pub outputs: BTreeMap<String, String>,
    pub updated_at: DateTime<Utc>,
    pub lock: Option<LockInfo>,
}

/// A project bound to a backend
#[derive(Debug, Clone)]
pub struct Workspace {
    config: WorkspaceConfig,
    root: PathBuf,
}

impl Workspace {
    /// Open the workspace described by `config`, creating it if needed
    ///
    /// Fails before touching anything when the backend URL or secrets
    /// provider is unusable.
    pub fn select_or_create(config: WorkspaceConfig) -> Result<Self> {
        let backend = config.backend()?;
        let root = backend.root().clone();
        let meta = root.join(META_DIR);
        fs::create_dir_all(&meta).map_err(|e| Error::io(&meta, e))?;
        fs::create_dir_all(&config.work_dir).map_err(|e| Error::io(&config.work_dir, e))?;

        let workspace = Self { config, root };
        let settings = ProjectSettings {
            name: workspace.config.project.clone(),
            runtime: workspace.config.runtime.clone(),
            backend: backend.to_string(),
            created_at: Utc::now(),
        };
        if store::create(&workspace.project_file(), &settings)? {
            log::info!(
                "created project {} on {}",
                workspace.config.project,
                settings.backend
            );
        }
        Ok(workspace)
    }

    /// Open an existing workspace without creating anything
    ///
    /// Returns `None` when the backend has never been initialized.
    pub fn open(config: WorkspaceConfig) -> Result<Option<Self>> {
        let backend = config.backend()?;
        let root = backend.root().clone();
        if !root.join(META_DIR).is_dir() {
            return Ok(None);
        }
        Ok(Some(Self { config, root }))
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn project(&self) -> &str {
        &self.config.project
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn plugin_dir(&self) -> PathBuf {
        self.config.plugin_dir()
    }

    pub fn project_settings(&self) -> Result<Option<ProjectSettings>> {
        store::read(&self.project_file())
    }

    /// Select a stack, creating its record when it does not exist
    ///
    /// Returns the handle and whether this call created the record. When
    /// two callers race, exactly one of them sees `created == true`.
    pub fn select_or_create_stack(&self, stack: &str) -> Result<(StackHandle, bool)> {
        let path = self.stack_file(stack)?;
        let record = StackRecord::new(&self.config.project, stack, &self.config);
        let created = store::create(&path, &record)?;
        if created {
            log::info!("created stack {stack}");
        }

        let handle = StackHandle::load(path)?.ok_or_else(|| {
            Error::io(
                self.stacks_dir(),
                io::Error::new(io::ErrorKind::NotFound, format!("stack {stack} vanished")),
            )
        })?;
        Ok((handle, created))
    }

    /// Select an existing stack
    pub fn select_stack(&self, stack: &str) -> Result<Option<StackHandle>> {
        StackHandle::load(self.stack_file(stack)?)
    }

    /// Remove a stack record
    ///
    /// Refuses while the checkpoint still tracks resources. Removing a stack
    /// that does not exist returns `false`.
    pub fn remove_stack(&self, stack: &str) -> Result<bool> {
        let path = self.stack_file(stack)?;
        let Some(handle) = StackHandle::load(path.clone())? else {
            return Ok(false);
        };
        if !handle.checkpoint().is_empty() {
            return Err(Error::StackNotEmpty {
                stack: stack.to_string(),
                resources: handle.checkpoint().len() + handle.checkpoint().pending_deletes.len(),
            });
        }
        let removed = store::remove(&path)?;
        if removed {
            log::info!("removed stack {stack}");
        }
        Ok(removed)
    }

    /// All stacks of the project, sorted by name
    pub fn list_stacks(&self) -> Result<Vec<StackSummary>> {
        let dir = self.stacks_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&dir, e)),
        };

        let mut stacks = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::io(&dir, e))?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(record) = store::read::<StackRecord>(&path)? else {
                continue;
            };
            stacks.push(StackSummary {
                lock: read_info(&self.lock_file(&record.stack)?),
                resources: record.checkpoint.len(),
                outputs: record.checkpoint.output_strings(),
                updated_at: record.updated_at,
                name: record.stack,
            });
        }
        stacks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stacks)
    }

    /// Take the lease of a stack for `operation`
    pub fn lock_stack(&self, stack: &str, operation: &str) -> Result<StackLock> {
        StackLock::acquire(self.lock_file(stack)?, stack, operation)
    }

    /// Remove a stale lease, returning its last holder
    pub fn break_lock(&self, stack: &str) -> Result<Option<LockInfo>> {
        let path = self.lock_file(stack)?;
        let info = read_info(&path);
        if store::remove(&path)? {
            log::warn!("broke lease on {stack}");
            Ok(Some(info.unwrap_or_else(|| LockInfo {
                stack: stack.to_string(),
                operation: "unknown".to_string(),
                pid: 0,
                acquired_at: Utc::now(),
            })))
        } else {
            Ok(None)
        }
    }

    fn project_file(&self) -> PathBuf {
        self.root
            .join(META_DIR)
            .join("projects")
            .join(format!("{}.json", self.config.project))
    }

    fn stacks_dir(&self) -> PathBuf {
        self.root
            .join(META_DIR)
            .join("stacks")
            .join(&self.config.project)
    }

    fn stack_file(&self, stack: &str) -> Result<PathBuf> {
        validate_stack_name(stack)?;
        Ok(self.stacks_dir().join(format!("{stack}.json")))
    }

    fn lock_file(&self, stack: &str) -> Result<PathBuf> {
        validate_stack_name(stack)?;
        Ok(self
            .root
            .join(META_DIR)
            .join("locks")
            .join(&self.config.project)
            .join(format!("{stack}.lock")))
    }
}

/// Stack names become file names, so path syntax is rejected
fn validate_stack_name(stack: &str) -> Result<()> {
    if is_file_name_safe(stack) {
        Ok(())
    } else {
        Err(Error::InvalidStackName(stack.to_string()))
    }
}

/// A selected stack and its record
#[derive(Debug, Clone)]
pub struct StackHandle {
    path: PathBuf,
    record: StackRecord,
}

impl StackHandle {
    fn load(path: PathBuf) -> Result<Option<Self>> {
        Ok(store::read(&path)?.map(|record| Self { path, record }))
    }

    pub fn name(&self) -> &str {
        &self.record.stack
    }

    pub fn record(&self) -> &StackRecord {
        &self.record
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.record.checkpoint
    }

    pub fn config(&self) -> &BTreeMap<String, Value> {
        &self.record.config
    }

    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.record.config.get(key)
    }

    /// Set a stack config value, saving only when it changes
    pub fn set_config(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if self.record.config.get(key) == Some(&value) {
            return Ok(());
        }
        self.record.config.insert(key.to_string(), value);
        self.save()
    }

    /// Re-read the record from the backend
    pub fn reload(&mut self) -> Result<()> {
        match store::read(&self.path)? {
            Some(record) => {
                self.record = record;
                Ok(())
            }
            None => Err(Error::io(
                &self.path,
                io::Error::new(io::ErrorKind::NotFound, "stack record was removed"),
            )),
        }
    }

    fn save(&mut self) -> Result<()> {
        self.record.updated_at = Utc::now();
        store::write(&self.path, &self.record)
    }
}

impl CheckpointSink for StackHandle {
    fn persist(&mut self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        self.record.checkpoint = checkpoint.clone();
        self.save()?;
        Ok(())
    }
}
