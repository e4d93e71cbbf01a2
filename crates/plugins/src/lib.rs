//! # plugins
//!
//! Resolver for the provider plugins a program needs.
//!
//! This crate provides functionality for:
//! - Installing pinned plugin versions into a workspace plugin directory
//! - Listing installed plugins
//! - Instantiating providers, but only from installed plugins
//!
//! Installation is idempotent and safe to run concurrently: the manifest of
//! a plugin is written with create-if-absent semantics, so the first writer
//! wins and everybody else sees [`InstallStatus::AlreadyInstalled`].
//!
//! ## Example
//!
//! ```ignore
//! use plugins::{BuiltinSource, PluginRequirement, Resolver};
//!
//! let source = BuiltinSource::new().register("aws", "v5.16.2", |config| {
//!     Ok(Box::new(ObjectStore::from_config(config)?))
//! });
//! let resolver = Resolver::with_source(Box::new(source));
//! let reqs = [PluginRequirement::new("aws", "v5.16.2")];
//!
//! resolver.ensure_installed(&plugin_dir, &reqs)?;
//! let providers = resolver.load(&plugin_dir, &reqs, &stack_config)?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod source;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use source::{BuiltinSource, MockSource, PluginSource, ProviderFactory};
pub use types::{
    InstallOutcome, InstallStatus, InstalledPlugin, PluginConfig, PluginManifest,
    PluginRequirement,
};

use chrono::Utc;
use declarative::ProviderRegistry;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Manifest file inside each plugin directory.
pub const MANIFEST_FILE: &str = "plugin.json";

/// High-level client for plugin operations.
pub struct Resolver {
    source: Box<dyn PluginSource>,
}

impl Resolver {
    /// Create a resolver over a plugin source.
    #[must_use]
    pub fn with_source(source: Box<dyn PluginSource>) -> Self {
        Self { source }
    }

    /// The underlying source.
    pub fn source(&self) -> &dyn PluginSource {
        self.source.as_ref()
    }

    // =========================================================================
    // Installation Operations
    // =========================================================================

    /// Make sure every requirement is installed in `plugin_dir`.
    ///
    /// Requirements are resolved against the source first; nothing is
    /// written unless all of them resolve.
    pub fn ensure_installed(
        &self,
        plugin_dir: &Path,
        requirements: &[PluginRequirement],
    ) -> Result<Vec<InstallOutcome>> {
        for req in requirements {
            if !is_installed(plugin_dir, req) {
                self.source.resolve(req)?;
            }
        }

        requirements
            .iter()
            .map(|req| self.install_one(plugin_dir, req))
            .collect()
    }

    fn install_one(&self, plugin_dir: &Path, req: &PluginRequirement) -> Result<InstallOutcome> {
        let path = plugin_dir.join(req.dir_name());
        let manifest = PluginManifest {
            name: req.name.clone(),
            version: req.version.clone(),
            kind: "resource".to_string(),
            source: self.source.describe(),
            installed_at: Utc::now(),
        };

        let status = if write_manifest(&path, &manifest)? {
            log::info!("installed plugin {req}");
            InstallStatus::Installed
        } else {
            log::debug!("plugin {req} already installed");
            InstallStatus::AlreadyInstalled
        };

        Ok(InstallOutcome {
            requirement: req.clone(),
            status,
            path,
        })
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Instantiate the providers of installed plugins.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotInstalled` if any requirement is missing from
    /// `plugin_dir`.
    pub fn load(
        &self,
        plugin_dir: &Path,
        requirements: &[PluginRequirement],
        config: &PluginConfig,
    ) -> Result<ProviderRegistry> {
        let mut registry = ProviderRegistry::new();
        for req in requirements {
            if !is_installed(plugin_dir, req) {
                return Err(Error::NotInstalled {
                    plugin: req.name.clone(),
                    version: req.version.clone(),
                });
            }
            registry.register(self.source.instantiate(req, config)?);
        }
        Ok(registry)
    }
}

/// Whether a requirement is installed in `plugin_dir`.
pub fn is_installed(plugin_dir: &Path, req: &PluginRequirement) -> bool {
    plugin_dir.join(req.dir_name()).join(MANIFEST_FILE).is_file()
}

/// Plugins installed in `plugin_dir`, sorted by name and version.
pub fn installed(plugin_dir: &Path) -> Result<Vec<InstalledPlugin>> {
    let entries = match fs::read_dir(plugin_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(plugin_dir, e)),
    };

    let mut plugins = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(plugin_dir, e))?.path();
        let manifest_path = path.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            continue;
        }
        let content =
            fs::read_to_string(&manifest_path).map_err(|e| Error::io(&manifest_path, e))?;
        let manifest: PluginManifest =
            serde_json::from_str(&content).map_err(|source| Error::InvalidManifest {
                path: manifest_path.clone(),
                source,
            })?;
        plugins.push(InstalledPlugin { manifest, path });
    }
    plugins.sort_by(|a, b| a.requirement().cmp(&b.requirement()));
    Ok(plugins)
}

/// Write a manifest unless one exists; `false` if it already did
fn write_manifest(dir: &Path, manifest: &PluginManifest) -> Result<bool> {
    let target: PathBuf = dir.join(MANIFEST_FILE);
    if target.is_file() {
        return Ok(false);
    }
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    let json = serde_json::to_vec_pretty(manifest).map_err(|source| Error::InvalidManifest {
        path: target.clone(),
        source,
    })?;
    tmp.write_all(&json).map_err(|e| Error::io(tmp.path(), e))?;

    match tmp.persist_noclobber(&target) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(Error::io(&target, e.error)),
    }
}
