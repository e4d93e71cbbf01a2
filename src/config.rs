//! Runtime settings
//!
//! Resolved with priority defaults < config file < environment. The config
//! file is `<config_dir>/config.toml`, or `config.json` when no TOML file
//! exists.

use crate::paths;
use anyhow::{Context, Result};
use backend::WorkspaceConfig;
use orchestrator::OrchestratorConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_BACKEND_URL: &str = "SITESTACK_BACKEND_URL";
pub const ENV_SECRETS_PROVIDER: &str = "SITESTACK_SECRETS_PROVIDER";
pub const ENV_HOME: &str = "SITESTACK_HOME";
pub const ENV_PROJECT: &str = "SITESTACK_PROJECT";
pub const ENV_STORAGE_ROOT: &str = "SITESTACK_STORAGE_ROOT";
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

pub const DEFAULT_PROJECT: &str = "static-site";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_SECRETS_PROVIDER: &str = "passphrase";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub project: String,
    pub backend_url: String,
    pub secrets_provider: String,
    /// Workspace home: plugins are installed under it
    pub home: PathBuf,
    pub region: String,
    pub storage_root: PathBuf,
    pub log_level: Option<String>,
}

/// Config file contents; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    project: Option<String>,
    backend_url: Option<String>,
    secrets_provider: Option<String>,
    home: Option<String>,
    region: Option<String>,
    storage_root: Option<String>,
    log_level: Option<String>,
}

impl Settings {
    /// Load settings for this process
    pub fn load() -> Result<Self> {
        let state_dir = paths::state_dir()?;
        let mut settings = Self::defaults(&state_dir);

        if let Some(file) = read_file(&paths::config_dir()?)? {
            settings.merge(file);
        }
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    fn defaults(state_dir: &Path) -> Self {
        Self {
            project: DEFAULT_PROJECT.to_string(),
            backend_url: format!("file://{}", state_dir.join("backend").display()),
            secrets_provider: DEFAULT_SECRETS_PROVIDER.to_string(),
            home: state_dir.join("workspace"),
            region: DEFAULT_REGION.to_string(),
            storage_root: state_dir.join("objectstore"),
            log_level: None,
        }
    }

    fn merge(&mut self, file: FileSettings) {
        if let Some(project) = file.project {
            self.project = project;
        }
        if let Some(url) = file.backend_url {
            self.backend_url = url;
        }
        if let Some(provider) = file.secrets_provider {
            self.secrets_provider = provider;
        }
        if let Some(home) = file.home {
            self.home = paths::expand(&home);
        }
        if let Some(region) = file.region {
            self.region = region;
        }
        if let Some(root) = file.storage_root {
            self.storage_root = paths::expand(&root);
        }
        if file.log_level.is_some() {
            self.log_level = file.log_level;
        }
    }

    /// Overlay environment variables, skipping empty values
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(project) = get(ENV_PROJECT) {
            self.project = project;
        }
        if let Some(url) = get(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(provider) = get(ENV_SECRETS_PROVIDER) {
            self.secrets_provider = provider;
        }
        if let Some(home) = get(ENV_HOME) {
            self.home = paths::expand(&home);
        }
        if let Some(region) = get(ENV_REGION) {
            self.region = region;
        }
        if let Some(root) = get(ENV_STORAGE_ROOT) {
            self.storage_root = paths::expand(&root);
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.log_level = Some(level);
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let workspace = WorkspaceConfig::new(&self.project, &self.backend_url, &self.home)
            .with_secrets_provider(&self.secrets_provider);
        OrchestratorConfig::new(workspace, &self.region, &self.storage_root)
    }
}

fn read_file(config_dir: &Path) -> Result<Option<FileSettings>> {
    let toml_path = config_dir.join("config.toml");
    if toml_path.is_file() {
        let content = fs::read_to_string(&toml_path)
            .with_context(|| format!("Could not read {}", toml_path.display()))?;
        let file = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", toml_path.display()))?;
        log::debug!("Loaded settings from {}", toml_path.display());
        return Ok(Some(file));
    }

    let json_path = config_dir.join("config.json");
    if json_path.is_file() {
        let content = fs::read_to_string(&json_path)
            .with_context(|| format!("Could not read {}", json_path.display()))?;
        let file = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", json_path.display()))?;
        log::debug!("Loaded settings from {}", json_path.display());
        return Ok(Some(file));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_live_under_state_dir() {
        let settings = Settings::defaults(Path::new("/var/lib/sitestack"));
        assert_eq!(settings.backend_url, "file:///var/lib/sitestack/backend");
        assert_eq!(settings.home, PathBuf::from("/var/lib/sitestack/workspace"));
        assert_eq!(
            settings.storage_root,
            PathBuf::from("/var/lib/sitestack/objectstore")
        );
        assert_eq!(settings.region, "us-east-1");
        assert_eq!(settings.secrets_provider, "passphrase");
    }

    #[test]
    fn test_file_then_env_priority() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "region = \"eu-west-1\"\nproject = \"docs\"\n",
        )
        .unwrap();

        let mut settings = Settings::defaults(dir.path());
        settings.merge(read_file(dir.path()).unwrap().unwrap());
        assert_eq!(settings.region, "eu-west-1");
        assert_eq!(settings.project, "docs");

        let env: HashMap<&str, &str> = [
            (ENV_REGION, "ap-south-1"),
            (ENV_BACKEND_URL, "file:///srv/state"),
            (ENV_PROJECT, "  "),
        ]
        .into_iter()
        .collect();
        settings.apply_env(|key| env.get(key).map(ToString::to_string));
        assert_eq!(settings.region, "ap-south-1");
        assert_eq!(settings.backend_url, "file:///srv/state");
        // blank values are ignored
        assert_eq!(settings.project, "docs");
    }

    #[test]
    fn test_json_config_and_unknown_keys() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"secrets_provider": "awskms://alias/site"}"#,
        )
        .unwrap();
        let file = read_file(dir.path()).unwrap().unwrap();
        assert_eq!(file.secrets_provider.as_deref(), Some("awskms://alias/site"));

        fs::write(dir.path().join("config.toml"), "regoin = \"typo\"\n").unwrap();
        assert!(read_file(dir.path()).is_err());
    }

    #[test]
    fn test_orchestrator_config() {
        let settings = Settings::defaults(Path::new("/state"));
        let config = settings.orchestrator_config();
        assert_eq!(config.workspace.project, DEFAULT_PROJECT);
        assert_eq!(config.workspace.plugin_dir(), PathBuf::from("/state/workspace/plugins"));
        assert_eq!(config.region, "us-east-1");
    }
}
