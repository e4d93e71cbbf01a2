//! Workspace configuration handed to the backend

use crate::error::{Error, Result};
use crate::url::BackendUrl;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Secrets provider prefixes accepted for new stacks
const SECRETS_PREFIXES: &[&str] = &["awskms://", "hashivault://", "gcpkms://", "azurekeyvault://"];

/// Whether a name can be used as a single file or directory name
pub(crate) fn is_file_name_safe(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Check that a project name can address backend records
pub fn validate_project_name(project: &str) -> Result<()> {
    if is_file_name_safe(project) {
        Ok(())
    } else {
        Err(Error::InvalidProjectName(project.to_string()))
    }
}

/// Check that a secrets provider identifier is usable
///
/// The identifier is only recorded on the stack; no secret material is
/// ever derived from it here.
pub fn validate_secrets_provider(provider: &str) -> Result<()> {
    let ok = matches!(provider, "passphrase" | "default")
        || SECRETS_PREFIXES
            .iter()
            .any(|p| provider.len() > p.len() && provider.starts_with(p));
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidSecretsProvider(provider.to_string()))
    }
}

/// Everything needed to open a workspace
///
/// Built once per operation and never cached between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Project every stack of this workspace belongs to
    pub project: String,
    /// Where stack records live (`file://...`)
    pub backend_url: String,
    /// Secrets provider recorded on new stacks
    pub secrets_provider: String,
    /// Program runtime recorded in the project settings
    pub runtime: String,
    /// Local working directory (plugins live under it)
    pub work_dir: PathBuf,
    /// Settings applied to a stack when it is first created
    #[serde(default)]
    pub stack_settings: BTreeMap<String, Value>,
}

impl WorkspaceConfig {
    pub fn new(project: &str, backend_url: &str, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            project: project.to_string(),
            backend_url: backend_url.to_string(),
            secrets_provider: "passphrase".to_string(),
            runtime: "rust".to_string(),
            work_dir: work_dir.into(),
            stack_settings: BTreeMap::new(),
        }
    }

    pub fn with_secrets_provider(mut self, provider: &str) -> Self {
        self.secrets_provider = provider.to_string();
        self
    }

    pub fn with_stack_setting(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.stack_settings.insert(key.to_string(), value.into());
        self
    }

    /// Validate and parse the backend URL
    pub fn backend(&self) -> Result<BackendUrl> {
        validate_project_name(&self.project)?;
        validate_secrets_provider(&self.secrets_provider)?;
        BackendUrl::parse(&self.backend_url)
    }

    /// Directory holding installed provider plugins
    pub fn plugin_dir(&self) -> PathBuf {
        self.work_dir.join("plugins")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_providers() {
        for ok in [
            "passphrase",
            "default",
            "awskms://alias/site",
            "hashivault://key",
            "gcpkms://projects/p/locations/l/keyRings/r/cryptoKeys/k",
            "azurekeyvault://vault.vault.azure.net/keys/k",
        ] {
            assert!(validate_secrets_provider(ok).is_ok(), "{ok}");
        }
        for bad in ["", "awskms://", "plaintext", "vault://x"] {
            assert!(validate_secrets_provider(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_backend_checks_secrets_provider_first() {
        let config = WorkspaceConfig::new("p", "file:///tmp/x", "/tmp/w")
            .with_secrets_provider("nope");
        assert!(matches!(
            config.backend(),
            Err(Error::InvalidSecretsProvider(_))
        ));
    }

    #[test]
    fn test_project_name_is_checked_before_anything_else() {
        for bad in ["", "../escape", "a/b", ".hidden", "my project"] {
            let config = WorkspaceConfig::new(bad, "file:///tmp/x", "/tmp/w");
            assert!(
                matches!(config.backend(), Err(Error::InvalidProjectName(_))),
                "{bad}"
            );
        }
        assert!(validate_project_name("static-site").is_ok());
    }

    #[test]
    fn test_plugin_dir_under_work_dir() {
        let config = WorkspaceConfig::new("p", "file:///tmp/x", "/tmp/w");
        assert_eq!(config.plugin_dir(), PathBuf::from("/tmp/w/plugins"));
        assert_eq!(config.runtime, "rust");
    }
}
