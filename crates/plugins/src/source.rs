//! Plugin sources: where plugins are resolved and instantiated from.
//!
//! Providers are compiled into the binary, so a source is a catalog of
//! versioned provider factories. [`BuiltinSource`] is the real one;
//! [`MockSource`] counts lookups and never yields providers.

use crate::error::{Error, Result};
use crate::types::{PluginConfig, PluginRequirement};
use declarative::BoxedProvider;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Builds a provider from the stack configuration.
pub type ProviderFactory = Arc<dyn Fn(&PluginConfig) -> anyhow::Result<BoxedProvider> + Send + Sync>;

/// A source of provider plugins.
pub trait PluginSource: Send + Sync {
    /// Short description recorded in install manifests.
    fn describe(&self) -> String;

    /// Versions available for a plugin.
    ///
    /// # Errors
    ///
    /// Returns `Error::PluginNotFound` for unknown plugins.
    fn versions(&self, name: &str) -> Result<Vec<String>>;

    /// Instantiate the provider of an installed plugin.
    fn instantiate(&self, req: &PluginRequirement, config: &PluginConfig) -> Result<BoxedProvider>;

    /// Check that a requirement can be satisfied.
    fn resolve(&self, req: &PluginRequirement) -> Result<()> {
        if self.versions(&req.name)?.contains(&req.version) {
            Ok(())
        } else {
            Err(Error::VersionNotFound {
                plugin: req.name.clone(),
                version: req.version.clone(),
            })
        }
    }
}

/// Providers linked into the binary.
#[derive(Clone, Default)]
pub struct BuiltinSource {
    factories: BTreeMap<PluginRequirement, ProviderFactory>,
}

impl BuiltinSource {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `name@version`.
    pub fn register<F>(mut self, name: &str, version: &str, factory: F) -> Self
    where
        F: Fn(&PluginConfig) -> anyhow::Result<BoxedProvider> + Send + Sync + 'static,
    {
        self.factories
            .insert(PluginRequirement::new(name, version), Arc::new(factory));
        self
    }

    /// Every registered requirement.
    pub fn available(&self) -> impl Iterator<Item = &PluginRequirement> {
        self.factories.keys()
    }
}

impl std::fmt::Debug for BuiltinSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinSource")
            .field("plugins", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginSource for BuiltinSource {
    fn describe(&self) -> String {
        "builtin".to_string()
    }

    fn versions(&self, name: &str) -> Result<Vec<String>> {
        let versions: Vec<String> = self
            .factories
            .keys()
            .filter(|r| r.name == name)
            .map(|r| r.version.clone())
            .collect();
        if versions.is_empty() {
            Err(Error::PluginNotFound(name.to_string()))
        } else {
            Ok(versions)
        }
    }

    fn instantiate(&self, req: &PluginRequirement, config: &PluginConfig) -> Result<BoxedProvider> {
        let factory = self.factories.get(req).ok_or_else(|| Error::VersionNotFound {
            plugin: req.name.clone(),
            version: req.version.clone(),
        })?;
        factory(config).map_err(|e| Error::Instantiate {
            plugin: req.to_string(),
            message: format!("{e:#}"),
        })
    }
}

/// Mock source for testing installation without providers.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    plugins: BTreeMap<String, Vec<String>>,
    lookups: Arc<AtomicUsize>,
}

impl MockSource {
    /// Create an empty mock source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a plugin version available.
    pub fn with_plugin(mut self, name: &str, version: &str) -> Self {
        self.plugins
            .entry(name.to_string())
            .or_default()
            .push(version.to_string());
        self
    }

    /// Number of version lookups served so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl PluginSource for MockSource {
    fn describe(&self) -> String {
        "mock".to_string()
    }

    fn versions(&self, name: &str) -> Result<Vec<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.plugins
            .get(name)
            .cloned()
            .ok_or_else(|| Error::PluginNotFound(name.to_string()))
    }

    fn instantiate(&self, req: &PluginRequirement, _config: &PluginConfig) -> Result<BoxedProvider> {
        Err(Error::Instantiate {
            plugin: req.to_string(),
            message: "mock source has no providers".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_source_resolve() {
        let source = MockSource::new().with_plugin("aws", "v5.16.2");

        assert!(source.resolve(&PluginRequirement::new("aws", "v5.16.2")).is_ok());
        assert!(matches!(
            source.resolve(&PluginRequirement::new("aws", "v4.0.0")),
            Err(Error::VersionNotFound { .. })
        ));
        assert!(matches!(
            source.resolve(&PluginRequirement::new("gcp", "v1.0.0")),
            Err(Error::PluginNotFound(_))
        ));
        assert_eq!(source.lookups(), 3);
    }

    #[test]
    fn test_builtin_factory_errors_are_wrapped() {
        let source = BuiltinSource::new().register("aws", "v5.16.2", |_config: &PluginConfig| {
            anyhow::bail!("aws:region is not set")
        });
        let req = PluginRequirement::new("aws", "v5.16.2");

        let err = source.instantiate(&req, &PluginConfig::new()).unwrap_err();
        assert!(matches!(err, Error::Instantiate { .. }));
        assert!(err.to_string().contains("aws:region"));
        assert_eq!(source.versions("aws").unwrap(), vec!["v5.16.2"]);
        assert_eq!(source.available().count(), 1);
    }
}
