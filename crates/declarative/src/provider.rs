//! Provider trait for resource lifecycle calls
//!
//! A provider owns every resource type of one package (`aws:*`). The engine
//! decides *what* to do; providers only know *how* to create, update and
//! delete a single physical resource.

use crate::error::{Error, Result};
use crate::program::package_of;
use crate::types::DiffKind;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Arguments of a create call
#[derive(Debug, Clone, Copy)]
pub struct CreateRequest<'a> {
    pub urn: &'a str,
    pub type_token: &'a str,
    pub name: &'a str,
    pub inputs: &'a Value,
}

/// Identity and outputs of a freshly created resource
#[derive(Debug, Clone, PartialEq)]
pub struct CreateResponse {
    pub id: String,
    pub outputs: Value,
}

/// Arguments of an in-place update
#[derive(Debug, Clone, Copy)]
pub struct UpdateRequest<'a> {
    pub urn: &'a str,
    pub type_token: &'a str,
    pub id: &'a str,
    pub olds: &'a Value,
    pub news: &'a Value,
    pub old_outputs: &'a Value,
}

/// Arguments of a delete call
#[derive(Debug, Clone, Copy)]
pub struct DeleteRequest<'a> {
    pub urn: &'a str,
    pub type_token: &'a str,
    pub id: &'a str,
    pub outputs: &'a Value,
}

/// Core trait for resource providers
///
/// Every provider implements create/update/delete for the types of its
/// package. `diff` decides between an in-place update and a replacement;
/// the default compares the properties named by `replace_keys`.
pub trait Provider: Send + Sync + fmt::Debug {
    /// Package this provider serves (first segment of type tokens)
    fn package(&self) -> &str;

    /// Plugin version the provider implements
    fn version(&self) -> &str;

    /// Input properties whose change forces a replacement
    fn replace_keys(&self, _type_token: &str) -> &'static [&'static str] {
        &[]
    }

    /// Classify recorded inputs against desired ones
    fn diff(&self, type_token: &str, olds: &Value, news: &Value) -> DiffKind {
        if olds == news {
            return DiffKind::Same;
        }
        let replace = self
            .replace_keys(type_token)
            .iter()
            .any(|key| olds.get(key) != news.get(key));
        if replace {
            DiffKind::Replace
        } else {
            DiffKind::Update
        }
    }

    /// Create a physical resource
    fn create(&self, req: &CreateRequest<'_>) -> anyhow::Result<CreateResponse>;

    /// Update a resource in place, returning its new outputs
    fn update(&self, req: &UpdateRequest<'_>) -> anyhow::Result<Value>;

    /// Delete a physical resource
    fn delete(&self, req: &DeleteRequest<'_>) -> anyhow::Result<()>;
}

/// A boxed provider for type-erased storage
pub type BoxedProvider = Box<dyn Provider>;

/// Providers loaded for one operation, keyed by package
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, BoxedProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous one for the package
    pub fn register(&mut self, provider: BoxedProvider) {
        log::debug!(
            "loaded provider {}@{}",
            provider.package(),
            provider.version()
        );
        self.providers
            .insert(provider.package().to_string(), provider);
    }

    pub fn get(&self, package: &str) -> Option<&dyn Provider> {
        self.providers.get(package).map(|p| p.as_ref())
    }

    /// Provider responsible for a type token
    pub fn for_type(&self, type_token: &str) -> Result<&dyn Provider> {
        let package = package_of(type_token);
        self.get(package)
            .ok_or_else(|| Error::MissingProvider(package.to_string()))
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
