//! Providers compiled into the binary

use declarative::BoxedProvider;
use objectstore::ObjectStore;
use plugins::{BuiltinSource, PluginConfig, Resolver};

/// Catalog of every provider plugin this build ships
pub fn builtin_source() -> BuiltinSource {
    BuiltinSource::new().register(
        objectstore::PACKAGE,
        objectstore::VERSION,
        |config: &PluginConfig| Ok(Box::new(ObjectStore::from_config(config)?) as BoxedProvider),
    )
}

/// Resolver over [`builtin_source`]
pub fn builtin_resolver() -> Resolver {
    Resolver::with_source(Box::new(builtin_source()))
}
