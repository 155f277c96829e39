//! Provider registry for dynamic store resolution.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::provider::ObjectStore;
use sluice_common::{Error, Result};

/// Factory function type for creating stores.
pub type ProviderFactory =
    Box<dyn Fn(&StoreConfig) -> Result<Arc<dyn ObjectStore>> + Send + Sync>;

/// Registry for object store factories.
///
/// Allows dynamic registration and resolution of stores by provider name.
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a provider factory.
    ///
    /// # Errors
    /// - Returns error if name is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::InvalidInput(format!(
                "Provider '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a store by provider name.
    ///
    /// # Errors
    /// - Provider not found
    /// - Configuration invalid for the provider
    pub fn resolve(&self, name: &str, config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Provider '{}' is not registered", name)))?;
        factory(config)
    }

    /// Validate `config` and resolve the store it names.
    pub fn open(&self, config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
        config.validate()?;
        self.resolve(&config.provider, config)
    }

    /// Get list of registered provider names.
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider is registered.
    pub fn has_provider(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with the built-in stores.
pub fn create_default_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    registry
        .register(
            "memory",
            Box::new(|_config| Ok(Arc::new(crate::memory::MemoryStore::new()))),
        )
        .expect("Failed to register memory provider");

    registry
        .register(
            "local",
            Box::new(|config| {
                let root = config
                    .root
                    .as_ref()
                    .ok_or_else(|| Error::config("root", "local provider requires a root path"))?;
                Ok(Arc::new(crate::local::LocalStore::new(root)?))
            }),
        )
        .expect("Failed to register local provider");

    registry
        .register(
            "s3",
            Box::new(|config| Ok(Arc::new(crate::s3::S3Store::new(config)?))),
        )
        .expect("Failed to register s3 provider");

    registry
}
