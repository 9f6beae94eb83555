//! Plugin-based object store registry
//!
//! The registry allows object store transports to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nios_core::registry::ProviderRegistry;
//! use nios_core::config::ProviderConfig;
//!
//! // Registry with the built-in memory store
//! let registry = ProviderRegistry::with_builtin();
//!
//! // Register transports shipped by other crates
//! nios_provider_wapi::register(&registry);
//!
//! // Create a store from config
//! let config = ProviderConfig::Wapi { ... };
//! let store = registry.create_store(&config)?;
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::store::MemoryStoreFactory;
use crate::traits::{ObjectStore, ObjectStoreFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry for plugin-based object store creation
///
/// The registry maintains a map of provider type names to factory objects,
/// allowing dynamic instantiation of stores based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered object store factories
    stores: RwLock<HashMap<String, Box<dyn ObjectStoreFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in `memory` store registered
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_store("memory", Box::new(MemoryStoreFactory));
        registry
    }

    /// Register an object store factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "wapi", "memory")
    /// - `factory`: Factory object for creating store instances
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use nios_core::registry::ProviderRegistry;
    /// # use nios_core::traits::ObjectStoreFactory;
    /// # struct MyFactory;
    /// # impl ObjectStoreFactory for MyFactory {
    /// #     fn create(&self, config: &nios_core::config::ProviderConfig) -> nios_core::Result<Box<dyn nios_core::ObjectStore>> { unimplemented!() }
    /// # }
    /// let registry = ProviderRegistry::new();
    /// registry.register_store("mystore", Box::new(MyFactory));
    /// ```
    pub fn register_store(&self, name: impl Into<String>, factory: Box<dyn ObjectStoreFactory>) {
        let name = name.into();
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        stores.insert(name, factory);
    }

    /// Create an object store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ObjectStore>)`: Created store instance
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub fn create_store(&self, config: &ProviderConfig) -> Result<Box<dyn ObjectStore>> {
        let provider_type = config.type_name();
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);

        let factory = stores
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// List all registered provider types
    pub fn list_stores(&self) -> Vec<String> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.keys().cloned().collect()
    }

    /// Check if a provider type is registered
    pub fn has_store(&self, name: &str) -> bool {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.contains_key(name)
    }
}
