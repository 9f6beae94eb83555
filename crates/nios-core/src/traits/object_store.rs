// # Object Store Traits
//
// Capability interfaces for the remote object store the reconciler works
// against.
//
// ## Implementations
//
// - WAPI over HTTP: `nios-provider-wapi` crate
// - In-memory: [`crate::store::MemoryObjectStore`]
//
// ## Usage
//
// ```rust,ignore
// use nios_core::traits::ObjectStore;
//
// let store: Box<dyn ObjectStore> = /* ObjectStore implementation */;
//
// let mut filter = serde_json::Map::new();
// filter.insert("name".into(), "host.example.com".into());
// let records = store.get_objects("record:host", &filter, &[]).await?;
// ```

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::model::RemoteRecord;

/// Read capability: find existing objects
///
/// # Trust Level: Untrusted
///
/// Stores are single-shot transports:
/// - ✅ One request per call
/// - ✅ Return success or failure
/// - ❌ No retry or backoff (a failed pass is fatal to the caller)
/// - ❌ No caching across calls
/// - ❌ No decision about whether a mutation is needed (owned by `Reconciler`)
#[async_trait]
pub trait Lookup: Send + Sync {
    /// Return every object of `object_type` matching `filter`
    ///
    /// Ordering of the returned records is not guaranteed.
    ///
    /// # Parameters
    ///
    /// - `object_type`: WAPI object type (e.g. "record:host")
    /// - `filter`: field equality filter (the identity key)
    /// - `return_fields`: fields to include besides `_ref`; empty means the
    ///   store's default set
    async fn get_objects(
        &self,
        object_type: &str,
        filter: &Map<String, Value>,
        return_fields: &[String],
    ) -> Result<Vec<RemoteRecord>, crate::Error>;
}

/// Write capability: perform exactly one remote state change per call
#[async_trait]
pub trait Mutate: Send + Sync {
    /// Create an object, returning the reference the store assigned
    async fn create_object(
        &self,
        object_type: &str,
        payload: &Map<String, Value>,
    ) -> Result<String, crate::Error>;

    /// Update the object behind `reference`, returning its (possibly new) reference
    async fn update_object(
        &self,
        reference: &str,
        payload: &Map<String, Value>,
    ) -> Result<String, crate::Error>;

    /// Delete the object behind `reference`, returning the deleted reference
    async fn delete_object(&self, reference: &str) -> Result<String, crate::Error>;
}

/// A remote store offering both capabilities
pub trait ObjectStore: Lookup + Mutate {
    /// Store name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing object stores from configuration
pub trait ObjectStoreFactory: Send + Sync {
    /// Create an ObjectStore instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn ObjectStore>, crate::Error>;
}
