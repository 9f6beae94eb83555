// # Memory Object Store
//
// In-memory implementation of ObjectStore.
//
// ## Purpose
//
// Provides a simple, fast object store that doesn't persist across restarts.
// Useful for testing, for embedding the engine without an appliance, and for
// dry runs against a snapshot seeded from elsewhere.
//
// ## Behavior
//
// - References look like `{object_type}/{id}:{name}` and stay stable across updates
// - Lookups filter by equality on every filter key
// - Every mutation call is recorded, in order, for later inspection

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::ProviderConfig;
use crate::model::{NAME_FIELD, RemoteRecord};
use crate::traits::{Lookup, Mutate, ObjectStore, ObjectStoreFactory};

/// A mutation the store has received
#[derive(Debug, Clone, PartialEq)]
pub enum MutationCall {
    Create {
        object_type: String,
        payload: Map<String, Value>,
    },
    Update {
        reference: String,
        payload: Map<String, Value>,
    },
    Delete {
        reference: String,
    },
}

#[derive(Debug, Clone)]
struct StoredObject {
    object_type: String,
    record: RemoteRecord,
}

#[derive(Debug, Default)]
struct Inner {
    objects: Vec<StoredObject>,
    next_id: u64,
    calls: Vec<MutationCall>,
}

/// In-memory object store implementation
///
/// Objects are kept in insertion order behind a RwLock. Clones share state.
///
/// # Example
///
/// ```rust,no_run
/// use nios_core::store::MemoryObjectStore;
/// use nios_core::traits::Lookup;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryObjectStore::new();
///
///     let fields = serde_json::json!({ "name": "host.example.com" });
///     store.insert("record:host", fields.as_object().cloned().unwrap()).await;
///
///     let mut filter = serde_json::Map::new();
///     filter.insert("name".into(), "host.example.com".into());
///     let found = store.get_objects("record:host", &filter, &[]).await?;
///     assert_eq!(found.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryObjectStore {
    /// Create a new empty memory object store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object under an explicit reference
    ///
    /// Replaces any object already stored under the same reference.
    /// Seeding is not recorded as a mutation.
    pub async fn seed(&self, object_type: impl Into<String>, record: RemoteRecord) {
        let mut guard = self.inner.write().await;
        guard
            .objects
            .retain(|stored| stored.record.reference != record.reference);
        guard.objects.push(StoredObject {
            object_type: object_type.into(),
            record,
        });
    }

    /// Insert an object under a generated reference, returning the reference
    ///
    /// Not recorded as a mutation.
    pub async fn insert(&self, object_type: &str, fields: Map<String, Value>) -> String {
        let mut guard = self.inner.write().await;
        Self::insert_locked(&mut guard, object_type, fields)
    }

    /// Fetch an object by reference
    pub async fn get(&self, reference: &str) -> Option<RemoteRecord> {
        let guard = self.inner.read().await;
        guard
            .objects
            .iter()
            .find(|stored| stored.record.reference == reference)
            .map(|stored| stored.record.clone())
    }

    /// All objects of a type, in insertion order
    pub async fn objects(&self, object_type: &str) -> Vec<RemoteRecord> {
        let guard = self.inner.read().await;
        guard
            .objects
            .iter()
            .filter(|stored| stored.object_type == object_type)
            .map(|stored| stored.record.clone())
            .collect()
    }

    /// Mutation calls received so far
    pub async fn calls(&self) -> Vec<MutationCall> {
        self.inner.read().await.calls.clone()
    }

    /// Number of objects in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.objects.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.objects.is_empty()
    }

    fn insert_locked(inner: &mut Inner, object_type: &str, fields: Map<String, Value>) -> String {
        inner.next_id += 1;
        let name = fields
            .get(NAME_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default();
        let reference = format!("{}/{:016x}:{}", object_type, inner.next_id, name);

        inner.objects.push(StoredObject {
            object_type: object_type.to_string(),
            record: RemoteRecord::new(reference.clone(), fields),
        });
        reference
    }
}

#[async_trait]
impl Lookup for MemoryObjectStore {
    async fn get_objects(
        &self,
        object_type: &str,
        filter: &Map<String, Value>,
        return_fields: &[String],
    ) -> Result<Vec<RemoteRecord>, Error> {
        let guard = self.inner.read().await;

        let found = guard
            .objects
            .iter()
            .filter(|stored| stored.object_type == object_type)
            .filter(|stored| {
                filter
                    .iter()
                    .all(|(key, value)| stored.record.get(key) == Some(value))
            })
            .map(|stored| {
                if return_fields.is_empty() {
                    return stored.record.clone();
                }
                let fields = stored
                    .record
                    .fields
                    .iter()
                    .filter(|(key, _)| return_fields.contains(key))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                RemoteRecord::new(stored.record.reference.clone(), fields)
            })
            .collect();

        Ok(found)
    }
}

#[async_trait]
impl Mutate for MemoryObjectStore {
    async fn create_object(
        &self,
        object_type: &str,
        payload: &Map<String, Value>,
    ) -> Result<String, Error> {
        let mut guard = self.inner.write().await;
        guard.calls.push(MutationCall::Create {
            object_type: object_type.to_string(),
            payload: payload.clone(),
        });
        Ok(Self::insert_locked(&mut guard, object_type, payload.clone()))
    }

    async fn update_object(
        &self,
        reference: &str,
        payload: &Map<String, Value>,
    ) -> Result<String, Error> {
        let mut guard = self.inner.write().await;
        guard.calls.push(MutationCall::Update {
            reference: reference.to_string(),
            payload: payload.clone(),
        });

        let stored = guard
            .objects
            .iter_mut()
            .find(|stored| stored.record.reference == reference)
            .ok_or_else(|| Error::not_found(reference))?;

        for (key, value) in payload {
            stored.record.fields.insert(key.clone(), value.clone());
        }
        Ok(reference.to_string())
    }

    async fn delete_object(&self, reference: &str) -> Result<String, Error> {
        let mut guard = self.inner.write().await;
        guard.calls.push(MutationCall::Delete {
            reference: reference.to_string(),
        });

        let before = guard.objects.len();
        guard
            .objects
            .retain(|stored| stored.record.reference != reference);
        if guard.objects.len() == before {
            return Err(Error::not_found(reference));
        }
        Ok(reference.to_string())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for creating memory object stores
pub struct MemoryStoreFactory;

impl ObjectStoreFactory for MemoryStoreFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ObjectStore>, Error> {
        match config {
            ProviderConfig::Memory => Ok(Box::new(MemoryObjectStore::new())),
            _ => Err(Error::config("Invalid config for memory store")),
        }
    }
}
