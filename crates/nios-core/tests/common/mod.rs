//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles return canned records and count calls; they implement no
//! store semantics of their own.

#![allow(dead_code)]

use nios_core::error::{Error, Result};
use nios_core::model::{FieldAttrs, FieldSpec, NAME_FIELD, RemoteRecord};
use nios_core::store::MutationCall;
use nios_core::traits::{Lookup, Mutate, ObjectStore};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An object store that returns the same records for every lookup
pub struct MockObjectStore {
    /// Records every lookup returns
    records: Vec<RemoteRecord>,
    /// Call counter for get_objects()
    lookup_count: Arc<AtomicUsize>,
    /// Filters passed to get_objects()
    lookup_filters: Arc<Mutex<Vec<Map<String, Value>>>>,
    /// Recorded mutation calls
    calls: Arc<Mutex<Vec<MutationCall>>>,
    /// When set, lookups fail with this message
    fail_lookup: Option<String>,
    /// When set, mutations fail with this message
    fail_mutate: Option<String>,
}

impl MockObjectStore {
    pub fn new(records: Vec<RemoteRecord>) -> Self {
        Self {
            records,
            lookup_count: Arc::new(AtomicUsize::new(0)),
            lookup_filters: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_lookup: None,
            fail_mutate: None,
        }
    }

    /// Make every lookup fail
    pub fn failing_lookup(mut self, message: &str) -> Self {
        self.fail_lookup = Some(message.to_string());
        self
    }

    /// Make every mutation fail
    pub fn failing_mutate(mut self, message: &str) -> Self {
        self.fail_mutate = Some(message.to_string());
        self
    }

    /// Create a new MockObjectStore that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: other.records.clone(),
            lookup_count: Arc::clone(&other.lookup_count),
            lookup_filters: Arc::clone(&other.lookup_filters),
            calls: Arc::clone(&other.calls),
            fail_lookup: other.fail_lookup.clone(),
            fail_mutate: other.fail_mutate.clone(),
        }
    }

    /// Get the number of times get_objects() was called
    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::SeqCst)
    }

    /// Filters passed to get_objects(), in order
    pub fn lookup_filters(&self) -> Vec<Map<String, Value>> {
        self.lookup_filters.lock().unwrap().clone()
    }

    /// Mutation calls received, in order
    pub fn calls(&self) -> Vec<MutationCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, call: MutationCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match &self.fail_mutate {
            Some(message) => Err(Error::transport("mock", message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl Lookup for MockObjectStore {
    async fn get_objects(
        &self,
        _object_type: &str,
        filter: &Map<String, Value>,
        _return_fields: &[String],
    ) -> Result<Vec<RemoteRecord>> {
        self.lookup_count.fetch_add(1, Ordering::SeqCst);
        self.lookup_filters.lock().unwrap().push(filter.clone());

        if let Some(message) = &self.fail_lookup {
            return Err(Error::transport("mock", message.clone()));
        }
        Ok(self.records.clone())
    }
}

#[async_trait::async_trait]
impl Mutate for MockObjectStore {
    async fn create_object(&self, object_type: &str, payload: &Map<String, Value>) -> Result<String> {
        self.record_call(MutationCall::Create {
            object_type: object_type.to_string(),
            payload: payload.clone(),
        })?;
        Ok(format!("{}/created", object_type))
    }

    async fn update_object(&self, reference: &str, payload: &Map<String, Value>) -> Result<String> {
        self.record_call(MutationCall::Update {
            reference: reference.to_string(),
            payload: payload.clone(),
        })?;
        Ok(reference.to_string())
    }

    async fn delete_object(&self, reference: &str) -> Result<String> {
        self.record_call(MutationCall::Delete {
            reference: reference.to_string(),
        })?;
        Ok(reference.to_string())
    }
}

impl ObjectStore for MockObjectStore {
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Convert a `json!` object into a parameter/field map
pub fn map(value: Value) -> Map<String, Value> {
    value
        .as_object()
        .cloned()
        .expect("test fixture must be a JSON object")
}

/// Build a remote record from a `json!` object carrying `_ref`
pub fn record(value: Value) -> RemoteRecord {
    RemoteRecord::from_value(value).expect("test fixture must carry _ref")
}

/// The `{name, comment, extattrs}` spec most scenarios use
pub fn basic_spec() -> FieldSpec {
    FieldSpec::new()
        .with_field(NAME_FIELD, FieldAttrs::required())
        .with_field("comment", FieldAttrs::optional())
        .with_field("extattrs", FieldAttrs::optional())
}

/// Basic spec plus a required `configure_for_dns` (exact match by name)
pub fn dns_spec() -> FieldSpec {
    basic_spec().with_field("configure_for_dns", FieldAttrs::required())
}

/// Basic spec plus `ipv4addrs` (list match by name)
pub fn ipv4_spec() -> FieldSpec {
    basic_spec().with_field("ipv4addrs", FieldAttrs::optional())
}

/// Update payload of the only mutation call, panicking otherwise
pub fn only_update(calls: &[MutationCall]) -> (&str, Value) {
    match calls {
        [MutationCall::Update { reference, payload }] => {
            (reference.as_str(), Value::Object(payload.clone()))
        }
        other => panic!("expected exactly one update call, got {:?}", other),
    }
}
