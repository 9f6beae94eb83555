//! Remote objects as returned by a lookup

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::field_spec::NAME_FIELD;
use crate::error::{Error, Result};

/// Wire key of the opaque object reference
pub const REF_FIELD: &str = "_ref";

/// An object that exists in the remote store
///
/// Immutable once fetched within one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Opaque identifier assigned by the remote store
    #[serde(rename = "_ref")]
    pub reference: String,

    /// All other returned fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RemoteRecord {
    /// Create a record from a reference and its fields
    ///
    /// A `_ref` key inside `fields` is discarded.
    pub fn new(reference: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.remove(REF_FIELD);
        Self {
            reference: reference.into(),
            fields,
        }
    }

    /// Parse a record from a WAPI JSON object
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::invalid_input("remote object is not a JSON object"));
        };

        let reference = match fields.remove(REF_FIELD) {
            Some(Value::String(r)) if !r.is_empty() => r,
            _ => return Err(Error::invalid_input("remote object has no '_ref'")),
        };

        Ok(Self { reference, fields })
    }

    /// Value of a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The identity field, if it is a string
    pub fn name(&self) -> Option<&str> {
        self.get(NAME_FIELD).and_then(Value::as_str)
    }
}
