// # Field Specification
//
// Describes which declared parameters participate in matching and payload
// construction for one WAPI object type.
//
// ## Wire Format
//
// A field spec deserializes from the same shape the WAPI modules use:
//
// ```json
// {
//     "name": { "ib_req": true },
//     "comment": {},
//     "configure_for_dns": { "ib_req": true, "default": true },
//     "ipv4addrs": {}
// }
// ```
//
// `matching` may be set explicitly (`"none"`, `"exact"`, `"any_element"`).
// When omitted, `configure_for_dns` matches exactly and `ipv4addrs` /
// `ipv6addrs` match on any shared element; every other field has no role.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Name of the identity field every object type is looked up by
pub const NAME_FIELD: &str = "name";

/// Role a field plays when several remote objects share the same name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matching {
    /// Plain field, only compared when building the update payload
    #[default]
    None,
    /// Candidate must carry exactly the desired value (e.g. `configure_for_dns`)
    Exact,
    /// Candidate list must share at least one element with the desired list (e.g. `ipv4addrs`)
    AnyElement,
}

impl Matching {
    /// Whether this field is used to tell apart records sharing a name
    pub fn disambiguates(self) -> bool {
        !matches!(self, Matching::None)
    }

    /// Role a field has when its attributes do not set one
    pub fn implied_for(field: &str) -> Self {
        match field {
            "configure_for_dns" => Matching::Exact,
            "ipv4addrs" | "ipv6addrs" => Matching::AnyElement,
            _ => Matching::None,
        }
    }
}

/// Attributes of a single field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldAttrs {
    /// Field must be present (after defaults) before reconciliation starts
    #[serde(default, alias = "ib_req")]
    pub required: bool,

    /// Value the remote store assumes when the field is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Disambiguation role; `None` defers to [`Matching::implied_for`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching: Option<Matching>,
}

impl FieldAttrs {
    /// An optional field with no default and no matching role
    pub fn optional() -> Self {
        Self::default()
    }

    /// A required field
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    /// Set the default value
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Set the disambiguation role
    pub fn with_matching(mut self, matching: Matching) -> Self {
        self.matching = Some(matching);
        self
    }
}

/// Mapping from field name to attributes
///
/// Immutable once handed to the reconciler. Iteration order is the
/// lexical order of field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSpec {
    fields: BTreeMap<String, FieldAttrs>,
}

impl FieldSpec {
    /// Create an empty field spec
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a field
    pub fn with_field(mut self, name: impl Into<String>, attrs: FieldAttrs) -> Self {
        self.fields.insert(name.into(), attrs);
        self
    }

    /// Field spec for `record:host` objects
    pub fn host_record() -> Self {
        Self::new()
            .with_field(NAME_FIELD, FieldAttrs::required())
            .with_field("view", FieldAttrs::required().with_default(json!("default")))
            .with_field(
                "configure_for_dns",
                FieldAttrs::required()
                    .with_default(json!(true))
                    .with_matching(Matching::Exact),
            )
            .with_field(
                "ipv4addrs",
                FieldAttrs::optional().with_matching(Matching::AnyElement),
            )
            .with_field(
                "ipv6addrs",
                FieldAttrs::optional().with_matching(Matching::AnyElement),
            )
            .with_field("aliases", FieldAttrs::optional())
            .with_field("ttl", FieldAttrs::optional())
            .with_field("comment", FieldAttrs::optional())
            .with_field("extattrs", FieldAttrs::optional())
    }

    /// Look up the attributes of a field
    pub fn get(&self, name: &str) -> Option<&FieldAttrs> {
        self.fields.get(name)
    }

    /// Whether the field spec names the given field
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate over all fields
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldAttrs)> {
        self.fields.iter().map(|(name, attrs)| (name.as_str(), attrs))
    }

    /// Names of all fields, used as the lookup's return fields
    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    /// Effective matching role of a field, explicit or implied by its name
    pub fn matching(&self, name: &str) -> Matching {
        self.get(name)
            .and_then(|attrs| attrs.matching)
            .unwrap_or_else(|| Matching::implied_for(name))
    }

    /// Fields with the given effective matching role
    pub fn fields_matching(&self, matching: Matching) -> impl Iterator<Item = (&str, &FieldAttrs)> {
        self.iter()
            .filter(move |(name, _)| self.matching(name) == matching)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the field spec has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate the field spec
    ///
    /// The identity field must be present and must not carry a matching role
    /// of its own.
    pub fn validate(&self) -> Result<()> {
        if !self.contains(NAME_FIELD) {
            return Err(Error::config("Field spec must define the 'name' field"));
        }

        if self.matching(NAME_FIELD).disambiguates() {
            return Err(Error::config(
                "The 'name' field is the identity field and cannot have a matching role",
            ));
        }

        Ok(())
    }
}
