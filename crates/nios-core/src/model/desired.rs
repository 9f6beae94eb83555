//! Desired state derived from caller-supplied parameters

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

use super::field_spec::{FieldSpec, NAME_FIELD};
use crate::error::{Error, Result};

/// Value of the identity field
///
/// Either a plain name, or a rename request carrying both the name the object
/// currently has and the name it should end up with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameValue {
    /// Plain name
    Plain(String),
    /// Rename-in-place
    Rename {
        /// Name the object carries today
        old_name: String,
        /// Name the object should carry after reconciliation
        new_name: String,
    },
}

impl NameValue {
    /// Name the first lookup is keyed on
    pub fn lookup_name(&self) -> &str {
        match self {
            NameValue::Plain(name) => name,
            NameValue::Rename { old_name, .. } => old_name,
        }
    }

    /// Name that ends up in payloads
    pub fn target_name(&self) -> &str {
        match self {
            NameValue::Plain(name) => name,
            NameValue::Rename { new_name, .. } => new_name,
        }
    }

    /// Name to fall back to when nothing carries the lookup name
    pub fn fallback_name(&self) -> Option<&str> {
        match self {
            NameValue::Plain(_) => None,
            NameValue::Rename { new_name, .. } => Some(new_name),
        }
    }

    /// Whether a rename is requested
    pub fn is_rename(&self) -> bool {
        matches!(self, NameValue::Rename { .. })
    }

    fn from_param(value: &Value) -> Result<Self> {
        let name: NameValue = serde_json::from_value(value.clone()).map_err(|_| {
            Error::validation(
                "'name' must be a string or an object with 'old_name' and 'new_name'",
            )
        })?;

        let empty = match &name {
            NameValue::Plain(n) => n.is_empty(),
            NameValue::Rename { old_name, new_name } => old_name.is_empty() || new_name.is_empty(),
        };
        if empty {
            return Err(Error::validation("'name' cannot be empty"));
        }

        Ok(name)
    }
}

/// Desired state of one remote object
///
/// Built fresh for every invocation. Holds only fields named by the
/// [`FieldSpec`], never nulls. Fields filled in from defaults are kept
/// apart from fields the caller supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    name: NameValue,
    fields: BTreeMap<String, Value>,
    supplied: BTreeSet<String>,
}

impl DesiredState {
    /// Build the desired state from raw parameters
    ///
    /// Parameters not named by the field spec are ignored, nulls are treated as
    /// absent, and absent fields fall back to the field default.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the field spec itself is invalid
    /// - [`Error::Validation`] if a required field is missing or `name` is malformed
    pub fn from_params(spec: &FieldSpec, params: &Map<String, Value>) -> Result<Self> {
        spec.validate()?;

        let mut name = None;
        let mut fields = BTreeMap::new();
        let mut supplied = BTreeSet::new();

        for (field, attrs) in spec.iter() {
            let given = params.get(field).filter(|v| !v.is_null()).cloned();
            if given.is_some() {
                supplied.insert(field.to_string());
            }
            let value = given.or_else(|| attrs.default.clone());

            let Some(value) = value else {
                if attrs.required {
                    return Err(Error::validation(format!(
                        "missing required field '{}'",
                        field
                    )));
                }
                continue;
            };

            if field == NAME_FIELD {
                name = Some(NameValue::from_param(&value)?);
            } else {
                fields.insert(field.to_string(), value);
            }
        }

        for key in params.keys().filter(|k| !spec.contains(k)) {
            trace!("Ignoring parameter '{}' not named by the field spec", key);
        }

        let name = name.ok_or_else(|| Error::validation("missing required field 'name'"))?;

        Ok(Self {
            name,
            fields,
            supplied,
        })
    }

    /// The identity field
    pub fn name(&self) -> &NameValue {
        &self.name
    }

    /// Value of a non-identity field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether the caller supplied the field (as opposed to a default)
    pub fn is_supplied(&self, field: &str) -> bool {
        self.supplied.contains(field)
    }

    /// Iterate over non-identity fields
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field_spec::FieldAttrs;
    use serde_json::json;

    fn spec() -> FieldSpec {
        FieldSpec::new()
            .with_field(NAME_FIELD, FieldAttrs::required())
            .with_field("comment", FieldAttrs::optional())
            .with_field("extattrs", FieldAttrs::optional())
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_nulls_and_unknown_params_dropped() {
        let desired = DesiredState::from_params(
            &spec(),
            &params(json!({
                "provider": null,
                "state": "present",
                "name": "ansible",
                "comment": null,
                "extattrs": null
            })),
        )
        .unwrap();

        assert_eq!(desired.name(), &NameValue::Plain("ansible".to_string()));
        assert_eq!(desired.fields().count(), 0);
    }

    #[test]
    fn test_missing_required_field() {
        let err = DesiredState::from_params(&spec(), &params(json!({ "comment": "x" })))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("'name'")));
    }

    #[test]
    fn test_required_field_satisfied_by_default() {
        let spec = spec().with_field("view", FieldAttrs::required().with_default(json!("default")));
        let desired =
            DesiredState::from_params(&spec, &params(json!({ "name": "ansible" }))).unwrap();
        assert_eq!(desired.get("view"), Some(&json!("default")));
        assert!(!desired.is_supplied("view"));
        assert!(desired.is_supplied(NAME_FIELD));
    }

    #[test]
    fn test_rename_value() {
        let desired = DesiredState::from_params(
            &spec(),
            &params(json!({
                "name": { "new_name": "default", "old_name": "old_default" }
            })),
        )
        .unwrap();

        let name = desired.name();
        assert!(name.is_rename());
        assert_eq!(name.lookup_name(), "old_default");
        assert_eq!(name.target_name(), "default");
        assert_eq!(name.fallback_name(), Some("default"));
    }

    #[test]
    fn test_malformed_name() {
        for bad in [json!(42), json!({ "new_name": "only" }), json!("")] {
            let err = DesiredState::from_params(&spec(), &params(json!({ "name": bad })))
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
    }
}
