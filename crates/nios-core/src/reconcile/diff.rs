//! Payload construction for create and update calls

use serde_json::{Map, Value};

use crate::model::{DesiredState, FieldSpec, NAME_FIELD, RemoteRecord, values_match};

/// Payload for a create call
///
/// All desired fields except those equal to their spec default, which the
/// remote store fills in itself.
pub(crate) fn create_payload(spec: &FieldSpec, desired: &DesiredState) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert(
        NAME_FIELD.to_string(),
        Value::String(desired.name().target_name().to_string()),
    );

    for (field, value) in desired.fields() {
        let is_default = spec
            .get(field)
            .and_then(|attrs| attrs.default.as_ref())
            .is_some_and(|default| default == value);
        if !is_default {
            payload.insert(field.to_string(), value.clone());
        }
    }

    payload
}

/// Payload for an update call, or `None` when nothing changed
///
/// Carries every changed field, the identity field, and every disambiguation
/// field the caller supplied. Fields the desired state does not name are
/// never sent, and unchanged defaults are left out.
pub(crate) fn update_payload(
    spec: &FieldSpec,
    desired: &DesiredState,
    record: &RemoteRecord,
) -> Option<Map<String, Value>> {
    let target = desired.name().target_name();
    let mut changed = record.name() != Some(target);

    let mut payload = Map::new();
    payload.insert(NAME_FIELD.to_string(), Value::String(target.to_string()));

    for (field, want) in desired.fields() {
        let attrs = spec.get(field);
        let disambiguates = spec.matching(field).disambiguates();

        let differs = match record.get(field) {
            Some(have) => !values_match(want, have),
            None => attrs
                .and_then(|a| a.default.as_ref())
                .is_none_or(|default| !values_match(want, default)),
        };

        if differs {
            changed = true;
            payload.insert(field.to_string(), want.clone());
        } else if disambiguates && desired.is_supplied(field) {
            payload.insert(field.to_string(), want.clone());
        }
    }

    changed.then_some(payload)
}

/// Snapshot of the record's current values for the keys of a payload
pub(crate) fn before_values(record: &RemoteRecord, payload: &Map<String, Value>) -> Map<String, Value> {
    payload
        .keys()
        .filter_map(|key| record.get(key).map(|v| (key.clone(), v.clone())))
        .collect()
}
