//! Structural comparison of desired and remote field values
//!
//! Nested objects returned by the remote store (e.g. `ipv4addrs` entries)
//! carry a server-assigned `_ref`. That key is ignored; everything else is
//! compared exactly, so a removed key or element counts as a change.

use serde_json::{Map, Value};

use super::record::REF_FIELD;

/// Whether a remote value equals a desired value
///
/// - objects: same keys with matching values, ignoring `_ref`
/// - arrays: one-to-one matching of elements, in any order
/// - everything else: plain equality
pub fn values_match(desired: &Value, actual: &Value) -> bool {
    match (desired, actual) {
        (Value::Object(want), Value::Object(have)) => objects_match(want, have),
        (Value::Array(want), Value::Array(have)) => {
            if want.len() != have.len() {
                return false;
            }
            let mut used = vec![false; have.len()];
            want.iter().all(|w| {
                let slot = (0..have.len()).find(|&i| !used[i] && values_match(w, &have[i]));
                match slot {
                    Some(i) => {
                        used[i] = true;
                        true
                    }
                    None => false,
                }
            })
        }
        _ => desired == actual,
    }
}

fn objects_match(want: &Map<String, Value>, have: &Map<String, Value>) -> bool {
    let keys = |map: &Map<String, Value>| map.keys().filter(|k| k.as_str() != REF_FIELD).count();

    keys(want) == keys(have)
        && want
            .iter()
            .filter(|(key, _)| key.as_str() != REF_FIELD)
            .all(|(key, w)| have.get(key).is_some_and(|h| values_match(w, h)))
}

/// Whether any desired list element matches any remote list element
///
/// Non-list values fall back to [`values_match`].
pub fn any_element_matches(desired: &Value, actual: &Value) -> bool {
    match (desired, actual) {
        (Value::Array(want), Value::Array(have)) => want
            .iter()
            .any(|w| have.iter().any(|h| values_match(w, h))),
        _ => values_match(desired, actual),
    }
}
