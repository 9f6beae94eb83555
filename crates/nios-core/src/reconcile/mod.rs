//! Reconciliation of declared state against remote objects
//!
//! The [`Reconciler`] is pure and synchronous: it takes a desired state and
//! the records a lookup returned, and decides which single operation (if any)
//! brings the remote store in line.
//!
//! ## Decision Table
//!
//! | candidates | presence | decision |
//! |---|---|---|
//! | 0 | present | create |
//! | 0 | absent | none |
//! | 1 | absent | delete |
//! | 1 | present | update, or none when nothing differs |
//! | >1 after disambiguation | present, all already in desired state | none |
//! | >1 after disambiguation | otherwise | `AmbiguousMatch` error |

mod diff;
mod select;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{DesiredState, FieldSpec, RemoteRecord};

/// Whether the object should exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Object should exist with the declared fields
    #[default]
    Present,
    /// Object should not exist
    Absent,
}

/// Operation kind, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Noop,
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DecisionKind::Noop => "noop",
            DecisionKind::Create => "create",
            DecisionKind::Update => "update",
            DecisionKind::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// The single operation a reconciliation pass decided on
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Remote state already matches
    Noop,
    /// Create a new object; the store assigns its reference
    Create {
        payload: Map<String, Value>,
    },
    /// Update the selected object with a minimal payload
    Update {
        reference: String,
        payload: Map<String, Value>,
        /// Current values of the payload keys
        before: Map<String, Value>,
    },
    /// Delete the selected object
    Delete {
        reference: String,
        /// All fields the object had
        before: Map<String, Value>,
    },
}

impl Decision {
    /// True iff the decision mutates the remote store
    pub fn changed(&self) -> bool {
        !matches!(self, Decision::Noop)
    }

    /// Kind of operation
    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::Noop => DecisionKind::Noop,
            Decision::Create { .. } => DecisionKind::Create,
            Decision::Update { .. } => DecisionKind::Update,
            Decision::Delete { .. } => DecisionKind::Delete,
        }
    }

    /// Target reference for update and delete
    pub fn reference(&self) -> Option<&str> {
        match self {
            Decision::Update { reference, .. } | Decision::Delete { reference, .. } => {
                Some(reference)
            }
            Decision::Noop | Decision::Create { .. } => None,
        }
    }

    /// Payload for create and update
    pub fn payload(&self) -> Option<&Map<String, Value>> {
        match self {
            Decision::Create { payload } | Decision::Update { payload, .. } => Some(payload),
            Decision::Noop | Decision::Delete { .. } => None,
        }
    }
}

/// Decides what to do with one object type
///
/// # Example
///
/// ```rust
/// use nios_core::model::{DesiredState, FieldSpec};
/// use nios_core::reconcile::{Decision, Presence, Reconciler};
/// use serde_json::json;
///
/// let spec = FieldSpec::host_record();
/// let params = json!({ "name": "host.example.com" });
/// let desired = DesiredState::from_params(&spec, params.as_object().unwrap()).unwrap();
///
/// let decision = Reconciler::new("record:host", &spec)
///     .reconcile(&desired, &[], Presence::Present)
///     .unwrap();
/// assert!(matches!(decision, Decision::Create { .. }));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    object_type: &'a str,
    spec: &'a FieldSpec,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler for one object type and field spec
    pub fn new(object_type: &'a str, spec: &'a FieldSpec) -> Self {
        Self { object_type, spec }
    }

    /// Decide the operation for `desired` given the records a lookup returned
    ///
    /// # Errors
    ///
    /// [`Error::AmbiguousMatch`] when more than one record survives
    /// disambiguation and a mutation would be needed.
    pub fn reconcile(
        &self,
        desired: &DesiredState,
        existing: &[RemoteRecord],
        presence: Presence,
    ) -> Result<Decision> {
        let candidates = select::select_candidates(self.object_type, self.spec, desired, existing);
        let candidate = match candidates.as_slice() {
            [] => None,
            [only] => Some(*only),
            many => {
                let settled = presence == Presence::Present
                    && many
                        .iter()
                        .all(|record| diff::update_payload(self.spec, desired, record).is_none());
                if !settled {
                    return Err(Error::ambiguous(
                        self.object_type,
                        desired.name().lookup_name(),
                        many.len(),
                    ));
                }
                debug!(
                    "{} record(s) named '{}' all match the desired state",
                    many.len(),
                    desired.name().target_name()
                );
                return Ok(Decision::Noop);
            }
        };

        let decision = match (candidate, presence) {
            (None, Presence::Present) => Decision::Create {
                payload: diff::create_payload(self.spec, desired),
            },
            (None, Presence::Absent) => Decision::Noop,
            (Some(record), Presence::Absent) => Decision::Delete {
                reference: record.reference.clone(),
                before: record.fields.clone(),
            },
            (Some(record), Presence::Present) => {
                match diff::update_payload(self.spec, desired, record) {
                    Some(payload) => Decision::Update {
                        reference: record.reference.clone(),
                        before: diff::before_values(record, &payload),
                        payload,
                    },
                    None => Decision::Noop,
                }
            }
        };

        debug!(
            "Reconciled {} '{}' against {} record(s): {}",
            self.object_type,
            desired.name().target_name(),
            existing.len(),
            decision.kind()
        );

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldAttrs, NAME_FIELD};
    use serde_json::json;

    fn spec() -> FieldSpec {
        FieldSpec::new()
            .with_field(NAME_FIELD, FieldAttrs::required())
            .with_field("comment", FieldAttrs::optional())
            .with_field("extattrs", FieldAttrs::optional())
    }

    fn desired(params: Value) -> DesiredState {
        DesiredState::from_params(&spec(), params.as_object().unwrap()).unwrap()
    }

    fn record(reference: &str, fields: Value) -> RemoteRecord {
        RemoteRecord::new(reference, fields.as_object().cloned().unwrap())
    }

    #[test]
    fn test_absent_without_match_is_noop() {
        let spec = spec();
        let decision = Reconciler::new("record:host", &spec)
            .reconcile(&desired(json!({ "name": "ansible" })), &[], Presence::Absent)
            .unwrap();
        assert_eq!(decision, Decision::Noop);
        assert!(!decision.changed());
        assert_eq!(decision.reference(), None);
    }

    #[test]
    fn test_create_carries_no_reference() {
        let spec = spec();
        let decision = Reconciler::new("record:host", &spec)
            .reconcile(
                &desired(json!({ "name": "ansible", "comment": "c" })),
                &[record("r1", json!({ "name": "other" }))],
                Presence::Present,
            )
            .unwrap();

        assert_eq!(decision.kind(), DecisionKind::Create);
        assert_eq!(decision.reference(), None);
        assert_eq!(
            decision.payload().cloned().map(Value::Object),
            Some(json!({ "name": "ansible", "comment": "c" }))
        );
    }

    #[test]
    fn test_update_records_before_values() {
        let spec = spec();
        let decision = Reconciler::new("record:host", &spec)
            .reconcile(
                &desired(json!({ "name": "ansible", "comment": "new" })),
                &[record("r1", json!({ "name": "ansible", "comment": "old", "extattrs": {} }))],
                Presence::Present,
            )
            .unwrap();

        let Decision::Update { reference, payload, before } = decision else {
            panic!("expected update, got {:?}", decision);
        };
        assert_eq!(reference, "r1");
        assert_eq!(Value::Object(payload), json!({ "name": "ansible", "comment": "new" }));
        assert_eq!(Value::Object(before), json!({ "name": "ansible", "comment": "old" }));
    }

    #[test]
    fn test_several_survivors_needing_change_are_ambiguous() {
        let spec = spec();
        let existing = [
            record("r1", json!({ "name": "ansible", "comment": "one" })),
            record("r2", json!({ "name": "ansible", "comment": "two" })),
        ];

        for presence in [Presence::Present, Presence::Absent] {
            let err = Reconciler::new("record:host", &spec)
                .reconcile(&desired(json!({ "name": "ansible", "comment": "one" })), &existing, presence)
                .unwrap_err();
            assert!(matches!(
                err,
                Error::AmbiguousMatch { candidates: 2, ref name, .. } if name == "ansible"
            ));
        }
    }

    #[test]
    fn test_several_survivors_already_settled_is_noop() {
        let spec = spec();
        let existing = [
            record("r1", json!({ "name": "ansible", "comment": "same" })),
            record("r2", json!({ "name": "ansible", "comment": "same", "extattrs": {} })),
        ];

        let decision = Reconciler::new("record:host", &spec)
            .reconcile(
                &desired(json!({ "name": "ansible", "comment": "same" })),
                &existing,
                Presence::Present,
            )
            .unwrap();
        assert_eq!(decision, Decision::Noop);
    }

    #[test]
    fn test_presence_parses_lowercase() {
        let presence: Presence = serde_json::from_value(json!("absent")).unwrap();
        assert_eq!(presence, Presence::Absent);
        assert_eq!(Presence::default(), Presence::Present);
    }
}
