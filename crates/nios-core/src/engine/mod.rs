//! WAPI reconciliation engine
//!
//! The WapiEngine is responsible for:
//! - Building the desired state from a request
//! - Looking up existing objects via the ObjectStore
//! - Asking the Reconciler for a decision
//! - Issuing at most one mutation
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │ ObjectRequest │
//! └───────────────┘
//!         │
//!         ▼
//! ┌──────────────┐    lookup     ┌─────────────┐
//! │  WapiEngine  │──────────────▶│ ObjectStore │
//! └──────────────┘◀──────────────└─────────────┘
//!         │          records            ▲
//!         ▼                             │
//! ┌──────────────┐    decision          │ create/update/delete
//! │  Reconciler  │──────────────────────┘
//! └──────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! 1. Validate parameters into a DesiredState (fails before any lookup)
//! 2. Lookup by name (a second lookup by the new name for an unfinished rename)
//! 3. Decide
//! 4. Unless in check mode, perform the single mutation
//! 5. Emit events for monitoring/logging

use crate::config::{EngineConfig, ObjectRequest};
use crate::error::{Error, Result};
use crate::model::{DesiredState, NAME_FIELD, RemoteRecord};
use crate::reconcile::{Decision, DecisionKind, Reconciler};
use crate::traits::ObjectStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events emitted by the WapiEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Lookup returned
    LookupCompleted {
        object_type: String,
        name: String,
        records: usize,
    },

    /// Decision made
    Planned {
        object_type: String,
        name: String,
        decision: DecisionKind,
    },

    /// Mutation performed
    Applied {
        object_type: String,
        name: String,
        decision: DecisionKind,
        reference: String,
    },

    /// Nothing to do, or nothing done because of check mode
    Unchanged {
        object_type: String,
        name: String,
    },

    /// Pass failed
    Failed {
        object_type: String,
        name: String,
        error: String,
    },
}

/// Before/after view of a change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diff {
    pub before: Value,
    pub after: Value,
}

/// Result of one reconciliation pass, as reported to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Whether the remote store was (or, in check mode, would be) changed
    pub changed: bool,

    /// Operation decided on
    pub decision: DecisionKind,

    /// Reference of the object operated on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Before/after payload for auditing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,

    /// Whether the pass ran in check mode
    pub check_mode: bool,

    /// When the decision was made
    pub checked_at: DateTime<Utc>,
}

/// Core reconciliation engine
///
/// One call to [`WapiEngine::run`] is one reconciliation pass: one lookup
/// (two for an unfinished rename), one decision, at most one mutation.
/// No retries are performed; any error is fatal to the pass and returned.
pub struct WapiEngine {
    /// Remote object store
    store: Box<dyn ObjectStore>,

    /// Decide but do not mutate
    check_mode: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl WapiEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        store: Box<dyn ObjectStore>,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            store,
            check_mode: config.check_mode,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Whether the engine runs in check mode
    pub fn check_mode(&self) -> bool {
        self.check_mode
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(Outcome)`: what was (or would be) done
    /// - `Err(Error)`: validation, ambiguity, or transport failure
    pub async fn run(&self, request: &ObjectRequest) -> Result<Outcome> {
        let result = self.run_internal(request).await;

        if let Err(e) = &result {
            error!("Reconciling {} failed: {}", request.object_type, e);
            self.emit_event(EngineEvent::Failed {
                object_type: request.object_type.clone(),
                name: display_name(request),
                error: e.to_string(),
            });
        }

        result
    }

    /// Run one pass per request, in order, stopping at the first failure
    pub async fn run_all(&self, requests: &[ObjectRequest]) -> Result<Vec<Outcome>> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.run(request).await?);
        }
        Ok(outcomes)
    }

    async fn run_internal(&self, request: &ObjectRequest) -> Result<Outcome> {
        request.validate()?;
        let desired = DesiredState::from_params(&request.fields, &request.params)?;
        let object_type = request.object_type.as_str();
        let name = desired.name().target_name().to_string();

        let existing = self.lookup(request, &desired).await?;
        self.emit_event(EngineEvent::LookupCompleted {
            object_type: object_type.to_string(),
            name: name.clone(),
            records: existing.len(),
        });

        let decision =
            Reconciler::new(object_type, &request.fields).reconcile(&desired, &existing, request.state)?;
        let kind = decision.kind();
        self.emit_event(EngineEvent::Planned {
            object_type: object_type.to_string(),
            name: name.clone(),
            decision: kind,
        });

        let diff = diff_of(&decision);
        let checked_at = Utc::now();

        if !decision.changed() || self.check_mode {
            if decision.changed() {
                info!(
                    "[CHECK MODE] Would {} {} '{}'",
                    kind, object_type, name
                );
            } else {
                debug!("{} '{}' already in desired state", object_type, name);
            }
            self.emit_event(EngineEvent::Unchanged {
                object_type: object_type.to_string(),
                name,
            });
            return Ok(Outcome {
                changed: decision.changed(),
                decision: kind,
                reference: decision.reference().map(str::to_string),
                diff,
                check_mode: self.check_mode,
                checked_at,
            });
        }

        let reference = self.apply(object_type, &decision).await?;
        info!("Applied {} to {} '{}' ({})", kind, object_type, name, reference);
        self.emit_event(EngineEvent::Applied {
            object_type: object_type.to_string(),
            name,
            decision: kind,
            reference: reference.clone(),
        });

        Ok(Outcome {
            changed: true,
            decision: kind,
            reference: Some(reference),
            diff,
            check_mode: false,
            checked_at,
        })
    }

    /// Look up candidates by name
    ///
    /// A rename that finds nothing under the old name looks again under the
    /// new one, so a finished rename reconciles to a no-op.
    async fn lookup(&self, request: &ObjectRequest, desired: &DesiredState) -> Result<Vec<RemoteRecord>> {
        let return_fields = request.fields.field_names();
        let name = desired.name();

        let records = self
            .lookup_by_name(&request.object_type, name.lookup_name(), &return_fields)
            .await?;

        match name.fallback_name() {
            Some(fallback) if records.is_empty() => {
                debug!(
                    "No {} named '{}', looking up '{}'",
                    request.object_type,
                    name.lookup_name(),
                    fallback
                );
                self.lookup_by_name(&request.object_type, fallback, &return_fields)
                    .await
            }
            _ => Ok(records),
        }
    }

    async fn lookup_by_name(
        &self,
        object_type: &str,
        name: &str,
        return_fields: &[String],
    ) -> Result<Vec<RemoteRecord>> {
        let mut filter = Map::new();
        filter.insert(NAME_FIELD.to_string(), Value::String(name.to_string()));

        let records = self
            .store
            .get_objects(object_type, &filter, return_fields)
            .await
            .map_err(|e| self.transport_error(e))?;

        debug!("Lookup of {} '{}' returned {} record(s)", object_type, name, records.len());
        Ok(records)
    }

    /// Perform the single mutation a decision calls for
    async fn apply(&self, object_type: &str, decision: &Decision) -> Result<String> {
        let result = match decision {
            Decision::Create { payload } => self.store.create_object(object_type, payload).await,
            Decision::Update { reference, payload, .. } => {
                self.store.update_object(reference, payload).await
            }
            Decision::Delete { reference, .. } => self.store.delete_object(reference).await,
            Decision::Noop => {
                return Err(Error::Other("Nothing to apply for a no-op decision".to_string()));
            }
        };

        result.map_err(|e| self.transport_error(e))
    }

    /// Tag bare collaborator failures with the store name
    fn transport_error(&self, err: Error) -> Error {
        match err {
            Error::Other(message) => Error::transport(self.store.provider_name(), message),
            other => other,
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

fn diff_of(decision: &Decision) -> Option<Diff> {
    match decision {
        Decision::Noop => None,
        Decision::Create { payload } => Some(Diff {
            before: Value::Null,
            after: Value::Object(payload.clone()),
        }),
        Decision::Update { payload, before, .. } => Some(Diff {
            before: Value::Object(before.clone()),
            after: Value::Object(payload.clone()),
        }),
        Decision::Delete { before, .. } => Some(Diff {
            before: Value::Object(before.clone()),
            after: Value::Null,
        }),
    }
}

/// Best-effort name for events about requests that failed validation
fn display_name(request: &ObjectRequest) -> String {
    match request.params.get(NAME_FIELD) {
        Some(Value::String(name)) => name.clone(),
        Some(Value::Object(rename)) => rename
            .get("new_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::Presence;
    use crate::store::MemoryObjectStore;
    use serde_json::json;

    fn request(state: Presence, params: Value) -> ObjectRequest {
        ObjectRequest::host_record(state, params.as_object().cloned().unwrap())
    }

    #[tokio::test]
    async fn test_events_for_create() {
        let (engine, mut events) =
            WapiEngine::new(Box::new(MemoryObjectStore::new()), EngineConfig::default()).unwrap();

        let outcome = engine
            .run(&request(Presence::Present, json!({ "name": "host.example.com" })))
            .await
            .unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.decision, DecisionKind::Create);

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event);
        }
        assert!(matches!(kinds[0], EngineEvent::LookupCompleted { records: 0, .. }));
        assert!(matches!(
            kinds[1],
            EngineEvent::Planned { decision: DecisionKind::Create, .. }
        ));
        assert!(matches!(kinds[2], EngineEvent::Applied { .. }));
    }

    #[tokio::test]
    async fn test_validation_failure_emits_failed_event() {
        let (engine, mut events) =
            WapiEngine::new(Box::new(MemoryObjectStore::new()), EngineConfig::default()).unwrap();

        let result = engine
            .run(&request(Presence::Present, json!({ "comment": "no name" })))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(matches!(events.try_recv(), Ok(EngineEvent::Failed { .. })));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = EngineConfig {
            check_mode: false,
            event_channel_capacity: 0,
        };
        assert!(WapiEngine::new(Box::new(MemoryObjectStore::new()), config).is_err());
    }

    #[test]
    fn test_display_name() {
        let renamed = request(
            Presence::Present,
            json!({ "name": { "old_name": "a", "new_name": "b" } }),
        );
        assert_eq!(display_name(&renamed), "b");
        assert_eq!(display_name(&request(Presence::Present, json!({}))), "");
    }
}
