// # nios-core
//
// Core library for reconciling declared WAPI objects (host records first
// among them) against an Infoblox-style remote object store.
//
// ## Architecture Overview
//
// - **FieldSpec / DesiredState / RemoteRecord**: typed data model
// - **Reconciler**: pure decision logic (none, create, update, delete)
// - **Lookup / Mutate / ObjectStore**: capability traits for the remote store
// - **WapiEngine**: runs one lookup, one decision, at most one mutation
// - **ProviderRegistry**: plugin-based registry for object store transports
//
// ## Design Principles
//
// 1. **Separation of Concerns**: decisions are separate from transports
// 2. **Single Pass**: one lookup, at most one mutation, no retries
// 3. **Plugin-Based**: transports are registered dynamically
// 4. **Library-First**: everything the binary does is available as a library
// 5. **Idempotency**: applying a decision and reconciling again yields no change

pub mod traits;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod store;

// Re-export core types for convenience
pub use traits::{Lookup, Mutate, ObjectStore, ObjectStoreFactory};
pub use engine::{EngineEvent, Outcome, WapiEngine};
pub use registry::ProviderRegistry;
pub use config::{ApplyConfig, EngineConfig, ObjectRequest, ProviderConfig, NIOS_HOST_RECORD};
pub use error::{Error, Result};
pub use model::{DesiredState, FieldSpec, NameValue, RemoteRecord};
pub use reconcile::{Decision, DecisionKind, Presence, Reconciler};
pub use store::MemoryObjectStore;
