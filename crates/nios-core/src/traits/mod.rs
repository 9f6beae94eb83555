//! Core traits for the nios-host system
//!
//! - [`Lookup`]: find existing remote objects
//! - [`Mutate`]: create, update, delete remote objects
//! - [`ObjectStore`]: both, as one collaborator

pub mod object_store;

pub use object_store::{Lookup, Mutate, ObjectStore, ObjectStoreFactory};
