//! Object store implementations bundled with the core

pub mod memory;

pub use memory::{MemoryObjectStore, MemoryStoreFactory, MutationCall};
