//! Data model for reconciliation
//!
//! - [`FieldSpec`]: which fields participate and how
//! - [`DesiredState`]: what the caller declared
//! - [`RemoteRecord`]: what the remote store returned

pub mod field_spec;
pub mod desired;
pub mod record;
pub mod value;

pub use field_spec::{FieldAttrs, FieldSpec, Matching, NAME_FIELD};
pub use desired::{DesiredState, NameValue};
pub use record::{RemoteRecord, REF_FIELD};
pub use value::{any_element_matches, values_match};
