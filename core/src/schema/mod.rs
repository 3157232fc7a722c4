//! Field declarations and type descriptors.

pub mod field;
pub mod types;

pub use field::{FieldMeta, StateVar, ValueMap};
pub use types::{ScalarKind, TypeDescriptor};
