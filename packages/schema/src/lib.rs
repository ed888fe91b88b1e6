//! # Triogui Schema
//!
//! Type introspection for reflective editing.
//!
//! The editor never hard-codes a field: it asks a [`SchemaOracle`] what a
//! type contains, which types may stand in for it, and how to build a
//! fresh instance. [`SchemaCatalog`] is the in-memory oracle, loaded from
//! a JSON class list.

pub mod catalog;
pub mod error;
pub mod oracle;
pub mod types;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use catalog::{CatalogBuilder, ClassDef, SchemaCatalog};
pub use error::{SchemaError, SchemaResult};
pub use oracle::SchemaOracle;
pub use types::{FieldMeta, TypeRef};
