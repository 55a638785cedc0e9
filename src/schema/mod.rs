//! Schema module for silo-gt.
//!
//! A schema is declared once at the top of every metadata file and binds the
//! positional value tokens of each record line to named, typed fields.

pub mod field;
#[allow(clippy::module_inception)]
pub mod schema;

// Re-export commonly used types
pub use field::{FieldType, FieldValue};
pub use schema::{FieldDefinition, MetadataRecord, Schema, SchemaBuilder};
