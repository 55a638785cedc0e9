//! Schema management for metadata records.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GroundtruthError, Result};
use crate::schema::field::{FieldType, FieldValue};

/// A named, typed field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    name: String,
    field_type: FieldType,
}

impl FieldDefinition {
    /// Create a new field definition.
    pub fn new<S: Into<String>>(name: S, field_type: FieldType) -> Self {
        FieldDefinition {
            name: name.into(),
            field_type,
        }
    }

    /// Get the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the field type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

/// An ordered list of fields describing the records of one metadata file.
///
/// Field order is significant: the n-th value token of a record line belongs
/// to the n-th field. Lookups by name resolve to that position once, so that
/// predicate evaluation never has to re-parse record text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// Fields in declaration order.
    fields: Vec<FieldDefinition>,
    /// Map of field names to their position.
    positions: HashMap<String, usize>,
}

impl Schema {
    /// Create a new empty schema.
    pub fn new() -> Self {
        Schema::default()
    }

    /// Add a field to the end of the schema.
    pub fn add_field<S: Into<String>>(&mut self, name: S, field_type: FieldType) -> Result<()> {
        let name = name.into();

        if name.is_empty() {
            return Err(GroundtruthError::schema("Field name cannot be empty"));
        }

        if self.positions.contains_key(&name) {
            return Err(GroundtruthError::schema(format!(
                "Field '{name}' already exists"
            )));
        }

        self.positions.insert(name.clone(), self.fields.len());
        self.fields.push(FieldDefinition::new(name, field_type));

        Ok(())
    }

    /// Get the position of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Get a field definition by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.field_index(name).map(|i| &self.fields[i])
    }

    /// Get a field definition by position.
    pub fn field_at(&self, index: usize) -> Option<&FieldDefinition> {
        self.fields.get(index)
    }

    /// Check if a field exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Get all field definitions in declaration order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Get all field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name()).collect()
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse one record line's tokens against this schema.
    pub fn parse_record<'a, I>(&self, tokens: I) -> Result<MetadataRecord>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let tokens: Vec<&str> = tokens.into_iter().collect();
        if tokens.len() != self.fields.len() {
            return Err(GroundtruthError::format(format!(
                "Expected {} field values, found {}",
                self.fields.len(),
                tokens.len()
            )));
        }

        let values = self
            .fields
            .iter()
            .zip(tokens)
            .map(|(field, token)| {
                FieldValue::parse(token, field.field_type()).map_err(|e| {
                    GroundtruthError::schema(format!("Field '{}': {e}", field.name()))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(MetadataRecord::new(values))
    }

    /// Check that a record has one value of the declared type per field.
    pub fn validate_record(&self, record: &MetadataRecord) -> Result<()> {
        if record.len() != self.fields.len() {
            return Err(GroundtruthError::format(format!(
                "Expected {} field values, found {}",
                self.fields.len(),
                record.len()
            )));
        }

        for (field, value) in self.fields.iter().zip(record.values()) {
            if value.field_type() != field.field_type() {
                return Err(GroundtruthError::schema(format!(
                    "Field '{}' is declared {} but holds a {} value",
                    field.name(),
                    field.field_type(),
                    value.field_type()
                )));
            }
        }

        Ok(())
    }

    /// Create a builder for constructing schemas.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("{} {}", field.name(), field.field_type()))
            .collect();
        f.write_str(&pairs.join(" "))
    }
}

/// A builder for constructing schemas in a fluent manner.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, FieldType)>,
}

impl SchemaBuilder {
    /// Create a new schema builder.
    pub fn new() -> Self {
        SchemaBuilder::default()
    }

    /// Append a field.
    pub fn field<S: Into<String>>(mut self, name: S, field_type: FieldType) -> Self {
        self.fields.push((name.into(), field_type));
        self
    }

    /// Build the final schema.
    pub fn build(self) -> Result<Schema> {
        let mut schema = Schema::new();
        for (name, field_type) in self.fields {
            schema.add_field(name, field_type)?;
        }
        Ok(schema)
    }
}

/// The attribute values of one vector, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    values: Vec<FieldValue>,
}

impl MetadataRecord {
    /// Create a record from values in schema order.
    pub fn new(values: Vec<FieldValue>) -> Self {
        MetadataRecord { values }
    }

    /// Get the value at a schema position.
    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    /// Get all values.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Get the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
