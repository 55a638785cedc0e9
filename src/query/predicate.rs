//! Predicate clauses and their schema-bound form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GroundtruthError, Result};
use crate::schema::{FieldType, FieldValue, MetadataRecord, Schema};

/// A structured filter over one metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateClause {
    /// Exact match of a string field against a literal.
    Equality { field: String, literal: String },

    /// Numeric field within `[lo, hi]`, both ends inclusive.
    Range { field: String, lo: f64, hi: f64 },

    /// All inner clauses hold. The empty conjunction matches every record.
    And(Vec<PredicateClause>),
}

impl PredicateClause {
    /// Create an equality clause.
    pub fn equality<F: Into<String>, L: Into<String>>(field: F, literal: L) -> Self {
        PredicateClause::Equality {
            field: field.into(),
            literal: literal.into(),
        }
    }

    /// Create an inclusive range clause.
    pub fn range<F: Into<String>>(field: F, lo: f64, hi: f64) -> Self {
        PredicateClause::Range {
            field: field.into(),
            lo,
            hi,
        }
    }

    /// A clause that matches every record.
    pub fn always() -> Self {
        PredicateClause::And(Vec::new())
    }

    /// Combine clauses into a conjunction. A single clause is returned as-is.
    pub fn all(mut clauses: Vec<PredicateClause>) -> Self {
        if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            PredicateClause::And(clauses)
        }
    }

    /// Check whether this clause trivially matches every record.
    pub fn is_always(&self) -> bool {
        match self {
            PredicateClause::And(inner) => inner.iter().all(|c| c.is_always()),
            _ => false,
        }
    }

    /// Get the field names referenced by this clause.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            PredicateClause::Equality { field, .. } | PredicateClause::Range { field, .. } => {
                vec![field.as_str()]
            }
            PredicateClause::And(inner) => inner.iter().flat_map(|c| c.fields()).collect(),
        }
    }

    /// Resolve field names to schema positions and check clause/type agreement.
    pub fn bind(&self, schema: &Schema) -> Result<BoundPredicate> {
        match self {
            PredicateClause::Equality { field, literal } => {
                let index = resolve(schema, field)?;
                let field_type = schema.fields()[index].field_type();
                if field_type != FieldType::String {
                    return Err(GroundtruthError::schema(format!(
                        "Equality predicate on '{field}' requires a string field, schema declares {field_type}"
                    )));
                }
                Ok(BoundPredicate::Equality {
                    index,
                    literal: literal.clone(),
                })
            }
            PredicateClause::Range { field, lo, hi } => {
                let index = resolve(schema, field)?;
                let field_type = schema.fields()[index].field_type();
                if !field_type.is_numeric() {
                    return Err(GroundtruthError::schema(format!(
                        "Range predicate on '{field}' requires a numeric field, schema declares {field_type}"
                    )));
                }
                Ok(BoundPredicate::Range {
                    index,
                    lo: *lo,
                    hi: *hi,
                })
            }
            PredicateClause::And(inner) => inner
                .iter()
                .map(|c| c.bind(schema))
                .collect::<Result<Vec<_>>>()
                .map(BoundPredicate::And),
        }
    }

    /// Evaluate this clause against one record of the given schema.
    ///
    /// Binds on every call; the scan loop binds once per shard instead.
    pub fn evaluate(&self, schema: &Schema, record: &MetadataRecord) -> Result<bool> {
        Ok(self.bind(schema)?.matches(record))
    }
}

fn resolve(schema: &Schema, field: &str) -> Result<usize> {
    schema.field_index(field).ok_or_else(|| {
        GroundtruthError::schema(format!(
            "Predicate references field '{field}' which is not declared in schema [{schema}]"
        ))
    })
}

impl fmt::Display for PredicateClause {
    /// Formats the clause as the whitespace-separated tokens it compiles from.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateClause::Equality { field, literal } => write!(f, "{field}=\"{literal}\""),
            PredicateClause::Range { field, lo, hi } => write!(f, "{lo}<={field}<={hi}"),
            PredicateClause::And(inner) => {
                let tokens: Vec<String> = inner
                    .iter()
                    .filter(|c| !c.is_always())
                    .map(|c| c.to_string())
                    .collect();
                f.write_str(&tokens.join(" "))
            }
        }
    }
}

/// A predicate with field names resolved to positions of one schema.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundPredicate {
    Equality { index: usize, literal: String },
    Range { index: usize, lo: f64, hi: f64 },
    And(Vec<BoundPredicate>),
}

impl BoundPredicate {
    /// Check whether a record of the bound schema satisfies the predicate.
    pub fn matches(&self, record: &MetadataRecord) -> bool {
        match self {
            BoundPredicate::Equality { index, literal } => match record.get(*index) {
                Some(FieldValue::Str(value)) => value == literal,
                _ => false,
            },
            BoundPredicate::Range { index, lo, hi } => record
                .get(*index)
                .and_then(|value| value.within(*lo, *hi))
                .unwrap_or(false),
            BoundPredicate::And(inner) => inner.iter().all(|p| p.matches(record)),
        }
    }
}
