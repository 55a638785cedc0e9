//! Field types and typed field values for metadata records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GroundtruthError, Result};

/// The declared type of a metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// Whitespace-free string token.
    String,
}

impl FieldType {
    /// Get the name of this field type as written in metadata headers.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::String => "string",
        }
    }

    /// Parse a field type from a metadata header token.
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "int" => Ok(FieldType::Int),
            "float" => Ok(FieldType::Float),
            "string" => Ok(FieldType::String),
            _ => Err(GroundtruthError::schema(format!(
                "Unknown field type '{s}' (expected int, float or string)"
            ))),
        }
    }

    /// Check if range predicates can be evaluated on this type.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed value of one metadata field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    Str(String),
}

impl FieldValue {
    /// Parse a raw token as a value of the given type.
    pub fn parse(token: &str, field_type: FieldType) -> Result<Self> {
        match field_type {
            FieldType::Int => token.parse::<i64>().map(FieldValue::Int).map_err(|e| {
                GroundtruthError::schema(format!("Cannot parse '{token}' as int: {e}"))
            }),
            FieldType::Float => token.parse::<f64>().map(FieldValue::Float).map_err(|e| {
                GroundtruthError::schema(format!("Cannot parse '{token}' as float: {e}"))
            }),
            FieldType::String => Ok(FieldValue::Str(token.to_string())),
        }
    }

    /// The type this value belongs to.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Str(_) => FieldType::String,
        }
    }

    /// Get the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the numeric payload widened to f64, if this is a numeric value.
    ///
    /// Integers beyond 2^53 in magnitude are rounded; use [`within`](Self::within)
    /// for range checks.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Str(_) => None,
        }
    }

    /// Check `lo <= value <= hi`, or `None` for a string value.
    ///
    /// Integers are compared exactly against the integer span of the bounds.
    pub fn within(&self, lo: f64, hi: f64) -> Option<bool> {
        match self {
            FieldValue::Int(v) => {
                // 2^63, the first f64 above i64::MAX.
                const LIMIT: f64 = 9_223_372_036_854_775_808.0;
                let (lo, hi) = (lo.ceil(), hi.floor());
                if lo.is_nan() || hi.is_nan() || lo >= LIMIT || hi < -LIMIT || lo > hi {
                    return Some(false);
                }
                // Whole numbers inside the i64 range convert exactly; the rest saturate.
                Some(lo as i64 <= *v && *v <= hi as i64)
            }
            FieldValue::Float(v) => Some(lo <= *v && *v <= hi),
            FieldValue::Str(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}
