//! Random metadata for benchmark shards.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{GroundtruthError, Result};
use crate::format::MetadataTable;
use crate::schema::{FieldType, FieldValue, MetadataRecord, Schema};

/// Color vocabulary of the DEEP workloads.
pub const DEFAULT_LABELS: &[&str] = &[
    "red", "orange", "yellow", "green", "blue", "cyan", "purple", "white", "black", "gold",
    "silver", "pink", "brown",
];

/// Configuration for metadata generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataGenConfig {
    /// Name of the categorical string field.
    pub label_field: String,

    /// Values drawn uniformly for the label field.
    pub labels: Vec<String>,

    /// Name of the integer field, if one is generated.
    pub value_field: Option<String>,

    /// Inclusive upper bound of the integer field; the lower bound is 0.
    pub value_max: i64,

    /// Seed of the random generator.
    pub seed: u64,
}

impl Default for MetadataGenConfig {
    fn default() -> Self {
        Self {
            label_field: "color".to_string(),
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            value_field: Some("value".to_string()),
            value_max: 10_000,
            seed: 42,
        }
    }
}

impl MetadataGenConfig {
    /// Set the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the label vocabulary.
    pub fn with_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Generate only the label field.
    pub fn without_values(mut self) -> Self {
        self.value_field = None;
        self
    }

    /// The schema of the generated records.
    pub fn schema(&self) -> Result<Schema> {
        let mut builder = Schema::builder().field(self.label_field.as_str(), FieldType::String);
        if let Some(field) = &self.value_field {
            builder = builder.field(field.as_str(), FieldType::Int);
        }
        builder.build()
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(GroundtruthError::invalid_config("At least one label is required"));
        }
        if let Some(bad) = self
            .labels
            .iter()
            .find(|l| l.is_empty() || l.chars().any(|c| c.is_ascii_whitespace()))
        {
            return Err(GroundtruthError::invalid_config(format!(
                "Label '{bad}' must be non-empty and whitespace-free"
            )));
        }
        if self.value_max < 0 {
            return Err(GroundtruthError::invalid_config(format!(
                "value_max must be non-negative, found {}",
                self.value_max
            )));
        }
        Ok(())
    }
}

/// Generate `count` records: a random label and, if configured, a random
/// integer in `0..=value_max`.
pub fn generate_metadata(count: usize, config: &MetadataGenConfig) -> Result<MetadataTable> {
    config.validate()?;
    let schema = config.schema()?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let label = config
            .labels
            .choose(&mut rng)
            .ok_or_else(|| GroundtruthError::internal("empty label vocabulary"))?;
        let mut values = vec![FieldValue::Str(label.clone())];
        if config.value_field.is_some() {
            values.push(FieldValue::Int(rng.random_range(0..=config.value_max)));
        }
        records.push(MetadataRecord::new(values));
    }

    MetadataTable::from_records(schema, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_records_follow_schema() {
        let config = MetadataGenConfig::default();
        let table = generate_metadata(50, &config).unwrap();

        assert_eq!(table.len(), 50);
        assert_eq!(table.schema().field_names(), vec!["color", "value"]);
        for record in table.records() {
            let label = record.get(0).and_then(FieldValue::as_str).unwrap();
            assert!(DEFAULT_LABELS.contains(&label));
            let value = record.get(1).and_then(FieldValue::as_f64).unwrap();
            assert!((0.0..=10_000.0).contains(&value));
        }
    }

    #[test]
    fn test_same_seed_same_records() {
        let config = MetadataGenConfig::default().with_seed(7);
        assert_eq!(
            generate_metadata(20, &config).unwrap(),
            generate_metadata(20, &config).unwrap()
        );
    }

    #[test]
    fn test_labels_only() {
        let config = MetadataGenConfig::default()
            .with_labels(["a", "b"])
            .without_values();
        let table = generate_metadata(3, &config).unwrap();
        assert_eq!(table.schema().len(), 1);
    }

    #[test]
    fn test_invalid_labels() {
        let config = MetadataGenConfig::default().with_labels(["light blue"]);
        assert!(matches!(
            generate_metadata(1, &config),
            Err(GroundtruthError::InvalidConfig(_))
        ));
        let config = MetadataGenConfig::default().with_labels(Vec::<String>::new());
        assert!(config.validate().is_err());
    }
}
