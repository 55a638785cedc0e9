//! Query workload generation.
//!
//! Query vectors are sampled without replacement from every shard, in shard
//! order. Each query then gets an equality clause on a random label and a
//! range clause of random bounds, either of which can be switched off.

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, index};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::dataset::metadata_gen::DEFAULT_LABELS;
use crate::error::{GroundtruthError, Result};
use crate::format::{QueryRecord, QuerySet, VectorShard};
use crate::query::PredicateClause;

/// Configuration for query workload generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Query vectors sampled from each shard.
    pub queries_per_shard: usize,

    /// Field of the equality clause; no equality clause if None.
    pub label_field: Option<String>,

    /// Literals drawn for the equality clause.
    pub labels: Vec<String>,

    /// Field of the range clause; no range clause if None.
    pub range_field: Option<String>,

    /// Smallest bound a range clause may use.
    pub range_min: i64,

    /// Largest bound a range clause may use.
    pub range_max: i64,

    /// Range clauses are strictly wider than this.
    pub min_range_width: i64,

    /// Seed of the random generator.
    pub seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            queries_per_shard: 20,
            label_field: Some("color".to_string()),
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            range_field: Some("value".to_string()),
            range_min: 0,
            range_max: 10_000,
            min_range_width: 100,
            seed: 42,
        }
    }
}

impl WorkloadConfig {
    /// Create a new config sampling `queries_per_shard` vectors per shard.
    pub fn new(queries_per_shard: usize) -> Self {
        Self {
            queries_per_shard,
            ..Default::default()
        }
    }

    /// Set the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the equality clause field and vocabulary, or disable it with None.
    pub fn with_labels<S: Into<String>>(
        mut self,
        field: Option<&str>,
        labels: impl IntoIterator<Item = S>,
    ) -> Self {
        self.label_field = field.map(str::to_string);
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Set the range clause field and bounds, or disable it with None.
    pub fn with_range(mut self, field: Option<&str>, min: i64, max: i64, min_width: i64) -> Self {
        self.range_field = field.map(str::to_string);
        self.range_min = min;
        self.range_max = max;
        self.min_range_width = min_width;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.queries_per_shard == 0 {
            return Err(GroundtruthError::invalid_config(
                "queries_per_shard must be at least 1",
            ));
        }
        if self.label_field.is_some() {
            if self.labels.is_empty() {
                return Err(GroundtruthError::invalid_config(
                    "An equality clause needs at least one label",
                ));
            }
            if let Some(bad) = self
                .labels
                .iter()
                .find(|l| l.contains('"') || l.chars().any(|c| c.is_ascii_whitespace()))
            {
                return Err(GroundtruthError::invalid_config(format!(
                    "Label '{bad}' cannot appear in a predicate token"
                )));
            }
        }
        if self.range_field.is_some() {
            if self.min_range_width < 0 {
                return Err(GroundtruthError::invalid_config(
                    "min_range_width must be non-negative",
                ));
            }
            let span = i128::from(self.range_max) - i128::from(self.range_min);
            if span <= i128::from(self.min_range_width) {
                return Err(GroundtruthError::invalid_config(format!(
                    "Range {}..={} cannot hold a clause wider than {}",
                    self.range_min, self.range_max, self.min_range_width
                )));
            }
        }
        Ok(())
    }

    fn predicate(&self, rng: &mut StdRng) -> Result<PredicateClause> {
        let mut clauses = Vec::with_capacity(2);

        if let Some(field) = &self.label_field {
            let label = self
                .labels
                .choose(rng)
                .ok_or_else(|| GroundtruthError::internal("empty label vocabulary"))?;
            clauses.push(PredicateClause::equality(field.as_str(), label.as_str()));
        }

        if let Some(field) = &self.range_field {
            let (lo, hi) = loop {
                let a = rng.random_range(self.range_min..=self.range_max);
                let b = rng.random_range(self.range_min..=self.range_max);
                if (i128::from(a) - i128::from(b)).abs() > i128::from(self.min_range_width) {
                    break (a.min(b), a.max(b));
                }
            };
            clauses.push(PredicateClause::range(field.as_str(), lo as f64, hi as f64));
        }

        Ok(PredicateClause::all(clauses))
    }
}

/// Sample query vectors from `shards` and attach random predicates.
pub fn generate_workload(shards: &[VectorShard], config: &WorkloadConfig) -> Result<QuerySet> {
    config.validate()?;
    let dimension = shards
        .first()
        .map(VectorShard::dimension)
        .ok_or_else(|| GroundtruthError::invalid_config("At least one shard is required"))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut embeddings = Vec::with_capacity(shards.len() * config.queries_per_shard);

    for (i, shard) in shards.iter().enumerate() {
        if shard.dimension() != dimension {
            return Err(GroundtruthError::validation(format!(
                "Shard {i} has dimension {}, shard 0 has dimension {dimension}",
                shard.dimension()
            )));
        }
        if shard.len() < config.queries_per_shard {
            return Err(GroundtruthError::invalid_config(format!(
                "Shard {i} holds {} vectors, cannot sample {}",
                shard.len(),
                config.queries_per_shard
            )));
        }
        for position in index::sample(&mut rng, shard.len(), config.queries_per_shard) {
            embeddings.push(shard.records()[position].embedding.clone());
        }
    }

    let mut set = QuerySet::new(dimension);
    for embedding in embeddings {
        let predicate = config.predicate(&mut rng)?;
        set.push(QueryRecord::new(embedding, predicate))?;
    }
    Ok(set)
}
