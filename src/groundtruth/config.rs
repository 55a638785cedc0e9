//! Configuration for groundtruth jobs.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GroundtruthError, Result};

/// Number of neighbors computed per query when none is given.
pub const DEFAULT_K: usize = 128;

/// How the scan is divided between worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionAxis {
    /// One thread, shards in order.
    Sequential,

    /// Contiguous groups of shards per worker, merged afterwards.
    #[default]
    Shards,

    /// One shard at a time, queries spread over the workers.
    Queries,
}

impl PartitionAxis {
    /// Get the name used in configuration files and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            PartitionAxis::Sequential => "sequential",
            PartitionAxis::Shards => "shards",
            PartitionAxis::Queries => "queries",
        }
    }
}

impl fmt::Display for PartitionAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PartitionAxis {
    type Err = GroundtruthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(PartitionAxis::Sequential),
            "shards" => Ok(PartitionAxis::Shards),
            "queries" => Ok(PartitionAxis::Queries),
            other => Err(GroundtruthError::invalid_config(format!(
                "Unknown partition axis '{other}' (expected sequential, shards or queries)"
            ))),
        }
    }
}

/// Configuration for a groundtruth job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundtruthConfig {
    /// Number of neighbors to compute per query.
    pub k: usize,

    /// Worker threads for the scan.
    /// If None, uses the number of CPU cores.
    pub num_threads: Option<usize>,

    /// How work is divided between the workers.
    pub partition: PartitionAxis,
}

impl Default for GroundtruthConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            num_threads: None,
            partition: PartitionAxis::default(),
        }
    }
}

impl GroundtruthConfig {
    /// Create a new config with the specified k.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    /// Set the number of neighbors per query.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the number of worker threads.
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Set the partition axis.
    pub fn with_partition(mut self, partition: PartitionAxis) -> Self {
        self.partition = partition;
        self
    }

    /// Number of worker threads the job will use.
    pub fn threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Partition axis after accounting for a single worker.
    pub fn effective_partition(&self) -> PartitionAxis {
        if self.threads() == 1 {
            PartitionAxis::Sequential
        } else {
            self.partition
        }
    }

    /// Check the configuration for values no job can run with.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(GroundtruthError::invalid_config("k must be at least 1"));
        }
        if i32::try_from(self.k).is_err() {
            return Err(GroundtruthError::invalid_config(format!(
                "k = {} does not fit the i32 neighbor count of the groundtruth format",
                self.k
            )));
        }
        if self.num_threads == Some(0) {
            return Err(GroundtruthError::invalid_config(
                "num_threads must be at least 1",
            ));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| GroundtruthError::io_at(path, e))?;
        let config: GroundtruthConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|e| GroundtruthError::io_at(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GroundtruthConfig::default();
        assert_eq!(config.k, 128);
        assert_eq!(config.num_threads, None);
        assert_eq!(config.partition, PartitionAxis::Shards);
        assert!(config.threads() > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = GroundtruthConfig::new(10)
            .with_num_threads(4)
            .with_partition(PartitionAxis::Queries);

        assert_eq!(config.k, 10);
        assert_eq!(config.threads(), 4);
        assert_eq!(config.effective_partition(), PartitionAxis::Queries);
    }

    #[test]
    fn test_single_thread_runs_sequentially() {
        let config = GroundtruthConfig::default().with_num_threads(1);
        assert_eq!(config.effective_partition(), PartitionAxis::Sequential);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            GroundtruthConfig::new(0).validate(),
            Err(GroundtruthError::InvalidConfig(_))
        ));
        assert!(matches!(
            GroundtruthConfig::default().with_num_threads(0).validate(),
            Err(GroundtruthError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GroundtruthConfig =
            serde_json::from_str(r#"{"k": 5, "partition": "queries"}"#).unwrap();
        assert_eq!(config.k, 5);
        assert_eq!(config.num_threads, None);
        assert_eq!(config.partition, PartitionAxis::Queries);
    }

    #[test]
    fn test_partition_axis_from_str() {
        assert_eq!("Shards".parse::<PartitionAxis>().unwrap(), PartitionAxis::Shards);
        assert!("diagonal".parse::<PartitionAxis>().is_err());
    }
}
