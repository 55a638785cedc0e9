//! Counters reported by a groundtruth job.

use serde::{Deserialize, Serialize};

/// What one shard contributed to the scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardStats {
    /// Shard description.
    pub shard: String,

    /// Vectors in the shard.
    pub vectors: usize,

    /// (query, record) pairs whose predicate held; one distance each.
    pub candidates: u64,
}

/// Summary of a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Number of queries answered.
    pub queries: usize,

    /// Neighbors requested per query.
    pub k: usize,

    /// Worker threads used.
    pub threads: usize,

    /// Partition axis actually used.
    pub partition: String,

    /// Per-shard counters, in shard order.
    pub shards: Vec<ShardStats>,

    /// Queries that ended with fewer than k neighbors.
    pub short_results: usize,

    /// Wall-clock time of validation and scan, in seconds.
    pub elapsed_secs: f64,
}

impl ScanStats {
    /// Total vectors scanned across all shards.
    pub fn vectors_scanned(&self) -> usize {
        self.shards.iter().map(|s| s.vectors).sum()
    }

    /// Total distance evaluations across all shards.
    pub fn candidates(&self) -> u64 {
        self.shards.iter().map(|s| s.candidates).sum()
    }

    /// Fraction of (query, record) pairs that passed their predicate.
    pub fn selectivity(&self) -> f64 {
        let pairs = self.vectors_scanned() as f64 * self.queries as f64;
        if pairs == 0.0 {
            0.0
        } else {
            self.candidates() as f64 / pairs
        }
    }
}
