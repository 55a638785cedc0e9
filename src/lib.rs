//! # silo-gt
//!
//! Exact filtered k-nearest-neighbor groundtruth for sharded vector-search
//! benchmarks.
//!
//! ## Features
//!
//! - Binary vector shards, typed metadata tables and query sets with predicates
//! - Exact top-K under squared Euclidean distance, merged across shards
//! - Deterministic results for every thread count and partitioning
//! - Dataset preparation: `.fbin` conversion, silo splitting, metadata and
//!   workload generation, recall evaluation

pub mod cli;
pub mod dataset;
pub mod error;
pub mod format;
pub mod groundtruth;
pub mod query;
pub mod schema;
pub mod search;
pub mod vector;

pub mod prelude {
    pub use crate::error::{GroundtruthError, Result};
    pub use crate::format::{MetadataTable, QuerySet, VectorShard};
    pub use crate::groundtruth::{FileShard, GroundtruthConfig, GroundtruthEngine, Shard};
    pub use crate::search::NeighborResult;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
