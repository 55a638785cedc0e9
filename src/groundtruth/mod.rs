//! Groundtruth jobs: exact filtered nearest neighbors over every shard.

pub mod config;
pub mod engine;
pub mod merger;
pub mod source;
pub mod stats;

pub use self::config::{DEFAULT_K, GroundtruthConfig, PartitionAxis};
pub use self::engine::{GroundtruthEngine, GroundtruthOutput};
pub use self::merger::merge_partials;
pub use self::source::{FileShard, Shard, ShardSource};
pub use self::stats::{ScanStats, ShardStats};
