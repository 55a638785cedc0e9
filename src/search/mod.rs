//! Exact nearest-neighbor selection.

pub mod collector;

pub use self::collector::{Neighbor, NeighborResult, ScanPosition, TopKCollector};
