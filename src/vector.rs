//! Vector arithmetic used by the exact scan.

pub mod distance;

pub use self::distance::{distance, squared_euclidean};
