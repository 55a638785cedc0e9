//! Squared Euclidean distance.
//!
//! Each component difference is widened to `f64` and the sum is accumulated
//! one component at a time, from index 0 upwards. No lane splitting or
//! reordering, so repeated runs are bit-identical, and distances that differ
//! only beyond `f32` precision stay distinct.

use crate::error::{GroundtruthError, Result};

/// Squared L2 distance between two equal-length slices.
///
/// Extra components of the longer slice are ignored; use [`distance`] when
/// lengths are not already known to match.
#[inline]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f64 {
    let mut sum = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let diff = f64::from(*x) - f64::from(*y);
        sum += diff * diff;
    }
    sum
}

/// Squared L2 distance, checking that both vectors share a dimension.
pub fn distance(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(GroundtruthError::validation(format!(
            "Vector dimensions must match for distance calculation: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(squared_euclidean(a, b))
}
