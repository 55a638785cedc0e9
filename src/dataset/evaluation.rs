//! Recall of an answer file against groundtruth.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{GroundtruthError, Result};

/// Recall@K over a query set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallReport {
    /// Number of queries compared.
    pub queries: usize,

    /// Cut-off applied to both lists.
    pub k: usize,

    /// Mean recall over all queries.
    pub mean_recall: f64,

    /// Lowest per-query recall.
    pub min_recall: f64,

    /// Recall of each query, in query order.
    pub per_query: Vec<f64>,
}

/// Compare the first `k` ids of each answer with the first `k` ids of its
/// groundtruth list.
///
/// A query whose groundtruth list is empty (nothing matched its predicate)
/// has recall 1.0.
pub fn recall_at_k(truth: &[Vec<i32>], answers: &[Vec<i32>], k: usize) -> Result<RecallReport> {
    if truth.len() != answers.len() {
        return Err(GroundtruthError::validation(format!(
            "Groundtruth holds {} queries, answers hold {}",
            truth.len(),
            answers.len()
        )));
    }
    if k == 0 {
        return Err(GroundtruthError::invalid_config("k must be at least 1"));
    }

    let per_query: Vec<f64> = truth
        .iter()
        .zip(answers)
        .map(|(expected, actual)| {
            let expected: HashSet<i32> = expected.iter().take(k).copied().collect();
            if expected.is_empty() {
                return 1.0;
            }
            let hits = actual
                .iter()
                .take(k)
                .collect::<HashSet<_>>()
                .into_iter()
                .filter(|id| expected.contains(*id))
                .count();
            hits as f64 / expected.len() as f64
        })
        .collect();

    let mean_recall = if per_query.is_empty() {
        1.0
    } else {
        per_query.iter().sum::<f64>() / per_query.len() as f64
    };
    let min_recall = per_query.iter().copied().fold(1.0, f64::min);

    Ok(RecallReport {
        queries: per_query.len(),
        k,
        mean_recall,
        min_recall,
        per_query,
    })
}
