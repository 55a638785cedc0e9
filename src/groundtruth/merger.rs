//! Reduction of per-worker partial results.

use crate::search::{Neighbor, NeighborResult, TopKCollector};

/// Merge the retained candidates of several workers into final results.
///
/// `partials[w][q]` holds worker `w`'s candidates for query `q`. Candidates of
/// each query are re-offered in global scan order, so the merged answer equals
/// what one collector would have kept scanning every shard in order.
pub fn merge_partials(k: usize, partials: Vec<Vec<Vec<Neighbor>>>) -> Vec<NeighborResult> {
    let queries = partials.iter().map(Vec::len).max().unwrap_or(0);
    let mut per_query: Vec<Vec<Neighbor>> = vec![Vec::new(); queries];

    for worker in partials {
        for (q, neighbors) in worker.into_iter().enumerate() {
            per_query[q].extend(neighbors);
        }
    }

    per_query
        .into_iter()
        .map(|mut candidates| {
            candidates.sort_unstable_by_key(|n| n.position);
            let mut collector = TopKCollector::new(k);
            for candidate in candidates {
                collector.offer_neighbor(candidate);
            }
            collector.drain()
        })
        .collect()
}
