//! Bounded top-K selection of nearest candidates.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

/// Where a candidate was found: shard index, then position within the shard.
///
/// The derived ordering is the global scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScanPosition {
    pub shard: usize,
    pub position: usize,
}

impl ScanPosition {
    /// Create a new scan position.
    pub fn new(shard: usize, position: usize) -> Self {
        ScanPosition { shard, position }
    }
}

/// A candidate retained by a collector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: i32,
    pub distance: f64,
    pub position: ScanPosition,
}

impl Neighbor {
    /// Create a new neighbor.
    pub fn new(id: i32, distance: f64, position: ScanPosition) -> Self {
        Neighbor {
            id,
            distance,
            position,
        }
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: the farthest (then latest scanned) candidate is on top
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.position.cmp(&other.position))
    }
}

/// The ranked neighbors of one query, nearest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeighborResult {
    pub ids: Vec<i32>,
    pub distances: Vec<f64>,
}

impl NeighborResult {
    /// Get the number of neighbors.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if no neighbor was found.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate over `(id, distance)` pairs, nearest first.
    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.ids.iter().copied().zip(self.distances.iter().copied())
    }
}

/// A collector that keeps the K nearest candidates offered to it.
///
/// Candidates must be offered in scan order. A candidate replaces the current
/// worst only when strictly nearer, so among equal distances the first one
/// offered is kept.
#[derive(Debug, Clone)]
pub struct TopKCollector {
    /// Maximum number of neighbors to keep.
    k: usize,
    /// Retained candidates (max-heap on distance).
    heap: BinaryHeap<Neighbor>,
    /// Total number of candidates offered.
    offered: u64,
    /// Position assigned to the next [`offer`](Self::offer).
    next_position: usize,
}

impl TopKCollector {
    /// Create a new collector retaining at most `k` neighbors.
    pub fn new(k: usize) -> Self {
        TopKCollector {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1 << 16)),
            offered: 0,
            next_position: 0,
        }
    }

    /// Offer a candidate, positioned after every previous `offer`.
    ///
    /// Returns whether the candidate was retained.
    pub fn offer(&mut self, id: i32, distance: f64) -> bool {
        let position = ScanPosition::new(0, self.next_position);
        self.next_position += 1;
        self.offer_neighbor(Neighbor::new(id, distance, position))
    }

    /// Offer a candidate with an explicit scan position.
    ///
    /// Returns whether the candidate was retained.
    pub fn offer_neighbor(&mut self, candidate: Neighbor) -> bool {
        self.offered += 1;

        if self.k == 0 {
            return false;
        }

        if self.heap.len() < self.k {
            self.heap.push(candidate);
            return true;
        }

        match self.heap.peek() {
            Some(worst) if candidate.distance.total_cmp(&worst.distance) == Ordering::Less => {
                self.heap.pop();
                self.heap.push(candidate);
                true
            }
            _ => false,
        }
    }

    /// Get the maximum number of neighbors retained.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Get the number of neighbors currently retained.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Get the total number of candidates offered.
    pub fn offered(&self) -> u64 {
        self.offered
    }

    /// Distance a new candidate must beat once the collector is full.
    pub fn worst_distance(&self) -> Option<f64> {
        if self.heap.len() < self.k {
            None
        } else {
            self.heap.peek().map(|n| n.distance)
        }
    }

    /// Consume the collector, returning retained candidates in scan order.
    pub fn into_neighbors(self) -> Vec<Neighbor> {
        let mut neighbors = self.heap.into_vec();
        neighbors.sort_unstable_by_key(|n| n.position);
        neighbors
    }

    /// Consume the collector, returning its neighbors nearest first.
    pub fn drain(mut self) -> NeighborResult {
        let mut ids = Vec::with_capacity(self.heap.len());
        let mut distances = Vec::with_capacity(self.heap.len());
        while let Some(worst) = self.heap.pop() {
            ids.push(worst.id);
            distances.push(worst.distance);
        }
        ids.reverse();
        distances.reverse();
        NeighborResult { ids, distances }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_keeps_nearest() {
        let mut collector = TopKCollector::new(2);
        assert!(collector.offer(10, 5.0));
        assert!(collector.offer(11, 1.0));
        assert!(collector.offer(12, 3.0));
        assert!(!collector.offer(13, 9.0));

        assert_eq!(collector.len(), 2);
        assert_eq!(collector.offered(), 4);
        assert_eq!(collector.worst_distance(), Some(3.0));

        let result = collector.drain();
        assert_eq!(result.ids, vec![11, 12]);
        assert_eq!(result.distances, vec![1.0, 3.0]);
    }

    #[test]
    fn test_tie_with_worst_is_discarded() {
        let mut collector = TopKCollector::new(2);
        collector.offer(1, 2.0);
        collector.offer(2, 4.0);
        assert!(!collector.offer(3, 4.0));

        assert_eq!(collector.drain().ids, vec![1, 2]);
    }

    #[test]
    fn test_equal_distances_drain_in_scan_order() {
        let mut collector = TopKCollector::new(3);
        collector.offer(7, 1.0);
        collector.offer(3, 1.0);
        collector.offer(5, 1.0);

        assert_eq!(collector.drain().ids, vec![7, 3, 5]);
    }

    #[test]
    fn test_fewer_candidates_than_k() {
        let mut collector = TopKCollector::new(10);
        collector.offer(4, 0.5);
        assert_eq!(collector.worst_distance(), None);
        assert_eq!(collector.drain().ids, vec![4]);
        assert!(TopKCollector::new(10).drain().is_empty());
    }

    #[test]
    fn test_zero_k_retains_nothing() {
        let mut collector = TopKCollector::new(0);
        assert!(!collector.offer(1, 0.0));
        assert!(collector.drain().is_empty());
    }

    #[test]
    fn test_into_neighbors_is_scan_ordered() {
        let mut collector = TopKCollector::new(3);
        collector.offer_neighbor(Neighbor::new(1, 3.0, ScanPosition::new(0, 4)));
        collector.offer_neighbor(Neighbor::new(2, 1.0, ScanPosition::new(1, 0)));
        collector.offer_neighbor(Neighbor::new(3, 2.0, ScanPosition::new(0, 9)));

        let positions: Vec<ScanPosition> =
            collector.into_neighbors().iter().map(|n| n.position).collect();
        assert_eq!(
            positions,
            vec![
                ScanPosition::new(0, 4),
                ScanPosition::new(0, 9),
                ScanPosition::new(1, 0)
            ]
        );
    }

    #[test]
    fn test_matches_full_sort() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..200 {
            let n = rng.random_range(0..60);
            let k = rng.random_range(0..12);
            // Small integer distances force plenty of ties.
            let distances: Vec<f64> = (0..n).map(|_| rng.random_range(0..8) as f64).collect();

            let mut collector = TopKCollector::new(k);
            for (i, &d) in distances.iter().enumerate() {
                collector.offer(i as i32, d);
                assert!(collector.len() <= k);
            }

            let mut expected: Vec<(f64, i32)> = distances
                .iter()
                .enumerate()
                .map(|(i, &d)| (d, i as i32))
                .collect();
            expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            expected.truncate(k);

            let result = collector.drain();
            let actual: Vec<(f64, i32)> = result.iter().map(|(id, d)| (d, id)).collect();
            assert_eq!(actual, expected);
        }
    }
}
