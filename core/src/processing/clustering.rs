//! Density-based clustering of scan points.
//!
//! Neighbourhoods are found by brute force, so a run costs O(n²) distance
//! checks. That is fine for a few hundred beams per scan; inputs of several
//! thousand points would need a grid or tree index.

use crate::math::geometry::{Planar, Point2};
use crate::prelude::DetectionParams;

/// Result of one clustering run, as indices into the input slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSet {
    /// Member indices of each cluster, ascending.
    pub clusters: Vec<Vec<usize>>,
    /// Indices that belong to no cluster, ascending.
    pub noise: Vec<usize>,
}

impl ClusterSet {
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Copies the members of every cluster out of `points`.
    pub fn collect<P: Clone>(&self, points: &[P]) -> Vec<Vec<P>> {
        self.clusters
            .iter()
            .map(|members| members.iter().map(|&i| points[i].clone()).collect())
            .collect()
    }
}

pub struct SpatialClusterer {
    eps: f64,
    min_points: usize,
}

impl SpatialClusterer {
    pub fn new(eps: f64, min_points: usize) -> Self {
        Self { eps, min_points }
    }

    pub fn from_params(params: &DetectionParams) -> Self {
        Self::new(params.eps_mm, params.min_points)
    }

    /// Partitions `points` into density-connected clusters.
    ///
    /// Points are visited in input order, so identical input yields identical
    /// clusters. A point marked as noise stays noise even if a later cluster
    /// reaches it.
    pub fn cluster<P: Planar>(&self, points: &[P]) -> ClusterSet {
        let positions: Vec<Point2> = points.iter().map(Planar::position).collect();
        let count = positions.len();

        let mut visited = vec![false; count];
        let mut noise = vec![false; count];
        let mut assigned = vec![false; count];
        let mut clusters = Vec::new();

        for seed in 0..count {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;

            let neighbors = self.neighbors(&positions, seed);
            if neighbors.len() < self.min_points {
                noise[seed] = true;
                continue;
            }

            let mut members = vec![seed];
            assigned[seed] = true;

            let mut queued = vec![false; count];
            for &index in &neighbors {
                queued[index] = true;
            }
            let mut work = neighbors;
            let mut cursor = 0;
            while cursor < work.len() {
                let current = work[cursor];
                cursor += 1;

                if !visited[current] {
                    visited[current] = true;
                    let reachable = self.neighbors(&positions, current);
                    if reachable.len() >= self.min_points {
                        for index in reachable {
                            if !queued[index] {
                                queued[index] = true;
                                work.push(index);
                            }
                        }
                    }
                }

                if !noise[current] && !assigned[current] {
                    assigned[current] = true;
                    members.push(current);
                }
            }

            members.sort_unstable();
            clusters.push(members);
        }

        let noise = (0..count).filter(|&index| !assigned[index]).collect();
        ClusterSet { clusters, noise }
    }

    /// Indices within `eps` of `index`, the point itself included.
    fn neighbors(&self, positions: &[Point2], index: usize) -> Vec<usize> {
        if self.eps <= 0.0 {
            return vec![index];
        }
        let center = positions[index];
        positions
            .iter()
            .enumerate()
            .filter(|(other, position)| *other == index || center.distance(position) <= self.eps)
            .map(|(other, _)| other)
            .collect()
    }
}
