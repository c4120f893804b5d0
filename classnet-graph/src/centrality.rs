// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Centrality Engine
//!
//! Five per-student measures over the directed graph:
//! - in/out degree, normalized by `N - 1`
//! - closeness from incoming shortest paths, Wasserman-Faust scaled, taken
//!   inside the largest weakly connected component(s) only
//! - Brandes betweenness, normalized by `(N - 1)(N - 2)`
//! - eigenvector centrality by power iteration, all zeros when it does not
//!   converge
//!
//! A graph with one node or no edges scores 0 everywhere.

use crate::graph::SocialGraph;
use classnet_core::{CentralityConfig, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    InDegree,
    OutDegree,
    Closeness,
    Betweenness,
    Eigenvector,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::InDegree,
        Metric::OutDegree,
        Metric::Closeness,
        Metric::Betweenness,
        Metric::Eigenvector,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::InDegree => "in_degree",
            Metric::OutDegree => "out_degree",
            Metric::Closeness => "closeness",
            Metric::Betweenness => "betweenness",
            Metric::Eigenvector => "eigenvector",
        }
    }

    /// Human-readable name for summaries
    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::InDegree => "in-degree",
            Metric::OutDegree => "out-degree",
            Metric::Closeness => "closeness",
            Metric::Betweenness => "betweenness",
            Metric::Eigenvector => "eigenvector",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric name -> student id -> score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CentralityMetrics {
    pub in_degree: BTreeMap<NodeId, f64>,
    pub out_degree: BTreeMap<NodeId, f64>,
    pub closeness: BTreeMap<NodeId, f64>,
    pub betweenness: BTreeMap<NodeId, f64>,
    pub eigenvector: BTreeMap<NodeId, f64>,
    /// False when power iteration gave up and eigenvector was zero-filled
    pub eigenvector_converged: bool,
}

impl CentralityMetrics {
    /// All-zero metrics for the given students
    pub fn zeros(ids: &[NodeId]) -> Self {
        let zero: BTreeMap<NodeId, f64> = ids.iter().map(|&id| (id, 0.0)).collect();
        Self {
            in_degree: zero.clone(),
            out_degree: zero.clone(),
            closeness: zero.clone(),
            betweenness: zero.clone(),
            eigenvector: zero,
            eigenvector_converged: true,
        }
    }

    pub fn get(&self, metric: Metric) -> &BTreeMap<NodeId, f64> {
        match metric {
            Metric::InDegree => &self.in_degree,
            Metric::OutDegree => &self.out_degree,
            Metric::Closeness => &self.closeness,
            Metric::Betweenness => &self.betweenness,
            Metric::Eigenvector => &self.eigenvector,
        }
    }

    pub fn value(&self, metric: Metric, id: NodeId) -> f64 {
        self.get(metric).get(&id).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CentralityEngine {
    config: CentralityConfig,
}

impl CentralityEngine {
    pub fn new(config: CentralityConfig) -> Self {
        Self { config }
    }

    /// Compute all five measures together
    pub fn compute(&self, graph: &SocialGraph) -> CentralityMetrics {
        let ids = graph.node_ids();
        if graph.node_count() <= 1 || graph.edge_count() == 0 {
            debug!(nodes = graph.node_count(), "Trivial graph, all centralities are zero");
            return CentralityMetrics::zeros(&ids);
        }

        let keyed = |values: Vec<f64>| -> BTreeMap<NodeId, f64> {
            ids.iter().copied().zip(values).collect()
        };

        let (eigenvector, eigenvector_converged) = match self.eigenvector(graph) {
            Some(values) => (values, true),
            None => {
                warn!(
                    max_iter = self.config.eigenvector_max_iter,
                    "Eigenvector centrality did not converge, using zeros"
                );
                (vec![0.0; ids.len()], false)
            }
        };

        CentralityMetrics {
            in_degree: keyed(in_degree(graph)),
            out_degree: keyed(out_degree(graph)),
            closeness: keyed(closeness(graph)),
            betweenness: keyed(betweenness(graph)),
            eigenvector: keyed(eigenvector),
            eigenvector_converged,
        }
    }

    /// Power iteration on `A^T + I`; `None` when it does not converge
    pub fn eigenvector(&self, graph: &SocialGraph) -> Option<Vec<f64>> {
        let n = graph.node_count();
        if n == 0 || graph.edge_count() == 0 {
            return None;
        }
        let tolerance = n as f64 * self.config.eigenvector_tolerance;
        let mut x = vec![1.0 / n as f64; n];

        for iteration in 0..self.config.eigenvector_max_iter {
            let last = x.clone();
            for (u, &score) in last.iter().enumerate() {
                for v in graph.out_neighbors(u) {
                    x[v] += score;
                }
            }

            let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
            let norm = if norm > 0.0 { norm } else { 1.0 };
            for v in x.iter_mut() {
                *v /= norm;
            }

            if x.iter().any(|v| !v.is_finite()) {
                return None;
            }

            let change: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
            if change < tolerance {
                debug!(iterations = iteration + 1, "Eigenvector centrality converged");
                return Some(x);
            }
        }
        None
    }
}

fn degree_scale(n: usize) -> f64 {
    if n > 1 {
        1.0 / (n - 1) as f64
    } else {
        0.0
    }
}

/// In-degree count / (N - 1), by position
pub fn in_degree(graph: &SocialGraph) -> Vec<f64> {
    let scale = degree_scale(graph.node_count());
    (0..graph.node_count())
        .map(|p| graph.in_degree_at(p) as f64 * scale)
        .collect()
}

pub fn out_degree(graph: &SocialGraph) -> Vec<f64> {
    let scale = degree_scale(graph.node_count());
    (0..graph.node_count())
        .map(|p| graph.out_degree_at(p) as f64 * scale)
        .collect()
}

/// Closeness inside the largest weakly connected component(s); 0 elsewhere.
///
/// Distances are measured *to* each student. Components tied for largest
/// are all scored, each against its own size.
pub fn closeness(graph: &SocialGraph) -> Vec<f64> {
    let n = graph.node_count();
    let mut scores = vec![0.0; n];
    let components = graph.weakly_connected_components();
    let largest = components.iter().map(Vec::len).max().unwrap_or(0);
    if largest < 2 {
        return scores;
    }

    for component in components.iter().filter(|c| c.len() == largest) {
        let size = component.len();
        for &target in component {
            let (reached, total) = incoming_distances(graph, target);
            if total > 0 {
                let r = (reached - 1) as f64;
                scores[target] = (r / total as f64) * (r / (size - 1) as f64);
            }
        }
    }
    scores
}

/// BFS over reversed edges: (students that can reach `target` including
/// itself, sum of their distances)
fn incoming_distances(graph: &SocialGraph, target: usize) -> (usize, usize) {
    let mut dist = vec![usize::MAX; graph.node_count()];
    dist[target] = 0;
    let mut queue = VecDeque::from([target]);
    let mut reached = 0;
    let mut total = 0;

    while let Some(v) = queue.pop_front() {
        reached += 1;
        total += dist[v];
        for u in graph.in_neighbors(v) {
            if dist[u] == usize::MAX {
                dist[u] = dist[v] + 1;
                queue.push_back(u);
            }
        }
    }
    (reached, total)
}

/// Brandes betweenness on unweighted directed shortest paths
pub fn betweenness(graph: &SocialGraph) -> Vec<f64> {
    let n = graph.node_count();
    let mut centrality = vec![0.0; n];
    if n < 3 {
        return centrality;
    }

    let successors: Vec<Vec<usize>> = (0..n).map(|p| graph.out_neighbors(p).collect()).collect();

    for source in 0..n {
        let mut stack = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut dist = vec![-1i64; n];
        sigma[source] = 1.0;
        dist[source] = 0;

        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &successors[v] {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                centrality[w] += delta[w];
            }
        }
    }

    let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
    for value in centrality.iter_mut() {
        *value *= scale;
    }
    centrality
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use classnet_core::{NetworkData, RelationType, Relationship, Student};

    fn graph(n: u64, edges: &[(u64, u64)]) -> SocialGraph {
        let data = NetworkData::new(
            (0..n).map(|i| Student::new(i, format!("s{}", i))).collect(),
            edges
                .iter()
                .map(|&(a, b)| Relationship::new(a, b, RelationType::General))
                .collect(),
        );
        GraphBuilder::new().build(&data).unwrap().0
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_path_betweenness() {
        // 0 -> 1 -> 2: only 1 lies between, on one of the (2 * 1) ordered pairs
        let g = graph(3, &[(0, 1), (1, 2)]);
        let b = betweenness(&g);
        assert!(close(b[0], 0.0));
        assert!(close(b[1], 0.5));
        assert!(close(b[2], 0.0));
    }

    #[test]
    fn test_degree_normalization() {
        let g = graph(3, &[(0, 1), (0, 2), (1, 0)]);
        assert_eq!(in_degree(&g), vec![0.5, 0.5, 0.5]);
        assert_eq!(out_degree(&g), vec![1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_closeness_partial_reachability() {
        // only 0 reaches 1; Wasserman-Faust scaling gives (1/1) * (1/2)
        let g = graph(3, &[(0, 1), (1, 2)]);
        let c = closeness(&g);
        assert!(close(c[0], 0.0));
        assert!(close(c[1], 0.5));
        // 0 and 1 reach 2 at distances 2 and 1
        assert!(close(c[2], (2.0 / 3.0) * 1.0));
    }

    #[test]
    fn test_closeness_only_in_largest_component() {
        let g = graph(5, &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 3)]);
        let c = closeness(&g);
        assert!(c[..3].iter().all(|&v| v > 0.0));
        assert_eq!(&c[3..], &[0.0, 0.0]);
    }

    #[test]
    fn test_eigenvector_cycle_is_uniform() {
        let g = graph(3, &[(0, 1), (1, 2), (2, 0)]);
        let engine = CentralityEngine::default();
        let x = engine.eigenvector(&g).unwrap();
        let expected = 1.0 / 3f64.sqrt();
        assert!(x.iter().all(|&v| (v - expected).abs() < 1e-6));
    }

    #[test]
    fn test_eigenvector_non_convergence_zero_fills() {
        let g = graph(4, &[(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)]);
        let engine = CentralityEngine::new(CentralityConfig {
            eigenvector_max_iter: 1,
            eigenvector_tolerance: 1e-12,
        });
        let metrics = engine.compute(&g);
        assert!(!metrics.eigenvector_converged);
        assert_eq!(metrics.eigenvector.len(), 4);
        assert!(metrics.eigenvector.values().all(|&v| v == 0.0));
    }

    #[test]
    fn test_trivial_graphs_are_all_zero() {
        for g in [graph(1, &[]), graph(4, &[])] {
            let metrics = CentralityEngine::default().compute(&g);
            for metric in Metric::ALL {
                assert_eq!(metrics.get(metric).len(), g.node_count());
                assert!(metrics.get(metric).values().all(|&v| v == 0.0));
            }
        }
    }
}
