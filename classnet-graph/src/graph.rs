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

//! Social Graph
//!
//! Directed student graph built from extracted network data.
//! - Typed relations are kept per ordered pair for reporting
//! - Algorithms see a single directed edge per pair, weighted by the sum
//!   of its typed weights
//! - Node positions `0..n` follow the input node order and are the indices
//!   the analysis modules work with

use classnet_core::{ClassnetError, NetworkData, NodeId, RelationType, Relationship, Result, Student};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// Which end of a relationship did not resolve to a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingEndpoint {
    From,
    To,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub missing: MissingEndpoint,
}

/// Non-fatal problems met while building
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub skipped: Vec<SkippedEdge>,
    pub self_loops: usize,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.self_loops == 0
    }
}

/// Builds a [`SocialGraph`] from network data
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Fails only on an empty or malformed node list; bad edges are skipped
    /// and reported.
    pub fn build(&self, data: &NetworkData) -> Result<(SocialGraph, BuildReport)> {
        if data.nodes.is_empty() {
            return Err(ClassnetError::GraphConstruction(
                "node list is empty".to_string(),
            ));
        }

        let mut graph: DiGraph<Student, u32> = DiGraph::with_capacity(data.nodes.len(), 0);
        let mut index: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(data.nodes.len());

        for student in &data.nodes {
            if index.contains_key(&student.id) {
                return Err(ClassnetError::GraphConstruction(format!(
                    "duplicate node id {}",
                    student.id
                )));
            }
            let mut student = student.clone();
            if student.label.trim().is_empty() {
                student.label = if student.name.trim().is_empty() {
                    student.id.to_string()
                } else {
                    student.name.clone()
                };
            }
            let id = student.id;
            index.insert(id, graph.add_node(student));
        }

        let mut report = BuildReport::default();
        let mut relations: BTreeMap<(NodeId, NodeId), BTreeMap<RelationType, u32>> =
            BTreeMap::new();

        for edge in &data.edges {
            let missing = match (index.contains_key(&edge.from), index.contains_key(&edge.to)) {
                (true, true) => None,
                (false, true) => Some(MissingEndpoint::From),
                (true, false) => Some(MissingEndpoint::To),
                (false, false) => Some(MissingEndpoint::Both),
            };
            if let Some(missing) = missing {
                warn!(from = edge.from, to = edge.to, ?missing, "Skipping edge with unknown endpoint");
                report.skipped.push(SkippedEdge {
                    from: edge.from,
                    to: edge.to,
                    missing,
                });
                continue;
            }
            if edge.is_self_loop() {
                debug!(node = edge.from, "Skipping self loop");
                report.self_loops += 1;
                continue;
            }
            let weight = relations
                .entry((edge.from, edge.to))
                .or_default()
                .entry(edge.relation_type.clone())
                .or_insert(0);
            *weight = weight.saturating_add(edge.weight.max(1));
        }

        for (&(from, to), typed) in &relations {
            let total = typed.values().fold(0u32, |acc, w| acc.saturating_add(*w));
            graph.add_edge(index[&from], index[&to], total);
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            skipped = report.skipped.len(),
            "Built social graph"
        );

        Ok((
            SocialGraph {
                graph,
                index,
                relations,
            },
            report,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct SocialGraph {
    graph: DiGraph<Student, u32>,
    index: HashMap<NodeId, NodeIndex>,
    relations: BTreeMap<(NodeId, NodeId), BTreeMap<RelationType, u32>>,
}

impl SocialGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Distinct directed pairs
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Typed relations, counting parallel types separately
    pub fn relation_count(&self) -> usize {
        self.relations.values().map(|t| t.len()).sum()
    }

    pub fn students(&self) -> impl Iterator<Item = &Student> + '_ {
        self.graph.node_weights()
    }

    pub fn student(&self, id: NodeId) -> Option<&Student> {
        self.index.get(&id).map(|&ix| &self.graph[ix])
    }

    /// Student at position `pos` in the input order
    pub fn student_at(&self, pos: usize) -> &Student {
        &self.graph[NodeIndex::new(pos)]
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.students().map(|s| s.id).collect()
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).map(|ix| ix.index())
    }

    pub fn out_neighbors(&self, pos: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors_directed(NodeIndex::new(pos), Direction::Outgoing)
            .map(|ix| ix.index())
    }

    pub fn in_neighbors(&self, pos: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors_directed(NodeIndex::new(pos), Direction::Incoming)
            .map(|ix| ix.index())
    }

    /// Number of distinct students pointing at `pos`
    pub fn in_degree_at(&self, pos: usize) -> usize {
        self.graph
            .edges_directed(NodeIndex::new(pos), Direction::Incoming)
            .count()
    }

    pub fn out_degree_at(&self, pos: usize) -> usize {
        self.graph
            .edges_directed(NodeIndex::new(pos), Direction::Outgoing)
            .count()
    }

    pub fn in_degree(&self, id: NodeId) -> Option<usize> {
        self.position(id).map(|p| self.in_degree_at(p))
    }

    pub fn out_degree(&self, id: NodeId) -> Option<usize> {
        self.position(id).map(|p| self.out_degree_at(p))
    }

    /// Summed weight of the directed edge `from -> to`
    pub fn weight(&self, from: NodeId, to: NodeId) -> Option<u32> {
        let a = *self.index.get(&from)?;
        let b = *self.index.get(&to)?;
        self.graph.find_edge(a, b).map(|e| self.graph[e])
    }

    pub fn relations_between(&self, from: NodeId, to: NodeId) -> Option<&BTreeMap<RelationType, u32>> {
        self.relations.get(&(from, to))
    }

    /// Typed relations flattened back into edge records
    pub fn relationships(&self) -> Vec<Relationship> {
        self.relations
            .iter()
            .flat_map(|(&(from, to), typed)| {
                typed.iter().map(move |(relation_type, &weight)| {
                    Relationship::new(from, to, relation_type.clone()).with_weight(weight)
                })
            })
            .collect()
    }

    /// Typed relation counts per category
    pub fn relation_type_distribution(&self) -> BTreeMap<RelationType, usize> {
        let mut distribution = BTreeMap::new();
        for typed in self.relations.values() {
            for relation_type in typed.keys() {
                *distribution.entry(relation_type.clone()).or_insert(0) += 1;
            }
        }
        distribution
    }

    /// Weakly connected components as sorted position lists, ordered by
    /// their smallest position
    pub fn weakly_connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.node_count();
        let mut sets = UnionFind::<usize>::new(n);
        for edge in self.graph.edge_references() {
            sets.union(edge.source().index(), edge.target().index());
        }

        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut order: Vec<usize> = Vec::new();
        for pos in 0..n {
            let root = sets.find(pos);
            let members = by_root.entry(root).or_insert_with(|| {
                order.push(root);
                Vec::new()
            });
            members.push(pos);
        }
        order
            .into_iter()
            .filter_map(|root| by_root.remove(&root))
            .collect()
    }

    pub fn is_weakly_connected(&self) -> bool {
        self.weakly_connected_components().len() <= 1
    }

    /// Undirected projection: one entry per neighbour, weight summed over
    /// both directions
    pub fn undirected_adjacency(&self) -> Vec<BTreeMap<usize, f64>> {
        let mut adjacency = vec![BTreeMap::new(); self.node_count()];
        for edge in self.graph.edge_references() {
            let (a, b) = (edge.source().index(), edge.target().index());
            let w = f64::from(*edge.weight());
            *adjacency[a].entry(b).or_insert(0.0) += w;
            *adjacency[b].entry(a).or_insert(0.0) += w;
        }
        adjacency
    }

    /// Mean local clustering coefficient of the unweighted undirected
    /// projection; nodes with fewer than two neighbours count as 0
    pub fn average_clustering(&self) -> f64 {
        let n = self.node_count();
        if n == 0 {
            return 0.0;
        }
        let neighbours: Vec<HashSet<usize>> = self
            .undirected_adjacency()
            .into_iter()
            .map(|m| m.into_keys().collect())
            .collect();

        let total: f64 = neighbours
            .iter()
            .map(|adj| {
                let k = adj.len();
                if k < 2 {
                    return 0.0;
                }
                let members: Vec<usize> = adj.iter().copied().collect();
                let mut links = 0usize;
                for (i, &u) in members.iter().enumerate() {
                    for &v in &members[i + 1..] {
                        if neighbours[u].contains(&v) {
                            links += 1;
                        }
                    }
                }
                (2 * links) as f64 / (k * (k - 1)) as f64
            })
            .sum();
        total / n as f64
    }

    /// Density `E / (N (N - 1))` over distinct directed pairs
    pub fn density(&self) -> f64 {
        let n = self.node_count();
        if n < 2 {
            return 0.0;
        }
        self.edge_count() as f64 / (n * (n - 1)) as f64
    }

    /// Write community ids into the students
    pub fn assign_groups(&mut self, assignment: &BTreeMap<NodeId, u32>) {
        for student in self.graph.node_weights_mut() {
            student.group = assignment.get(&student.id).copied();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn network(n: u64, edges: &[(u64, u64)]) -> NetworkData {
        NetworkData::new(
            (0..n).map(|i| Student::new(i, format!("s{}", i))).collect(),
            edges
                .iter()
                .map(|&(a, b)| Relationship::new(a, b, RelationType::Friendship))
                .collect(),
        )
    }

    #[test]
    fn test_build_skips_dangling_and_self_loops() {
        let mut data = network(2, &[(0, 1), (0, 5), (7, 8), (1, 1)]);
        data.edges.push(Relationship::new(0, 1, RelationType::Study).with_weight(2));

        let (graph, report) = GraphBuilder::new().build(&data).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.relation_count(), 2);
        assert_eq!(graph.weight(0, 1), Some(3));
        assert_eq!(report.self_loops, 1);
        assert_eq!(
            report.skipped,
            vec![
                SkippedEdge { from: 0, to: 5, missing: MissingEndpoint::To },
                SkippedEdge { from: 7, to: 8, missing: MissingEndpoint::Both },
            ]
        );
    }

    #[test]
    fn test_empty_and_duplicate_nodes_fail() {
        assert!(matches!(
            GraphBuilder::new().build(&NetworkData::default()),
            Err(ClassnetError::GraphConstruction(_))
        ));

        let mut data = network(2, &[]);
        data.nodes.push(Student::new(1, "again"));
        assert!(matches!(
            GraphBuilder::new().build(&data),
            Err(ClassnetError::GraphConstruction(_))
        ));
    }

    #[test]
    fn test_blank_label_uses_id() {
        let mut data = network(1, &[]);
        data.nodes[0] = Student::new(0, "").with_label("");
        let (graph, _) = GraphBuilder::new().build(&data).unwrap();
        assert_eq!(graph.student(0).unwrap().label, "0");
    }

    #[test]
    fn test_components_and_clustering() {
        let data = network(7, &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)]);
        let (graph, _) = GraphBuilder::new().build(&data).unwrap();
        assert_eq!(
            graph.weakly_connected_components(),
            vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]
        );
        assert!(!graph.is_weakly_connected());
        // six nodes in triangles, one isolated
        assert!((graph.average_clustering() - 6.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_undirected_projection_sums_directions() {
        let data = network(2, &[(0, 1), (1, 0)]);
        let (graph, _) = GraphBuilder::new().build(&data).unwrap();
        let adjacency = graph.undirected_adjacency();
        assert_eq!(adjacency[0].get(&1), Some(&2.0));
        assert_eq!(adjacency[1].get(&0), Some(&2.0));
    }

    proptest! {
        #[test]
        fn prop_degree_sums_match_edge_count(
            n in 1u64..12,
            raw in prop::collection::vec((0u64..14, 0u64..14), 0..40),
        ) {
            let (graph, _) = GraphBuilder::new().build(&network(n, &raw)).unwrap();
            let total_in: usize = (0..graph.node_count()).map(|p| graph.in_degree_at(p)).sum();
            let total_out: usize = (0..graph.node_count()).map(|p| graph.out_degree_at(p)).sum();
            prop_assert_eq!(total_in, graph.edge_count());
            prop_assert_eq!(total_out, graph.edge_count());
        }
    }
}
