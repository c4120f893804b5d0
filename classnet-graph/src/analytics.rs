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

//! Derived analytics: roles, isolation, summary statistics and the textual
//! summary. Everything here reads already computed metrics and communities.

use crate::centrality::{CentralityMetrics, Metric};
use crate::graph::SocialGraph;
use crate::louvain::CommunityPartition;
use classnet_core::{AnalyticsConfig, NodeId, RelationType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Structural role of a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Leader,
    Popular,
    Bridge,
    Connector,
    Peripheral,
    Isolated,
    Regular,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Leader => "leader",
            NodeRole::Popular => "popular",
            NodeRole::Bridge => "bridge",
            NodeRole::Connector => "connector",
            NodeRole::Peripheral => "peripheral",
            NodeRole::Isolated => "isolated",
            NodeRole::Regular => "regular",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of the role decision table for one student
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleInput {
    /// In-degree divided by the graph-wide maximum
    pub in_norm: f64,
    /// Betweenness divided by the graph-wide maximum
    pub betweenness_norm: f64,
    pub in_count: usize,
    pub out_count: usize,
}

/// Decision table, first matching row wins
pub fn classify_role(input: &RoleInput, config: &AnalyticsConfig) -> NodeRole {
    let high = config.high_threshold;
    let moderate = config.moderate_threshold;
    let (i, b) = (input.in_norm, input.betweenness_norm);

    if i > high && b > high {
        NodeRole::Leader
    } else if i > high {
        NodeRole::Popular
    } else if b > high {
        NodeRole::Bridge
    } else if i > moderate && b > moderate {
        NodeRole::Connector
    } else if i <= moderate && input.out_count >= 2 {
        NodeRole::Peripheral
    } else if input.in_count == 0 && input.out_count == 0 {
        NodeRole::Isolated
    } else {
        NodeRole::Regular
    }
}

fn normalize_by_max(values: &BTreeMap<NodeId, f64>) -> BTreeMap<NodeId, f64> {
    let max = values.values().copied().fold(0.0, f64::max);
    values
        .iter()
        .map(|(&id, &v)| (id, if max > 0.0 { v / max } else { 0.0 }))
        .collect()
}

/// Role of every student
pub fn classify_roles(
    graph: &SocialGraph,
    metrics: &CentralityMetrics,
    config: &AnalyticsConfig,
) -> BTreeMap<NodeId, NodeRole> {
    let in_norm = normalize_by_max(&metrics.in_degree);
    let betweenness_norm = normalize_by_max(&metrics.betweenness);

    (0..graph.node_count())
        .map(|pos| {
            let id = graph.student_at(pos).id;
            let input = RoleInput {
                in_norm: in_norm.get(&id).copied().unwrap_or(0.0),
                betweenness_norm: betweenness_norm.get(&id).copied().unwrap_or(0.0),
                in_count: graph.in_degree_at(pos),
                out_count: graph.out_degree_at(pos),
            };
            (id, classify_role(&input, config))
        })
        .collect()
}

/// Students nobody named
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationReport {
    /// No ties in either direction
    pub isolated: Vec<NodeId>,
    /// Named others, but nobody named them
    pub peripheral: Vec<NodeId>,
}

pub fn isolation_report(graph: &SocialGraph) -> IsolationReport {
    let mut report = IsolationReport::default();
    for pos in 0..graph.node_count() {
        let id = graph.student_at(pos).id;
        match (graph.in_degree_at(pos), graph.out_degree_at(pos)) {
            (0, 0) => report.isolated.push(id),
            (0, _) => report.peripheral.push(id),
            _ => {}
        }
    }
    report
}

/// Students whose normalized in-degree is at most `threshold` times the
/// maximum
pub fn low_in_degree_nodes(metrics: &CentralityMetrics, threshold: f64) -> Vec<NodeId> {
    let max = metrics.in_degree.values().copied().fold(0.0, f64::max);
    let cutoff = max * threshold;
    metrics
        .in_degree
        .iter()
        .filter(|(_, &v)| v <= cutoff)
        .map(|(&id, _)| id)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub max: f64,
    /// Student with the highest score, smallest id on ties
    pub max_node: Option<NodeId>,
}

impl MetricSummary {
    pub fn from_values(values: &BTreeMap<NodeId, f64>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.values().sum::<f64>() / n;
        let variance = values.values().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        // BTreeMap iterates ascending, so strict > keeps the smallest id
        let mut max_node = None;
        let mut max = f64::NEG_INFINITY;
        for (&id, &v) in values {
            if v > max {
                max = v;
                max_node = Some(id);
            }
        }

        Self {
            mean,
            std: variance.sqrt(),
            max,
            max_node,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub count: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub mean_size: f64,
    pub modularity: f64,
}

impl CommunitySummary {
    pub fn from_partition(partition: &CommunityPartition) -> Self {
        let sizes = partition.sizes();
        if sizes.is_empty() {
            return Self::default();
        }
        Self {
            count: sizes.len(),
            min_size: sizes.iter().copied().min().unwrap_or(0),
            max_size: sizes.iter().copied().max().unwrap_or(0),
            mean_size: sizes.iter().sum::<usize>() as f64 / sizes.len() as f64,
            modularity: partition.modularity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub node_count: usize,
    /// Distinct directed pairs
    pub edge_count: usize,
    /// Typed relations, parallel types counted separately
    pub relation_count: usize,
    pub density: f64,
    pub is_weakly_connected: bool,
    pub component_count: usize,
    pub average_clustering: f64,
    pub metrics: BTreeMap<Metric, MetricSummary>,
    pub communities: CommunitySummary,
    pub relation_types: BTreeMap<RelationType, usize>,
}

impl SummaryStatistics {
    pub fn compute(
        graph: &SocialGraph,
        metrics: &CentralityMetrics,
        partition: &CommunityPartition,
    ) -> Self {
        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            relation_count: graph.relation_count(),
            density: graph.density(),
            is_weakly_connected: graph.is_weakly_connected(),
            component_count: graph.weakly_connected_components().len(),
            average_clustering: graph.average_clustering(),
            metrics: Metric::ALL
                .iter()
                .map(|&m| (m, MetricSummary::from_values(metrics.get(m))))
                .collect(),
            communities: CommunitySummary::from_partition(partition),
            relation_types: graph.relation_type_distribution(),
        }
    }
}

/// Per-student row joining every computed attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub id: NodeId,
    pub name: String,
    pub label: String,
    pub group: Option<u32>,
    pub in_degree: f64,
    pub out_degree: f64,
    pub closeness: f64,
    pub betweenness: f64,
    pub eigenvector: f64,
    pub role: NodeRole,
}

pub fn node_attributes(
    graph: &SocialGraph,
    metrics: &CentralityMetrics,
    partition: &CommunityPartition,
    roles: &BTreeMap<NodeId, NodeRole>,
) -> Vec<NodeAttributes> {
    graph
        .students()
        .map(|s| NodeAttributes {
            id: s.id,
            name: s.name.clone(),
            label: s.label.clone(),
            group: partition.community_of(s.id),
            in_degree: metrics.value(Metric::InDegree, s.id),
            out_degree: metrics.value(Metric::OutDegree, s.id),
            closeness: metrics.value(Metric::Closeness, s.id),
            betweenness: metrics.value(Metric::Betweenness, s.id),
            eigenvector: metrics.value(Metric::Eigenvector, s.id),
            role: roles.get(&s.id).copied().unwrap_or(NodeRole::Regular),
        })
        .collect()
}

/// Top `n` students by a metric, highest first, ties by id
pub fn top_nodes(metrics: &CentralityMetrics, metric: Metric, n: usize) -> Vec<(NodeId, f64)> {
    let mut ranked: Vec<(NodeId, f64)> = metrics.get(metric).iter().map(|(&id, &v)| (id, v)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

/// Plain-language sentences describing the network
pub fn text_summary(
    graph: &SocialGraph,
    metrics: &CentralityMetrics,
    stats: &SummaryStatistics,
    isolation: &IsolationReport,
    top_n: usize,
) -> Vec<String> {
    let label = |id: NodeId| {
        graph
            .student(id)
            .map(|s| s.label.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let names = |ids: &[NodeId]| ids.iter().map(|&id| label(id)).collect::<Vec<_>>().join(", ");

    let mut lines = vec![format!(
        "The network has {} students and {} directed relationships (density {:.3}).",
        stats.node_count, stats.edge_count, stats.density
    )];

    if stats.is_weakly_connected {
        lines.push("Every student is connected to the rest of the class.".to_string());
    } else {
        lines.push(format!(
            "The class splits into {} disconnected groups.",
            stats.component_count
        ));
    }

    if stats.edge_count > 0 {
        for metric in [Metric::InDegree, Metric::Betweenness, Metric::Eigenvector] {
            let top: Vec<NodeId> = top_nodes(metrics, metric, top_n)
                .into_iter()
                .filter(|&(_, v)| v > 0.0)
                .map(|(id, _)| id)
                .collect();
            if !top.is_empty() {
                lines.push(format!(
                    "Highest {} centrality: {}.",
                    metric.display_name(),
                    names(&top)
                ));
            }
        }
    }

    lines.push(format!(
        "Community detection found {} communities (modularity {:.3}).",
        stats.communities.count, stats.communities.modularity
    ));

    if !isolation.isolated.is_empty() {
        lines.push(format!(
            "Isolated students (no ties at all): {}.",
            names(&isolation.isolated)
        ));
    }
    if !isolation.peripheral.is_empty() {
        lines.push(format!(
            "Peripheral students (named others but were not named): {}.",
            names(&isolation.peripheral)
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centrality::CentralityEngine;
    use crate::graph::GraphBuilder;
    use crate::louvain::LouvainClustering;
    use classnet_core::{NetworkData, Relationship, Student};

    fn graph(n: u64, edges: &[(u64, u64)]) -> SocialGraph {
        let data = NetworkData::new(
            (0..n).map(|i| Student::new(i, format!("s{}", i))).collect(),
            edges
                .iter()
                .map(|&(a, b)| Relationship::new(a, b, RelationType::Friendship))
                .collect(),
        );
        GraphBuilder::new().build(&data).unwrap().0
    }

    fn input(in_norm: f64, betweenness_norm: f64, in_count: usize, out_count: usize) -> RoleInput {
        RoleInput {
            in_norm,
            betweenness_norm,
            in_count,
            out_count,
        }
    }

    #[test]
    fn test_role_decision_table() {
        let config = AnalyticsConfig::default();
        let cases = [
            (input(0.8, 0.9, 4, 1), NodeRole::Leader),
            (input(0.8, 0.7, 4, 1), NodeRole::Popular),
            (input(0.7, 0.8, 3, 1), NodeRole::Bridge),
            (input(0.5, 0.4, 2, 1), NodeRole::Connector),
            (input(0.2, 0.0, 1, 3), NodeRole::Peripheral),
            (input(0.0, 0.0, 0, 0), NodeRole::Isolated),
            (input(0.2, 0.0, 1, 1), NodeRole::Regular),
            (input(0.5, 0.1, 2, 5), NodeRole::Regular),
        ];
        for (case, expected) in cases {
            assert_eq!(classify_role(&case, &config), expected, "{:?}", case);
        }
    }

    #[test]
    fn test_isolated_is_not_peripheral() {
        let g = graph(4, &[(0, 1), (2, 1)]);
        let report = isolation_report(&g);
        assert_eq!(report.isolated, vec![3]);
        assert_eq!(report.peripheral, vec![0, 2]);
    }

    #[test]
    fn test_low_in_degree_threshold() {
        let g = graph(4, &[(0, 1), (2, 1), (3, 1), (1, 0)]);
        let metrics = CentralityEngine::default().compute(&g);
        assert_eq!(low_in_degree_nodes(&metrics, 0.1), vec![2, 3]);
        assert_eq!(low_in_degree_nodes(&metrics, 0.4), vec![0, 2, 3]);
    }

    #[test]
    fn test_metric_summary_population_std_and_ties() {
        let values: BTreeMap<NodeId, f64> = [(3, 1.0), (1, 1.0), (2, 0.0), (4, 0.0)].into();
        let summary = MetricSummary::from_values(&values);
        assert_eq!(summary.mean, 0.5);
        assert_eq!(summary.std, 0.5);
        assert_eq!(summary.max, 1.0);
        assert_eq!(summary.max_node, Some(1));
    }

    #[test]
    fn test_summary_statistics_and_text() {
        let g = graph(4, &[(0, 1), (1, 0), (1, 2), (2, 1)]);
        let metrics = CentralityEngine::default().compute(&g);
        let partition = LouvainClustering::default().detect(&g);
        let stats = SummaryStatistics::compute(&g, &metrics, &partition);

        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 4);
        assert!((stats.density - 4.0 / 12.0).abs() < 1e-12);
        assert!(!stats.is_weakly_connected);
        assert_eq!(stats.component_count, 2);
        assert_eq!(stats.metrics[&Metric::InDegree].max_node, Some(1));
        assert_eq!(stats.relation_types[&RelationType::Friendship], 4);

        let isolation = isolation_report(&g);
        let lines = text_summary(&g, &metrics, &stats, &isolation, 2);
        assert!(lines[0].contains("4 students"));
        assert!(lines.iter().any(|l| l.contains("Isolated students") && l.contains("s3")));
    }

    #[test]
    fn test_node_attributes_cover_every_student() {
        let g = graph(3, &[(0, 1), (1, 2)]);
        let metrics = CentralityEngine::default().compute(&g);
        let partition = LouvainClustering::default().detect(&g);
        let roles = classify_roles(&g, &metrics, &AnalyticsConfig::default());
        let rows = node_attributes(&g, &metrics, &partition, &roles);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.group.is_some()));
        assert_eq!(rows[1].betweenness, 0.5);
        assert_eq!(rows[1].role, NodeRole::Leader);
        assert_eq!(rows[0].role, NodeRole::Regular);
    }
}
