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

//! Network Analyzer
//!
//! Owns one built graph and lazily computes metrics, communities and the
//! derived analytics on first use. Results stay cached for the lifetime of
//! the analyzer; a new dataset means a new analyzer.

use crate::analytics::{self, IsolationReport, NodeAttributes, NodeRole, SummaryStatistics};
use crate::centrality::{CentralityEngine, CentralityMetrics};
use crate::graph::{BuildReport, GraphBuilder, SocialGraph};
use crate::louvain::{CommunityPartition, LouvainClustering};
use classnet_core::{AnalysisConfig, NetworkData, NodeId, Result, Student};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub struct NetworkAnalyzer {
    graph: SocialGraph,
    build_report: BuildReport,
    config: AnalysisConfig,
    metrics: OnceCell<CentralityMetrics>,
    partition: OnceCell<CommunityPartition>,
    roles: OnceCell<BTreeMap<NodeId, NodeRole>>,
    summary: OnceCell<SummaryStatistics>,
}

impl NetworkAnalyzer {
    /// Build the graph for `data`
    pub fn new(data: &NetworkData, config: AnalysisConfig) -> Result<Self> {
        let (graph, build_report) = GraphBuilder::new().build(data)?;
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            skipped_edges = build_report.skipped.len(),
            "Network analyzer ready"
        );
        Ok(Self {
            graph,
            build_report,
            config,
            metrics: OnceCell::new(),
            partition: OnceCell::new(),
            roles: OnceCell::new(),
            summary: OnceCell::new(),
        })
    }

    pub fn graph(&self) -> &SocialGraph {
        &self.graph
    }

    pub fn build_report(&self) -> &BuildReport {
        &self.build_report
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// All five centrality measures, computed once
    pub fn metrics(&self) -> &CentralityMetrics {
        self.metrics.get_or_init(|| {
            debug!("Computing centrality metrics");
            CentralityEngine::new(self.config.centrality.clone()).compute(&self.graph)
        })
    }

    /// Drop every cached result so the next access recomputes it
    pub fn invalidate(&mut self) {
        self.metrics.take();
        self.partition.take();
        self.roles.take();
        self.summary.take();
    }

    pub fn communities(&self) -> &CommunityPartition {
        self.partition.get_or_init(|| {
            debug!("Detecting communities");
            LouvainClustering::with_config(self.config.community.clone()).detect(&self.graph)
        })
    }

    pub fn roles(&self) -> &BTreeMap<NodeId, NodeRole> {
        self.roles.get_or_init(|| {
            analytics::classify_roles(&self.graph, self.metrics(), &self.config.analytics)
        })
    }

    pub fn summary(&self) -> &SummaryStatistics {
        self.summary.get_or_init(|| {
            SummaryStatistics::compute(&self.graph, self.metrics(), self.communities())
        })
    }

    pub fn isolation(&self) -> IsolationReport {
        analytics::isolation_report(&self.graph)
    }

    /// Students at or below the configured fraction of the top in-degree
    pub fn low_in_degree(&self) -> Vec<NodeId> {
        analytics::low_in_degree_nodes(self.metrics(), self.config.analytics.isolation_threshold)
    }

    pub fn text_summary(&self) -> Vec<String> {
        analytics::text_summary(
            &self.graph,
            self.metrics(),
            self.summary(),
            &self.isolation(),
            self.config.analytics.top_n,
        )
    }

    pub fn node_attributes(&self) -> Vec<NodeAttributes> {
        analytics::node_attributes(&self.graph, self.metrics(), self.communities(), self.roles())
    }

    /// Students with their community written into `group`
    pub fn students(&self) -> Vec<Student> {
        let mut graph = self.graph.clone();
        graph.assign_groups(&self.communities().assignment);
        graph.students().cloned().collect()
    }
}
