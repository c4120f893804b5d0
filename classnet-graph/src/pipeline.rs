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

//! Analysis Pipeline
//!
//! One run: source -> table -> column roles -> annotation -> edges ->
//! graph -> metrics and communities -> `AnalysisResult`.
//!
//! An unreachable or unreadable source degrades to a synthetic network
//! when `extraction.synthetic_fallback` is on; the result is then tagged
//! synthetic and says why in its warnings.

use crate::analytics::{IsolationReport, NodeAttributes, SummaryStatistics};
use crate::analyzer::NetworkAnalyzer;
use crate::annotate::{KeywordInference, RoleInference};
use crate::centrality::CentralityMetrics;
use crate::extractor::RelationshipExtractor;
use crate::graph::BuildReport;
use crate::roles::{detect_roles, ColumnRoles, RoleHints};
use crate::source::SurveySource;
use crate::synthetic::SyntheticGenerator;
use crate::table::SurveyTable;
use chrono::{DateTime, Utc};
use classnet_core::{
    AnalysisConfig, Annotation, ClassnetError, Community, NetworkData, NodeId, Provenance,
    Relationship, Result, Student,
};
use serde::Serialize;
use tracing::{info, warn};

/// Rows of the table shown to the annotator
const SAMPLE_ROWS: usize = 5;

/// Everything the report side needs, as plain data
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub generated_at: DateTime<Utc>,
    pub provenance: Provenance,
    pub roles: Option<ColumnRoles>,
    pub annotation: Option<Annotation>,
    pub nodes: Vec<Student>,
    pub edges: Vec<Relationship>,
    pub metrics: CentralityMetrics,
    pub communities: Vec<Community>,
    pub summary: SummaryStatistics,
    pub isolation: IsolationReport,
    pub low_in_degree: Vec<NodeId>,
    pub node_attributes: Vec<NodeAttributes>,
    pub text_summary: Vec<String>,
    pub build_report: BuildReport,
}

impl AnalysisResult {
    pub fn is_synthetic(&self) -> bool {
        self.provenance.synthetic
    }
}

pub struct AnalysisPipeline<I: RoleInference = KeywordInference> {
    config: AnalysisConfig,
    inference: I,
    hints: RoleHints,
}

impl AnalysisPipeline<KeywordInference> {
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_inference(config, KeywordInference)
    }
}

impl<I: RoleInference> AnalysisPipeline<I> {
    pub fn with_inference(config: AnalysisConfig, inference: I) -> Self {
        Self {
            config,
            inference,
            hints: RoleHints::default(),
        }
    }

    /// Fix column roles instead of detecting them
    pub fn with_hints(mut self, hints: RoleHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load `source` and analyse it
    pub fn run(&self, source: &SurveySource) -> Result<AnalysisResult> {
        match source.load(&self.config.fetch) {
            Ok(table) => self.run_table(&table, Some(source.to_string())),
            Err(e @ (ClassnetError::Fetch { .. } | ClassnetError::Io(_)))
                if self.config.extraction.synthetic_fallback =>
            {
                warn!(source = %source, "Survey unavailable, using synthetic data: {}", e);
                let mut result = self.run_synthetic()?;
                result.provenance.source = Some(source.to_string());
                result
                    .provenance
                    .warn(format!("survey source unavailable ({}); synthetic data shown", e));
                Ok(result)
            }
            Err(e) => Err(e),
        }
    }

    /// Analyse an already loaded table
    pub fn run_table(&self, table: &SurveyTable, source: Option<String>) -> Result<AnalysisResult> {
        let roles = detect_roles(table, &self.hints)?;
        let inference = self
            .inference
            .infer_roles(&table.sample(SAMPLE_ROWS), &roles);

        let outcome = RelationshipExtractor::new(&self.config.extraction).extract(
            table,
            &roles,
            &inference.annotation,
        )?;

        let mut network = outcome.network;
        network.provenance = Provenance::survey(source);
        if let Some(reason) = &inference.fallback_reason {
            network
                .provenance
                .warn(format!("annotation service unavailable ({}); keyword types used", reason));
        }
        if !outcome.skipped_rows.is_empty() {
            network.provenance.warn(format!(
                "{} row(s) without a respondent were skipped",
                outcome.skipped_rows.len()
            ));
        }
        if outcome.dropped_targets > 0 {
            network.provenance.warn(format!(
                "{} answer(s) named nobody in the class and were dropped",
                outcome.dropped_targets
            ));
        }

        let mut result = self.analyze(network)?;
        result.roles = Some(roles);
        result.annotation = Some(inference.annotation);
        Ok(result)
    }

    /// Analyse a generated network of `synthetic.nodes` placeholder students
    pub fn run_synthetic(&self) -> Result<AnalysisResult> {
        let names = SyntheticGenerator::roster(self.config.synthetic.nodes);
        let network = SyntheticGenerator::new(self.config.synthetic.seed).generate(&names);
        self.analyze(network)
    }

    /// Build, measure and summarise extracted network data
    pub fn analyze(&self, network: NetworkData) -> Result<AnalysisResult> {
        if network.nodes.is_empty() {
            return Err(ClassnetError::NoUsableData);
        }

        let analyzer = NetworkAnalyzer::new(&network, self.config.clone())?;
        let mut provenance = network.provenance.clone();

        let report = analyzer.build_report().clone();
        if !report.skipped.is_empty() {
            provenance.warn(format!(
                "{} relationship(s) referenced unknown students and were skipped",
                report.skipped.len()
            ));
        }
        if !analyzer.metrics().eigenvector_converged {
            provenance.warn("eigenvector centrality did not converge; reported as 0");
        }

        let result = AnalysisResult {
            generated_at: Utc::now(),
            roles: None,
            annotation: None,
            nodes: analyzer.students(),
            edges: analyzer.graph().relationships(),
            metrics: analyzer.metrics().clone(),
            communities: analyzer.communities().communities.clone(),
            summary: analyzer.summary().clone(),
            isolation: analyzer.isolation(),
            low_in_degree: analyzer.low_in_degree(),
            node_attributes: analyzer.node_attributes(),
            text_summary: analyzer.text_summary(),
            build_report: report,
            provenance,
        };

        info!(
            nodes = result.summary.node_count,
            edges = result.summary.edge_count,
            communities = result.summary.communities.count,
            synthetic = result.is_synthetic(),
            "Analysis complete"
        );
        Ok(result)
    }
}
