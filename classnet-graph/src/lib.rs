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

//! Classnet Graph
//!
//! Classroom relationship-survey analysis:
//! - Survey table ingestion and column-role detection
//! - Relationship question annotation (keyword or external service)
//! - Edge extraction with duplicate merging, synthetic fallback
//! - Directed social graph, five centrality measures
//! - Louvain communities over the undirected projection
//! - Roles, isolation, summary statistics and textual summaries

pub mod analytics;
pub mod analyzer;
pub mod annotate;
pub mod centrality;
pub mod extractor;
pub mod graph;
pub mod louvain;
pub mod pipeline;
pub mod roles;
pub mod source;
pub mod synthetic;
pub mod table;

pub use analytics::{
    classify_role, IsolationReport, MetricSummary, NodeAttributes, NodeRole, RoleInput,
    SummaryStatistics,
};
pub use analyzer::NetworkAnalyzer;
pub use annotate::{AiRoleInference, CompletionClient, Inference, KeywordInference, RoleInference};
pub use centrality::{CentralityEngine, CentralityMetrics, Metric};
pub use extractor::{ExtractionOutcome, RelationshipExtractor, SkipReason, SkippedRow};
pub use graph::{BuildReport, GraphBuilder, MissingEndpoint, SkippedEdge, SocialGraph};
pub use louvain::{CommunityPartition, LouvainClustering};
pub use pipeline::{AnalysisPipeline, AnalysisResult};
pub use roles::{detect_roles, ColumnRoles, RoleDetection, RoleHints};
pub use source::SurveySource;
pub use synthetic::SyntheticGenerator;
pub use table::SurveyTable;
