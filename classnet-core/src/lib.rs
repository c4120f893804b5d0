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

//! Shared types for classroom relationship network analysis.

pub mod config;
pub mod error;
pub mod model;
pub mod resilience;

pub use config::{
    AnalysisConfig, AnalyticsConfig, CentralityConfig, CommunityConfig, ExtractionConfig,
    FetchConfig, SyntheticConfig,
};
pub use error::{ClassnetError, Result};
pub use model::{
    Annotation, Community, NetworkData, NodeId, Origin, Provenance, RelationType, Relationship,
    Student,
};
pub use resilience::{RetryExhausted, RetryPolicy};
