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

//! Student and Relationship Types
//!
//! Defines the value types exchanged between the extractor, the graph
//! builder and the reporting side.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A unique identifier for students in the network
pub type NodeId = u64;

/// A surveyed student (graph vertex)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Unique identifier
    pub id: NodeId,
    /// Name as written in the survey (not necessarily unique)
    pub name: String,
    /// Display label
    pub label: String,
    /// Community assigned after detection
    #[serde(default)]
    pub group: Option<u32>,
}

impl Student {
    /// Create a student whose label is its name, or the id when the name is blank
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        let name = name.into();
        let label = if name.trim().is_empty() {
            id.to_string()
        } else {
            name.clone()
        };
        Self {
            id,
            name,
            label,
            group: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Relationship categories, derived from the survey question
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationType {
    /// "Who are your friends?"
    Friendship,
    /// "Who do you want to study with?"
    Study,
    /// "Who do you want to do a project with?"
    Collaboration,
    /// "Who would you ask for help?"
    Help,
    /// Any other relationship question
    General,
    /// A category named by an external annotator
    Custom(String),
}

impl RelationType {
    /// Types the synthetic generator draws from
    pub const SYNTHETIC: [RelationType; 4] = [
        RelationType::Friendship,
        RelationType::Study,
        RelationType::Collaboration,
        RelationType::Help,
    ];

    /// Keyword match against a question/column header.
    ///
    /// Activity keywords win over "friend" because questions such as
    /// "friend you want to study with" name both.
    pub fn from_column(column: &str) -> Self {
        let lowered = column.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| lowered.contains(k));

        if has(&["collaborat", "project", "teamwork", "프로젝트", "협업"]) {
            RelationType::Collaboration
        } else if has(&["study", "academic", "공부", "학습"]) {
            RelationType::Study
        } else if has(&["help", "support", "도움"]) {
            RelationType::Help
        } else if has(&["friend", "친구"]) {
            RelationType::Friendship
        } else {
            RelationType::General
        }
    }

    /// Parse a category name as returned by an annotator
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "friendship" | "friend" | "friends" => RelationType::Friendship,
            "study" | "academic" | "studying" => RelationType::Study,
            "collaboration" | "collaborate" | "project" | "teamwork" => {
                RelationType::Collaboration
            }
            "help" | "support" | "help_seeking" => RelationType::Help,
            "general" | "" | "other" => RelationType::General,
            other => RelationType::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RelationType::Friendship => "friendship",
            RelationType::Study => "study",
            RelationType::Collaboration => "collaboration",
            RelationType::Help => "help",
            RelationType::General => "general",
            RelationType::Custom(name) => name,
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RelationType {
    fn from(s: String) -> Self {
        RelationType::parse(&s)
    }
}

impl From<RelationType> for String {
    fn from(t: RelationType) -> Self {
        t.as_str().to_string()
    }
}

/// A directed, typed, weighted relationship between two students
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    /// Number of merged mentions (always >= 1)
    pub weight: u32,
}

impl Relationship {
    pub fn new(from: NodeId, to: NodeId, relation_type: RelationType) -> Self {
        Self {
            from,
            to,
            relation_type,
            weight: 1,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight.max(1);
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

/// A group of students found by community detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: u32,
    pub members: BTreeSet<NodeId>,
}

impl Community {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Where a network came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Extracted from real survey answers
    Survey,
    /// Fabricated by the synthetic generator
    Synthetic,
}

/// Metadata carried alongside every network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub origin: Origin,
    /// True whenever any part of the data was fabricated
    pub synthetic: bool,
    /// File path or URL the data was read from
    pub source: Option<String>,
    /// Fallbacks and dropped data, in the order they happened
    pub warnings: Vec<String>,
}

impl Provenance {
    pub fn survey(source: Option<String>) -> Self {
        Self {
            origin: Origin::Survey,
            synthetic: false,
            source,
            warnings: Vec::new(),
        }
    }

    pub fn synthetic() -> Self {
        Self {
            origin: Origin::Synthetic,
            synthetic: true,
            source: None,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Self::survey(None)
    }
}

/// Nodes and edges handed from extraction to the graph builder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkData {
    pub nodes: Vec<Student>,
    pub edges: Vec<Relationship>,
    /// Relationship type assigned to each question column
    #[serde(default)]
    pub question_types: BTreeMap<String, RelationType>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl NetworkData {
    pub fn new(nodes: Vec<Student>, edges: Vec<Relationship>) -> Self {
        Self {
            nodes,
            edges,
            question_types: BTreeMap::new(),
            provenance: Provenance::default(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.provenance.synthetic
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Student> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Structured description of a survey's relationship questions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub relationship_types: BTreeMap<String, RelationType>,
    #[serde(default)]
    pub data_characteristics: String,
    #[serde(default)]
    pub conversion_recommendation: String,
}

impl Annotation {
    /// Every relationship column typed as "general"
    pub fn general(columns: &[String]) -> Self {
        Self {
            relationship_types: columns
                .iter()
                .map(|c| (c.clone(), RelationType::General))
                .collect(),
            data_characteristics: String::new(),
            conversion_recommendation: String::new(),
        }
    }

    pub fn type_for(&self, column: &str) -> Option<&RelationType> {
        self.relationship_types.get(column)
    }
}
