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

//! Relationship Extractor
//!
//! Turns a respondent × question table into a canonical edge list.
//!
//! ## Rules
//!
//! 1. Every distinct respondent name becomes a node, ids in order of first
//!    appearance
//! 2. Each answer cell is split on the configured delimiters; tokens are
//!    trimmed and blanks dropped
//! 3. Targets outside the known name set and self references are dropped
//! 4. The edge type comes from the annotation, else from the column header
//! 5. Repeated `(from, to, type)` triples merge into one edge whose weight
//!    counts the mentions

use crate::roles::ColumnRoles;
use crate::table::SurveyTable;
use classnet_core::{
    Annotation, ClassnetError, ExtractionConfig, NetworkData, NodeId, RelationType,
    Relationship, Result, Student,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Why a survey row contributed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingRespondent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: SkipReason,
}

/// Extraction result plus what was discarded on the way
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub network: NetworkData,
    pub skipped_rows: Vec<SkippedRow>,
    /// Answer tokens naming nobody in the node set
    pub dropped_targets: usize,
    /// Answer tokens naming the respondent themself
    pub self_references: usize,
}

#[derive(Debug, Clone)]
pub struct RelationshipExtractor {
    delimiters: Vec<char>,
    include_unlisted_targets: bool,
    max_edge_weight: Option<u32>,
}

impl Default for RelationshipExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl RelationshipExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            delimiters: config.delimiters.clone(),
            include_unlisted_targets: config.include_unlisted_targets,
            max_edge_weight: config.max_edge_weight,
        }
    }

    /// Split one answer cell into trimmed, non-empty names
    pub fn split_answer<'a>(&'a self, cell: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        cell.split(move |c: char| self.delimiters.contains(&c))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Extract nodes and merged edges from `table`.
    ///
    /// Fails when a named column is missing or no row names a respondent.
    pub fn extract(
        &self,
        table: &SurveyTable,
        roles: &ColumnRoles,
        annotation: &Annotation,
    ) -> Result<ExtractionOutcome> {
        let respondent_col = table
            .column_index(&roles.respondent)
            .ok_or_else(|| ClassnetError::UnknownColumn(roles.respondent.clone()))?;

        let questions: Vec<(usize, RelationType)> = roles
            .relationships
            .iter()
            .map(|name| {
                let idx = table
                    .column_index(name)
                    .ok_or_else(|| ClassnetError::UnknownColumn(name.clone()))?;
                let relation_type = annotation
                    .type_for(name)
                    .cloned()
                    .unwrap_or_else(|| RelationType::from_column(name));
                Ok((idx, relation_type))
            })
            .collect::<Result<_>>()?;

        let mut ids: HashMap<String, NodeId> = HashMap::new();
        let mut nodes: Vec<Student> = Vec::new();
        let mut skipped_rows = Vec::new();

        for row in 0..table.len() {
            match table.cell(row, respondent_col) {
                Some(name) => {
                    intern(&mut ids, &mut nodes, name);
                }
                None => {
                    debug!(row, "Skipping row without respondent");
                    skipped_rows.push(SkippedRow {
                        row,
                        reason: SkipReason::MissingRespondent,
                    });
                }
            }
        }

        if nodes.is_empty() {
            return Err(ClassnetError::NoUsableData);
        }

        let mut merged: BTreeMap<(NodeId, NodeId, RelationType), u32> = BTreeMap::new();
        let mut dropped_targets = 0;
        let mut self_references = 0;

        for row in 0..table.len() {
            let Some(respondent) = table.cell(row, respondent_col) else {
                continue;
            };
            let from = ids[respondent];

            for (col, relation_type) in &questions {
                let Some(cell) = table.cell(row, *col) else {
                    continue;
                };
                for target in self.split_answer(cell) {
                    if target == respondent {
                        self_references += 1;
                        continue;
                    }
                    let to = match ids.get(target) {
                        Some(&id) => id,
                        None if self.include_unlisted_targets => {
                            intern(&mut ids, &mut nodes, target)
                        }
                        None => {
                            debug!(row, target, "Dropping unknown target");
                            dropped_targets += 1;
                            continue;
                        }
                    };
                    let weight = merged
                        .entry((from, to, relation_type.clone()))
                        .or_insert(0);
                    *weight = self.merge_weight(*weight, 1);
                }
            }
        }

        let edges: Vec<Relationship> = merged
            .into_iter()
            .map(|((from, to, relation_type), weight)| {
                Relationship::new(from, to, relation_type).with_weight(weight)
            })
            .collect();

        if !skipped_rows.is_empty() || dropped_targets > 0 {
            warn!(
                skipped_rows = skipped_rows.len(),
                dropped_targets, "Some survey answers could not be used"
            );
        }
        info!(
            nodes = nodes.len(),
            edges = edges.len(),
            questions = questions.len(),
            "Extracted relationships"
        );

        let mut network = NetworkData::new(nodes, edges);
        network.question_types = roles
            .relationships
            .iter()
            .cloned()
            .zip(questions.into_iter().map(|(_, t)| t))
            .collect();

        Ok(ExtractionOutcome {
            network,
            skipped_rows,
            dropped_targets,
            self_references,
        })
    }

    /// Saturating sum, then the optional cap
    fn merge_weight(&self, current: u32, added: u32) -> u32 {
        let sum = current.saturating_add(added);
        match self.max_edge_weight {
            Some(cap) => sum.min(cap),
            None => sum,
        }
    }
}

fn intern(ids: &mut HashMap<String, NodeId>, nodes: &mut Vec<Student>, name: &str) -> NodeId {
    if let Some(&id) = ids.get(name) {
        return id;
    }
    let id = nodes.len() as NodeId;
    ids.insert(name.to_string(), id);
    nodes.push(Student::new(id, name));
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn roles(rels: &[&str]) -> ColumnRoles {
        ColumnRoles::new("name", rels.iter().map(|s| s.to_string()).collect())
    }

    fn extract(table: &SurveyTable, rels: &[&str]) -> ExtractionOutcome {
        let roles = roles(rels);
        let annotation = Annotation::general(&[]);
        RelationshipExtractor::default()
            .extract(table, &roles, &annotation)
            .unwrap()
    }

    #[test]
    fn test_alice_bob_carol() {
        let table = SurveyTable::new(
            vec!["name", "friend"],
            vec![vec!["Alice", "Bob, Carol"], vec!["Bob", "Alice"], vec!["Carol", ""]],
        );
        let outcome = extract(&table, &["friend"]);
        let network = &outcome.network;

        assert_eq!(network.nodes.len(), 3);
        assert_eq!(network.nodes[0].name, "Alice");
        assert_eq!(network.edges.len(), 3);
        assert!(network
            .edges
            .iter()
            .all(|e| e.relation_type == RelationType::Friendship && e.weight == 1));
        assert!(network.edges.contains(&Relationship::new(0, 1, RelationType::Friendship)));
        assert!(network.edges.contains(&Relationship::new(0, 2, RelationType::Friendship)));
        assert!(network.edges.contains(&Relationship::new(1, 0, RelationType::Friendship)));
        assert_eq!(
            network.question_types.get("friend"),
            Some(&RelationType::Friendship)
        );
    }

    #[test]
    fn test_duplicate_mentions_merge() {
        let table = SurveyTable::new(
            vec!["name", "friend", "best friend"],
            vec![vec!["Alice", "Bob;Bob", "Bob"], vec!["Bob", "", ""], vec!["Alice", "Bob", ""]],
        );
        let outcome = extract(&table, &["friend", "best friend"]);
        assert_eq!(outcome.network.nodes.len(), 2);
        assert_eq!(outcome.network.edges.len(), 1);
        assert_eq!(outcome.network.edges[0].weight, 4);
    }

    #[test]
    fn test_weight_cap() {
        let config = ExtractionConfig {
            max_edge_weight: Some(2),
            ..ExtractionConfig::default()
        };
        let table = SurveyTable::new(
            vec!["name", "friend"],
            vec![vec!["Alice", "Bob/Bob/Bob"], vec!["Bob", ""]],
        );
        let outcome = RelationshipExtractor::new(&config)
            .extract(&table, &roles(&["friend"]), &Annotation::general(&[]))
            .unwrap();
        assert_eq!(outcome.network.edges[0].weight, 2);
    }

    #[test]
    fn test_unknown_targets_and_self_references_dropped() {
        let table = SurveyTable::new(
            vec!["name", "friend"],
            vec![vec!["Alice", "Alice, Zed\nBob"], vec!["Bob", ""]],
        );
        let outcome = extract(&table, &["friend"]);
        assert_eq!(outcome.network.edges.len(), 1);
        assert_eq!(outcome.dropped_targets, 1);
        assert_eq!(outcome.self_references, 1);
    }

    #[test]
    fn test_unlisted_targets_become_nodes_when_enabled() {
        let config = ExtractionConfig {
            include_unlisted_targets: true,
            ..ExtractionConfig::default()
        };
        let table = SurveyTable::new(vec!["name", "friend"], vec![vec!["Alice", "Zed"]]);
        let outcome = RelationshipExtractor::new(&config)
            .extract(&table, &roles(&["friend"]), &Annotation::general(&[]))
            .unwrap();
        assert_eq!(outcome.network.nodes.len(), 2);
        assert_eq!(outcome.network.nodes[1].name, "Zed");
        assert_eq!(outcome.dropped_targets, 0);
    }

    #[test]
    fn test_missing_respondent_row_skipped() {
        let table = SurveyTable::new(
            vec!["name", "friend"],
            vec![vec!["", "Alice"], vec!["Alice", ""], vec!["Bob", "Alice"]],
        );
        let outcome = extract(&table, &["friend"]);
        assert_eq!(
            outcome.skipped_rows,
            vec![SkippedRow {
                row: 0,
                reason: SkipReason::MissingRespondent
            }]
        );
        assert_eq!(outcome.network.edges.len(), 1);
    }

    #[test]
    fn test_no_edges_is_valid() {
        let table = SurveyTable::new(vec!["name", "friend"], vec![vec!["Alice", ""]]);
        let outcome = extract(&table, &["friend"]);
        assert_eq!(outcome.network.nodes.len(), 1);
        assert!(outcome.network.edges.is_empty());
    }

    #[test]
    fn test_no_respondents_is_error() {
        let table = SurveyTable::new(vec!["name", "friend"], vec![vec!["", "Alice"]]);
        let err = RelationshipExtractor::default()
            .extract(&table, &roles(&["friend"]), &Annotation::general(&[]))
            .unwrap_err();
        assert!(matches!(err, ClassnetError::NoUsableData));
    }

    #[test]
    fn test_annotation_overrides_header_type() {
        let table = SurveyTable::new(vec!["name", "friend"], vec![vec!["Alice", "Bob"], vec!["Bob", ""]]);
        let mut annotation = Annotation::general(&["friend".to_string()]);
        annotation
            .relationship_types
            .insert("friend".into(), RelationType::Help);
        let outcome = RelationshipExtractor::default()
            .extract(&table, &roles(&["friend"]), &annotation)
            .unwrap();
        assert_eq!(outcome.network.edges[0].relation_type, RelationType::Help);
    }

    fn survey_table() -> impl Strategy<Value = SurveyTable> {
        let names = prop::sample::select(vec!["Ann", "Ben", "Cat", "Dan", "Eve", "Zed", ""]);
        let row = (names.clone(), prop::collection::vec(names, 0..5));
        prop::collection::vec(row, 1..12).prop_map(|rows| {
            let rows: Vec<Vec<String>> = rows
                .into_iter()
                .map(|(who, targets)| vec![who.to_string(), targets.join(";")])
                .collect();
            SurveyTable::new(vec!["name", "friend"], rows)
        })
    }

    proptest! {
        #[test]
        fn prop_edges_are_canonical(table in survey_table()) {
            let roles = roles(&["friend"]);
            let annotation = Annotation::general(&[]);
            if let Ok(outcome) = RelationshipExtractor::default().extract(&table, &roles, &annotation) {
                let ids: HashSet<NodeId> = outcome.network.nodes.iter().map(|n| n.id).collect();
                let mut seen = HashSet::new();
                for edge in &outcome.network.edges {
                    prop_assert!(!edge.is_self_loop());
                    prop_assert!(edge.weight >= 1);
                    prop_assert!(ids.contains(&edge.from) && ids.contains(&edge.to));
                    prop_assert!(seen.insert((edge.from, edge.to, edge.relation_type.clone())));
                }
            }
        }
    }
}
