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

//! Column role detection
//!
//! Decides which column names the respondent and which columns hold
//! relationship answers. Explicit choices win. Otherwise the respondent is
//! found by header keyword, or failing that as the column with the most
//! distinct values, and every other non-metadata column is a relationship
//! question. Keywords only decide a question's type, never whether it counts.

use crate::table::SurveyTable;
use classnet_core::{ClassnetError, RelationType, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const RESPONDENT_KEYWORDS: &[&str] = &["name", "respondent", "student", "이름", "학생", "성명"];
/// Header words that mark form metadata rather than a question
const METADATA_TOKENS: &[&str] = &["timestamp", "date", "email", "타임스탬프", "날짜", "이메일"];
/// Whole headers that are metadata but too common as words to match inside a question
const METADATA_HEADERS: &[&str] = &["time", "시간"];

/// How the roles were decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleDetection {
    Explicit,
    Keyword,
    Cardinality,
}

/// Caller-supplied column choices; unset fields are detected
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleHints {
    pub respondent: Option<String>,
    pub relationships: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub respondent: String,
    pub relationships: Vec<String>,
    pub detection: RoleDetection,
}

impl ColumnRoles {
    pub fn new(respondent: impl Into<String>, relationships: Vec<String>) -> Self {
        Self {
            respondent: respondent.into(),
            relationships,
            detection: RoleDetection::Explicit,
        }
    }
}

fn is_metadata(header: &str) -> bool {
    let lowered = header.trim().to_lowercase().replace("e-mail", "email");
    if METADATA_HEADERS.contains(&lowered.as_str()) {
        return true;
    }
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| METADATA_TOKENS.contains(&token))
}

fn looks_like_respondent(header: &str) -> bool {
    let lowered = header.to_lowercase();
    RESPONDENT_KEYWORDS.iter().any(|k| lowered.contains(k))
        && RelationType::from_column(header) == RelationType::General
}

fn require_column(table: &SurveyTable, name: &str) -> Result<String> {
    table
        .column_index(name)
        .map(|idx| table.headers()[idx].clone())
        .ok_or_else(|| ClassnetError::UnknownColumn(name.to_string()))
}

/// Detect respondent and relationship columns.
///
/// Fails when a hinted column does not exist, or when nothing is hinted and
/// the table has fewer than two headed columns. Columns whose answers are all
/// blank still count; they simply contribute no edges.
pub fn detect_roles(table: &SurveyTable, hints: &RoleHints) -> Result<ColumnRoles> {
    if let (Some(respondent), Some(relationships)) = (&hints.respondent, &hints.relationships) {
        return explicit_roles(table, respondent, relationships);
    }

    let usable = table.usable_columns();
    if usable.len() < 2 {
        return Err(ClassnetError::InsufficientColumns {
            found: usable.len(),
        });
    }

    let headers = table.headers();
    let candidates: Vec<usize> = {
        let content: Vec<usize> = usable
            .iter()
            .copied()
            .filter(|&c| !is_metadata(&headers[c]))
            .collect();
        if content.len() >= 2 {
            content
        } else {
            usable.clone()
        }
    };

    let mut detection = RoleDetection::Explicit;

    let respondent = match &hints.respondent {
        Some(name) => require_column(table, name)?,
        None => match candidates.iter().find(|&&c| looks_like_respondent(&headers[c])) {
            Some(&c) => {
                detection = RoleDetection::Keyword;
                headers[c].clone()
            }
            None => {
                detection = RoleDetection::Cardinality;
                // max_by_key keeps the last maximum, so compare reversed
                // positions to prefer the leftmost column on ties
                let best = candidates
                    .iter()
                    .copied()
                    .max_by_key(|&c| (table.cardinality(c), std::cmp::Reverse(c)))
                    .ok_or(ClassnetError::InsufficientColumns { found: 0 })?;
                headers[best].clone()
            }
        },
    };

    let relationships = match &hints.relationships {
        Some(names) => names
            .iter()
            .map(|n| require_column(table, n))
            .collect::<Result<Vec<_>>>()?,
        None => candidates
            .iter()
            .map(|&c| headers[c].clone())
            .filter(|h| *h != respondent)
            .collect(),
    };

    let relationships: Vec<String> = relationships
        .into_iter()
        .filter(|r| *r != respondent)
        .collect();

    if relationships.is_empty() {
        return Err(ClassnetError::InsufficientColumns { found: 1 });
    }

    if detection == RoleDetection::Cardinality {
        info!(
            respondent = %respondent,
            relationships = relationships.len(),
            "No keyword match for column roles, guessed from value cardinality"
        );
    } else {
        debug!(respondent = %respondent, ?relationships, ?detection, "Detected column roles");
    }

    Ok(ColumnRoles {
        respondent,
        relationships,
        detection,
    })
}

fn explicit_roles(
    table: &SurveyTable,
    respondent: &str,
    relationships: &[String],
) -> Result<ColumnRoles> {
    let respondent = require_column(table, respondent)?;
    let relationships: Vec<String> = relationships
        .iter()
        .map(|n| require_column(table, n))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .filter(|r| *r != respondent)
        .collect();
    if relationships.is_empty() {
        return Err(ClassnetError::InsufficientColumns { found: 1 });
    }
    debug!(respondent = %respondent, ?relationships, "Using explicit column roles");
    Ok(ColumnRoles::new(respondent, relationships))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn korean_table() -> SurveyTable {
        SurveyTable::new(
            vec!["타임스탬프", "이름", "좋아하는 친구"],
            vec![
                vec!["2024-01-01", "김철수", "홍길동;이영희"],
                vec!["2024-01-02", "홍길동", "김철수"],
                vec!["2024-01-03", "이영희", "김철수"],
            ],
        )
    }

    #[test]
    fn test_keyword_detection_skips_timestamp() {
        let roles = detect_roles(&korean_table(), &RoleHints::default()).unwrap();
        assert_eq!(roles.respondent, "이름");
        assert_eq!(roles.relationships, vec!["좋아하는 친구".to_string()]);
        assert_eq!(roles.detection, RoleDetection::Keyword);
    }

    #[test]
    fn test_cardinality_fallback() {
        let table = SurveyTable::new(
            vec!["q1", "who"],
            vec![vec!["x", "Alice"], vec!["x", "Bob"], vec!["y", "Carol"]],
        );
        let roles = detect_roles(&table, &RoleHints::default()).unwrap();
        assert_eq!(roles.respondent, "who");
        assert_eq!(roles.relationships, vec!["q1".to_string()]);
        assert_eq!(roles.detection, RoleDetection::Cardinality);
    }

    #[test]
    fn test_explicit_roles() {
        let hints = RoleHints {
            respondent: Some("이름".into()),
            relationships: Some(vec!["좋아하는 친구".into()]),
        };
        let roles = detect_roles(&korean_table(), &hints).unwrap();
        assert_eq!(roles.detection, RoleDetection::Explicit);
    }

    #[test]
    fn test_unknown_explicit_column() {
        let hints = RoleHints {
            respondent: Some("missing".into()),
            relationships: None,
        };
        let err = detect_roles(&korean_table(), &hints).unwrap_err();
        assert!(matches!(err, ClassnetError::UnknownColumn(c) if c == "missing"));
    }

    #[test]
    fn test_single_column_is_input_error() {
        let table = SurveyTable::new(vec!["name", ""], vec![vec!["Alice", "Bob"]]);
        let err = detect_roles(&table, &RoleHints::default()).unwrap_err();
        assert!(matches!(err, ClassnetError::InsufficientColumns { found: 1 }));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_unanswered_question_still_counts() {
        let table = SurveyTable::new(
            vec!["name", "friend"],
            vec![vec!["Alice", ""], vec!["Bob", ""]],
        );
        let detected = detect_roles(&table, &RoleHints::default()).unwrap();
        assert_eq!(detected.respondent, "name");
        assert_eq!(detected.relationships, vec!["friend".to_string()]);

        let hints = RoleHints {
            respondent: Some("name".into()),
            relationships: Some(vec!["friend".into()]),
        };
        let explicit = detect_roles(&table, &hints).unwrap();
        assert_eq!(explicit.detection, RoleDetection::Explicit);
        assert_eq!(explicit.relationships, vec!["friend".to_string()]);
    }

    #[test]
    fn test_unkeyworded_questions_are_kept() {
        let table = SurveyTable::new(
            vec!["Name", "Who are your friends?", "Who do you sit next to?"],
            vec![vec!["Alice", "Bob", "Carol"]],
        );
        let roles = detect_roles(&table, &RoleHints::default()).unwrap();
        assert_eq!(roles.respondent, "Name");
        assert_eq!(
            roles.relationships,
            vec![
                "Who are your friends?".to_string(),
                "Who do you sit next to?".to_string()
            ]
        );
        assert_eq!(roles.detection, RoleDetection::Keyword);
    }

    #[test]
    fn test_metadata_matches_whole_words() {
        assert!(is_metadata("Timestamp"));
        assert!(is_metadata("타임스탬프"));
        assert!(is_metadata("E-mail address"));
        assert!(is_metadata("Date"));
        assert!(is_metadata("time"));
        assert!(!is_metadata("Who do you spend time with?"));
        assert!(!is_metadata("Sometimes helpful classmate"));
        assert!(!is_metadata("Class candidate"));
        assert!(!is_metadata("함께 시간을 보내는 친구"));

        let table = SurveyTable::new(
            vec!["Timestamp", "Name", "Best friend", "Who do you spend time with?"],
            vec![vec!["t", "Alice", "Bob", "Carol"]],
        );
        let roles = detect_roles(&table, &RoleHints::default()).unwrap();
        assert_eq!(
            roles.relationships,
            vec![
                "Best friend".to_string(),
                "Who do you spend time with?".to_string()
            ]
        );
    }

    #[test]
    fn test_several_relationship_questions() {
        let table = SurveyTable::new(
            vec![
                "타임스탬프",
                "학생 이름",
                "함께 공부하고 싶은 친구",
                "함께 프로젝트 하고 싶은 친구",
            ],
            vec![vec!["t", "학생1", "학생2", "학생3"]],
        );
        let roles = detect_roles(&table, &RoleHints::default()).unwrap();
        assert_eq!(roles.respondent, "학생 이름");
        assert_eq!(roles.relationships.len(), 2);
    }
}
