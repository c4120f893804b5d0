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

//! Relationship question annotation
//!
//! An annotation says which relationship category each question column
//! stands for. Two sources are supported:
//!
//! - `KeywordInference`: header keyword matching, always available
//! - `AiRoleInference`: asks an external completion service, and falls back
//!   to the keyword annotation when the service is down or its answer cannot
//!   be parsed
//!
//! ## Expected service response
//!
//! ```json
//! {
//!   "relationship_types": {"Who do you study with?": "study"},
//!   "data_characteristics": "one respondent per row, names separated by ';'",
//!   "conversion_recommendation": "split answers into one edge per name"
//! }
//! ```

use crate::roles::ColumnRoles;
use classnet_core::{Annotation, ClassnetError, RelationType, Result, RetryPolicy};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// An annotation plus the reason it had to be degraded, if it was
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub annotation: Annotation,
    pub fallback_reason: Option<String>,
}

impl Inference {
    pub fn is_degraded(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Capability interface for structure inference
pub trait RoleInference {
    /// Annotate the relationship columns given a text sample of the table
    fn infer_roles(&self, sample: &str, roles: &ColumnRoles) -> Inference;
}

/// Header-keyword annotation
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordInference;

impl KeywordInference {
    pub fn annotate(&self, roles: &ColumnRoles) -> Annotation {
        let relationship_types: BTreeMap<String, RelationType> = roles
            .relationships
            .iter()
            .map(|c| (c.clone(), RelationType::from_column(c)))
            .collect();

        Annotation {
            relationship_types,
            data_characteristics: format!(
                "respondent column '{}', {} relationship question(s)",
                roles.respondent,
                roles.relationships.len()
            ),
            conversion_recommendation:
                "split multi-name answers into one edge per respondent/target pair".to_string(),
        }
    }
}

impl RoleInference for KeywordInference {
    fn infer_roles(&self, _sample: &str, roles: &ColumnRoles) -> Inference {
        Inference {
            annotation: self.annotate(roles),
            fallback_reason: None,
        }
    }
}

/// A text completion service (LLM or otherwise)
pub trait CompletionClient {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Annotation through an external completion service
pub struct AiRoleInference<C: CompletionClient> {
    client: C,
    retry: RetryPolicy,
    fallback: KeywordInference,
}

impl<C: CompletionClient> AiRoleInference<C> {
    pub fn new(client: C) -> Self {
        Self::with_retry(client, RetryPolicy::default())
    }

    pub fn with_retry(client: C, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            fallback: KeywordInference,
        }
    }

    /// Annotate through the service without falling back
    pub fn try_infer(&self, sample: &str, roles: &ColumnRoles) -> Result<Annotation> {
        let prompt = build_prompt(sample, roles);
        let response = self
            .retry
            .run("annotation request", |_| self.client.complete(&prompt))
            .map_err(|e| ClassnetError::Annotation(e.to_string()))?;
        parse_annotation(&response, roles)
    }
}

impl<C: CompletionClient> RoleInference for AiRoleInference<C> {
    fn infer_roles(&self, sample: &str, roles: &ColumnRoles) -> Inference {
        match self.try_infer(sample, roles) {
            Ok(annotation) => Inference {
                annotation,
                fallback_reason: None,
            },
            Err(e) => {
                warn!("Annotation service unavailable, using keyword annotation: {}", e);
                Inference {
                    annotation: self.fallback.annotate(roles),
                    fallback_reason: Some(e.to_string()),
                }
            }
        }
    }
}

fn build_prompt(sample: &str, roles: &ColumnRoles) -> String {
    format!(
        r#"You analyse classroom relationship surveys.

## SURVEY SAMPLE (CSV)
{sample}

## DETECTED COLUMNS
respondent: {respondent}
relationship questions:
{questions}

## TASK
For every relationship question, choose the relationship category it asks
about: friendship, study, collaboration, help, or general.
Describe the data layout briefly and recommend how to convert it into
(from, to) pairs.

## OUTPUT
Return ONLY one JSON object:
{{"relationship_types": {{"<question>": "<category>"}}, "data_characteristics": "...", "conversion_recommendation": "..."}}"#,
        sample = sample,
        respondent = roles.respondent,
        questions = roles
            .relationships
            .iter()
            .map(|q| format!("- {}", q))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

#[derive(Debug, Deserialize)]
struct RawAnnotation {
    #[serde(default)]
    relationship_types: BTreeMap<String, String>,
    #[serde(default)]
    data_characteristics: Option<String>,
    #[serde(default)]
    conversion_recommendation: Option<String>,
}

/// Find the first balanced `{...}` object in free text.
///
/// Braces inside JSON string literals are ignored.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a service response into an annotation for `roles`.
///
/// Columns the response does not mention keep their keyword type; entries
/// for columns that are not relationship questions are ignored.
pub fn parse_annotation(response: &str, roles: &ColumnRoles) -> Result<Annotation> {
    let json = extract_json_object(response)
        .ok_or_else(|| ClassnetError::Annotation("no JSON object in response".to_string()))?;
    let raw: RawAnnotation = serde_json::from_str(json)
        .map_err(|e| ClassnetError::Annotation(format!("invalid annotation JSON: {}", e)))?;

    let mut annotation = KeywordInference.annotate(roles);
    let mut recognised = 0;
    for (column, category) in raw.relationship_types {
        match annotation.relationship_types.get_mut(column.trim()) {
            Some(slot) => {
                *slot = RelationType::parse(&category);
                recognised += 1;
            }
            None => debug!(column = %column, "Annotation names an unknown column, ignoring"),
        }
    }

    if recognised == 0 {
        return Err(ClassnetError::Annotation(
            "annotation does not type any relationship column".to_string(),
        ));
    }

    if let Some(text) = raw.data_characteristics.filter(|t| !t.trim().is_empty()) {
        annotation.data_characteristics = text;
    }
    if let Some(text) = raw
        .conversion_recommendation
        .filter(|t| !t.trim().is_empty())
    {
        annotation.conversion_recommendation = text;
    }

    Ok(annotation)
}
