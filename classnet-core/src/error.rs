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

//! Typed errors for the analysis pipeline.
//!
//! Only a handful of these ever reach the caller of a full analysis: input
//! tables with fewer than two usable columns, graphs that cannot be built
//! because no nodes survived, and configuration problems. Everything else is
//! recovered inside the pipeline and surfaces as a provenance warning.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassnetError {
    // Input
    #[error("Survey table has {found} usable column(s), at least 2 are required")]
    InsufficientColumns { found: usize },

    #[error("Survey table is empty")]
    EmptyTable,

    #[error("Column '{0}' not found in survey table")]
    UnknownColumn(String),

    #[error("Could not decode survey table: {0}")]
    Decode(String),

    #[error("CSV parse error: {0}")]
    Csv(String),

    // Graph
    #[error("Graph construction failed: {0}")]
    GraphConstruction(String),

    #[error("No usable node data after all fallbacks")]
    NoUsableData,

    // External collaborators
    #[error("Fetch failed after {attempts} attempt(s): {message}")]
    Fetch { attempts: u32, message: String },

    #[error("Annotation failed: {0}")]
    Annotation(String),

    // System
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClassnetError {
    /// Whether the error should be shown to the person who uploaded the survey
    /// rather than treated as an internal failure.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ClassnetError::InsufficientColumns { .. }
                | ClassnetError::EmptyTable
                | ClassnetError::UnknownColumn(_)
                | ClassnetError::Decode(_)
                | ClassnetError::Csv(_)
        )
    }
}

impl From<toml::de::Error> for ClassnetError {
    fn from(err: toml::de::Error) -> Self {
        ClassnetError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClassnetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_columns_message() {
        let err = ClassnetError::InsufficientColumns { found: 1 };
        assert_eq!(
            err.to_string(),
            "Survey table has 1 usable column(s), at least 2 are required"
        );
        assert!(err.is_input_error());
    }

    #[test]
    fn test_fetch_error_is_not_input_error() {
        let err = ClassnetError::Fetch {
            attempts: 3,
            message: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "Fetch failed after 3 attempt(s): timeout");
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ClassnetError = io_err.into();
        assert!(matches!(err, ClassnetError::Io(_)));
    }
}
