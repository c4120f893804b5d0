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

//! Survey sources: local CSV files and http(s) URLs. Google Sheets links
//! are rewritten to their CSV export URL.

use crate::table::SurveyTable;
use classnet_core::{ClassnetError, FetchConfig, Result, RetryPolicy};
use std::fmt;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveySource {
    Path(PathBuf),
    Url(String),
}

impl SurveySource {
    /// URL when it starts with http(s)://, file path otherwise
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lowered = trimmed.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            SurveySource::Url(trimmed.to_string())
        } else {
            SurveySource::Path(PathBuf::from(trimmed))
        }
    }

    /// Load and decode the table
    pub fn load(&self, config: &FetchConfig) -> Result<SurveyTable> {
        match self {
            SurveySource::Path(path) => {
                info!(path = %path.display(), "Reading survey file");
                SurveyTable::from_path(path)
            }
            SurveySource::Url(url) => {
                let bytes = fetch_bytes(&export_url(url), config)?;
                SurveyTable::from_csv_bytes(&bytes)
            }
        }
    }
}

impl fmt::Display for SurveySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurveySource::Path(path) => write!(f, "{}", path.display()),
            SurveySource::Url(url) => f.write_str(url),
        }
    }
}

/// Spreadsheet id from a `docs.google.com/spreadsheets/d/<id>/...` URL
pub fn extract_sheet_id(url: &str) -> Option<&str> {
    if !url.contains("docs.google.com/spreadsheets") {
        return None;
    }
    let (_, rest) = url.split_once("/d/")?;
    let id = rest.split(['/', '?', '#']).next()?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// CSV export URL for Google Sheets links; other URLs are returned as is
pub fn export_url(url: &str) -> String {
    match extract_sheet_id(url) {
        Some(id) => {
            let gid = url
                .split(['?', '#', '&'])
                .find_map(|part| part.strip_prefix("gid="));
            match gid {
                Some(gid) => format!(
                    "https://docs.google.com/spreadsheets/d/{}/export?format=csv&gid={}",
                    id, gid
                ),
                None => format!(
                    "https://docs.google.com/spreadsheets/d/{}/export?format=csv",
                    id
                ),
            }
        }
        None => url.to_string(),
    }
}

/// GET `url` with timeout and linear-backoff retry
pub fn fetch_bytes(url: &str, config: &FetchConfig) -> Result<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| ClassnetError::Fetch {
            attempts: 0,
            message: e.to_string(),
        })?;

    let policy = RetryPolicy::from_config(config);
    let bytes = policy
        .run("survey download", |attempt| {
            info!(url, attempt, "Downloading survey");
            let response = client.get(url).send()?.error_for_status()?;
            response.bytes()
        })
        .map_err(|e| ClassnetError::Fetch {
            attempts: e.attempts,
            message: e.last.to_string(),
        })?;

    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        assert_eq!(
            SurveySource::parse("https://example.com/a.csv"),
            SurveySource::Url("https://example.com/a.csv".into())
        );
        assert_eq!(
            SurveySource::parse(" data/survey.csv "),
            SurveySource::Path(PathBuf::from("data/survey.csv"))
        );
    }

    #[test]
    fn test_sheet_export_url() {
        let url = "https://docs.google.com/spreadsheets/d/1AbC-xyz_9/edit#gid=0";
        assert_eq!(extract_sheet_id(url), Some("1AbC-xyz_9"));
        assert_eq!(
            export_url(url),
            "https://docs.google.com/spreadsheets/d/1AbC-xyz_9/export?format=csv&gid=0"
        );
        assert_eq!(
            export_url("https://docs.google.com/spreadsheets/d/abc/edit?usp=sharing"),
            "https://docs.google.com/spreadsheets/d/abc/export?format=csv"
        );
        assert_eq!(export_url("https://example.com/a.csv"), "https://example.com/a.csv");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = SurveySource::Path(dir.path().join("missing.csv"));
        assert!(matches!(
            source.load(&FetchConfig::default()),
            Err(ClassnetError::Io(_))
        ));
    }
}
