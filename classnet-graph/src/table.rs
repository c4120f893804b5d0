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

//! Survey Table
//!
//! Raw respondent × question table as exported from a form tool. Cells are
//! kept as optional strings; blank cells become `None`.
//!
//! Byte input is decoded by trying UTF-8 first and then the legacy encodings
//! spreadsheets commonly export Korean and Western text in.

use classnet_core::{ClassnetError, Result};
use encoding_rs::{Encoding, EUC_KR, UTF_8, WINDOWS_1252};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Encodings tried in order when decoding a table
fn decode_order() -> [&'static Encoding; 3] {
    [UTF_8, EUC_KR, WINDOWS_1252]
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurveyTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    encoding: &'static str,
}

impl SurveyTable {
    /// Build a table from in-memory rows. Empty strings become blank cells.
    pub fn new<H, C>(headers: Vec<H>, rows: Vec<Vec<C>>) -> Self
    where
        H: Into<String>,
        C: AsRef<str>,
    {
        let headers = dedupe_headers(
            headers
                .into_iter()
                .map(|h| h.into().trim().to_string())
                .collect(),
        );
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|row| {
                let mut cells: Vec<Option<String>> =
                    row.iter().map(|c| normalize_cell(c.as_ref())).collect();
                cells.resize(width, None);
                cells
            })
            .collect();
        Self {
            headers,
            rows,
            encoding: UTF_8.name(),
        }
    }

    /// Decode and parse CSV bytes
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let (text, encoding) = decode_text(bytes)?;
        let mut table = Self::from_csv_str(&text)?;
        table.encoding = encoding.name();
        Ok(table)
    }

    /// Read and parse a CSV file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_csv_bytes(&bytes)
    }

    /// Parse already-decoded CSV text
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ClassnetError::Csv(e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ClassnetError::EmptyTable);
        }
        let headers = dedupe_headers(headers);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ClassnetError::Csv(e.to_string()))?;
            let mut cells: Vec<Option<String>> = record.iter().map(normalize_cell).collect();
            if cells.len() > headers.len() {
                warn!(
                    row = rows.len(),
                    extra = cells.len() - headers.len(),
                    "Dropping cells beyond the header row"
                );
            }
            cells.resize(headers.len(), None);
            rows.push(cells);
        }

        debug!(columns = headers.len(), rows = rows.len(), "Parsed survey table");

        Ok(Self {
            headers,
            rows,
            encoding: UTF_8.name(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Name of the encoding the bytes were decoded with
    pub fn encoding(&self) -> &'static str {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers.iter().position(|h| h == wanted)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }

    /// Non-blank values of a column, in row order
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .filter_map(move |r| r.get(column).and_then(|c| c.as_deref()))
    }

    /// Number of distinct non-blank values in a column
    pub fn cardinality(&self, column: usize) -> usize {
        self.column_values(column).collect::<HashSet<_>>().len()
    }

    /// A column is usable when it has a header. Its answers may all be blank.
    pub fn is_usable(&self, column: usize) -> bool {
        self.headers.get(column).is_some_and(|h| !h.is_empty())
    }

    pub fn usable_columns(&self) -> Vec<usize> {
        (0..self.headers.len()).filter(|&c| self.is_usable(c)).collect()
    }

    /// Render the first `max_rows` rows as CSV-like text for an annotator prompt
    pub fn sample(&self, max_rows: usize) -> String {
        let mut out = self.headers.join(",");
        for row in self.rows.iter().take(max_rows) {
            out.push('\n');
            let line: Vec<&str> = row.iter().map(|c| c.as_deref().unwrap_or("")).collect();
            out.push_str(&line.join(","));
        }
        out
    }
}

/// Repeated headers get a `_2`, `_3`, ... suffix so every column stays addressable
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = headers.iter().cloned().collect();
    let mut used: HashSet<String> = HashSet::new();
    headers
        .into_iter()
        .map(|header| {
            if header.is_empty() || used.insert(header.clone()) {
                return header;
            }
            let mut n = 2;
            let renamed = loop {
                let candidate = format!("{}_{}", header, n);
                if !seen.contains(&candidate) {
                    break candidate;
                }
                n += 1;
            };
            warn!(header = %header, renamed = %renamed, "Renaming duplicate column header");
            seen.insert(renamed.clone());
            used.insert(renamed.clone());
            renamed
        })
        .collect()
}

fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Decode bytes trying UTF-8, then EUC-KR (CP949), then windows-1252.
pub fn decode_text(bytes: &[u8]) -> Result<(String, &'static Encoding)> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if bytes.is_empty() {
        return Err(ClassnetError::EmptyTable);
    }

    for encoding in decode_order() {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            if encoding != UTF_8 {
                debug!(encoding = encoding.name(), "Decoded table with fallback encoding");
            }
            return Ok((text.into_owned(), encoding));
        }
    }

    Err(ClassnetError::Decode(format!(
        "not valid in any of {}",
        decode_order()
            .iter()
            .map(|e| e.name())
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_with_blank_cells() {
        let table = SurveyTable::from_csv_str("name,friend\nAlice,\"Bob;Carol\"\nBob,Alice\nCarol,\n")
            .unwrap();
        assert_eq!(table.headers(), &["name".to_string(), "friend".to_string()]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, 1), Some("Bob;Carol"));
        assert_eq!(table.cell(2, 1), None);
        assert_eq!(table.cardinality(0), 3);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = SurveyTable::from_csv_str("a,b,c\n1\n1,2,3,4\n").unwrap();
        assert_eq!(table.rows()[0].len(), 3);
        assert_eq!(table.rows()[1].len(), 3);
        assert_eq!(table.cell(1, 2), Some("3"));
    }

    #[test]
    fn test_decode_utf8_with_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("이름,친구\n김철수,홍길동\n".as_bytes());
        let table = SurveyTable::from_csv_bytes(&bytes).unwrap();
        assert_eq!(table.encoding(), "UTF-8");
        assert_eq!(table.headers()[0], "이름");
    }

    #[test]
    fn test_decode_euc_kr_fallback() {
        let (encoded, _, had_errors) = EUC_KR.encode("이름,친구\n김철수,홍길동\n");
        assert!(!had_errors);
        let table = SurveyTable::from_csv_bytes(&encoded).unwrap();
        assert_eq!(table.encoding(), "EUC-KR");
        assert_eq!(table.cell(0, 1), Some("홍길동"));
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(
            SurveyTable::from_csv_bytes(b""),
            Err(ClassnetError::EmptyTable)
        ));
    }

    #[test]
    fn test_usable_columns_need_only_a_header() {
        let table = SurveyTable::new(
            vec!["name", " ", "friend"],
            vec![vec!["Alice", "x", ""], vec!["Bob", "", " "]],
        );
        assert_eq!(table.usable_columns(), vec![0, 2]);
        assert_eq!(table.cardinality(2), 0);
    }

    #[test]
    fn test_duplicate_headers_are_renamed() {
        let table =
            SurveyTable::from_csv_str("name,friend,friend,friend_2\nAlice,Bob,Carol,Dave\n")
                .unwrap();
        assert_eq!(
            table.headers(),
            &["name", "friend", "friend_3", "friend_2"].map(String::from)
        );
        assert_eq!(table.column_index("friend"), Some(1));
        assert_eq!(table.column_index("friend_3"), Some(2));
        assert_eq!(table.cell(0, table.column_index("friend_3").unwrap()), Some("Carol"));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.csv");
        std::fs::write(&path, "name,friend\nAlice,Bob\n").unwrap();
        let table = SurveyTable::from_path(&path).unwrap();
        assert_eq!(table.len(), 1);
    }
}
