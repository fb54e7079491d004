//! CSV intake for the audit portal
//!
//! Keeps the 1-based file line with every record so later pipeline stages can
//! point errors at the spreadsheet row the user is looking at.

use crate::errors::{InputError, Result};
use crate::fsutil;
use std::collections::HashMap;
use std::path::Path;

/// One CSV record. `line` counts the header as line 1, so data starts at 2.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub line: usize,
    pub fields: HashMap<String, String>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(|s| s.as_str())
    }

    /// Compact `col=value` excerpt in header order, for error messages
    pub fn excerpt(&self, headers: &[String]) -> String {
        headers
            .iter()
            .filter_map(|h| self.fields.get(h).map(|v| format!("{}={}", h, v)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Read the event CSV: header row plus data rows with their line numbers.
/// Fails when the file is missing, headerless, or lacks a required column.
pub fn load_rows(path: &Path, required_columns: &[String]) -> Result<(Vec<String>, Vec<RawRow>)> {
    if !path.exists() {
        return Err(InputError::new(format!("input CSV not found: {}", path.display())).into());
    }

    let contents = fsutil::read_utf8(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(contents.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|_| InputError::new("input CSV has no readable header row"))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(InputError::new("input CSV has no readable header row").into());
    }

    let missing: Vec<&String> = required_columns
        .iter()
        .filter(|c| !headers.contains(c))
        .collect();
    if !missing.is_empty() {
        let names = missing
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(InputError::new(format!("missing required columns: {}", names)).into());
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let mut fields = HashMap::with_capacity(headers.len());
        for (col, header) in headers.iter().enumerate() {
            // Short records leave trailing columns absent, like a sparse sheet
            if let Some(value) = record.get(col) {
                fields.insert(header.clone(), value.to_string());
            }
        }
        rows.push(RawRow {
            line: idx + 2,
            fields,
        });
    }

    Ok((headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn required() -> Vec<String> {
        vec!["case_id".to_string(), "attr_type".to_string()]
    }

    #[test]
    fn test_load_numbers_rows_from_two() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(
            &tmp,
            "flow.csv",
            "case_id,table,attr_type,before,after\nC1,orders,status,new,paid\nC1,orders,total,,100\n",
        );
        let (headers, rows) = load_rows(&path, &required()).unwrap();
        assert_eq!(headers[0], "case_id");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].line, 3);
        assert_eq!(rows[0].get("after"), Some("paid"));
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_rows(&tmp.path().join("nope.csv"), &required()).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_missing_required_column_names_it() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(&tmp, "flow.csv", "case_id,table\nC1,orders\n");
        let err = load_rows(&path, &required()).unwrap_err();
        assert!(err.to_string().contains("attr_type"));
    }

    #[test]
    fn test_bom_is_stripped_from_header() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(&tmp, "flow.csv", "\u{feff}case_id,attr_type\nC1,status\n");
        let (headers, rows) = load_rows(&path, &required()).unwrap();
        assert_eq!(headers[0], "case_id");
        assert_eq!(rows[0].get("case_id"), Some("C1"));
    }

    #[test]
    fn test_short_record_leaves_columns_absent() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(&tmp, "flow.csv", "case_id,attr_type,after\nC1,status\n");
        let (_, rows) = load_rows(&path, &required()).unwrap();
        assert_eq!(rows[0].get("after"), None);
    }

    #[test]
    fn test_excerpt_follows_header_order() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(&tmp, "flow.csv", "case_id,attr_type,after\nC1,status,paid\n");
        let (headers, rows) = load_rows(&path, &required()).unwrap();
        assert_eq!(rows[0].excerpt(&headers), "case_id=C1, attr_type=status, after=paid");
    }
}
