//! JSON → leveled TSV
//!
//! Expands a JSON document into its leaf paths and writes a TSV where each
//! leaf is a column: one row per path depth, then a value row. Shared path
//! prefixes collapse to an arrow so the sheet reads like a tree when pasted
//! into a spreadsheet.

use crate::errors::{InputError, Result, ToolError};
use crate::fsutil;
use colored::Colorize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub struct FlattenSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub leaves: usize,
    pub archived: usize,
}

/// Newest `*.json` in `dir` by modification time
pub fn newest_json(dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_json = path.is_file()
            && path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("json"))
                .unwrap_or(false);
        if !is_json {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        candidates.push((modified, path));
    }
    candidates
        .into_iter()
        .max_by_key(|entry| entry.0)
        .map(|(_, path)| path)
        .ok_or_else(|| InputError::new(format!("no *.json files in {}", dir.display())).into())
}

/// Depth-first leaf extraction in document order. Objects contribute `.key`
/// segments, arrays `[i]`; scalars become `(path, text)` pairs and null
/// renders as an empty cell.
pub fn extract_leaves(value: &Value) -> Vec<(String, String)> {
    let mut leaves = Vec::new();
    walk(value, String::new(), &mut leaves);
    leaves
}

fn walk(value: &Value, prefix: String, leaves: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                walk(child, path, leaves);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                walk(child, format!("{}[{}]", prefix, i), leaves);
            }
        }
        Value::Null => leaves.push((prefix, String::new())),
        Value::Bool(b) => leaves.push((prefix, b.to_string())),
        Value::Number(n) => leaves.push((prefix, n.to_string())),
        Value::String(s) => leaves.push((prefix, s.clone())),
    }
}

/// `courses[0].conditions[1].note` → `["courses", "[0]", "conditions", "[1]", "note"]`
pub fn split_segments(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut name = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '[' => {
                if !name.is_empty() {
                    segments.push(std::mem::take(&mut name));
                }
                let mut index = String::from('[');
                for c in chars.by_ref() {
                    index.push(c);
                    if c == ']' {
                        break;
                    }
                }
                segments.push(index);
            }
            '.' => {
                if !name.is_empty() {
                    segments.push(std::mem::take(&mut name));
                }
            }
            _ => name.push(c),
        }
    }
    if !name.is_empty() {
        segments.push(name);
    }
    segments
}

/// One row per depth plus a value row, tab-joined. A segment cell becomes
/// `→` when its whole path prefix up to that depth equals the previous
/// column's, i.e. both columns sit under the same tree node. A repeated name
/// under a different parent keeps its text.
pub fn leveled_tsv(leaves: &[(String, String)]) -> String {
    let split: Vec<Vec<String>> = leaves.iter().map(|(p, _)| split_segments(p)).collect();
    let max_depth = split.iter().map(Vec::len).max().unwrap_or(0);

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(max_depth + 1);
    for depth in 0..max_depth {
        let mut row = Vec::with_capacity(split.len());
        for (col, segments) in split.iter().enumerate() {
            if depth >= segments.len() {
                row.push(String::new());
                continue;
            }
            let shared = col > 0
                && split[col - 1].len() > depth
                && split[col - 1][..=depth] == segments[..=depth];
            if shared {
                row.push("\u{2192}".to_string());
            } else {
                row.push(segments[depth].clone());
            }
        }
        rows.push(row);
    }
    rows.push(leaves.iter().map(|(_, v)| v.clone()).collect());

    rows.iter()
        .map(|row| row.join("\t"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flatten one JSON file. With no input the newest `*.json` in the current
/// directory is taken, which is where the manual exports land.
pub fn run(input: Option<&Path>, prefix: &str, keep_old: &str) -> Result<FlattenSummary> {
    let input = match input {
        Some(path) => path.to_path_buf(),
        None => newest_json(Path::new("."))?,
    };
    if !input.is_file() {
        return Err(ToolError::NotFound(input));
    }
    println!("   {} {}", "Reading".cyan(), input.display());

    let raw = fsutil::read_utf8(&input)?;
    let value: Value = serde_json::from_str(&raw)?;
    let leaves = extract_leaves(&value);
    let tsv = leveled_tsv(&leaves);

    let out_dir = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let archived = archive_outputs(&out_dir, prefix, keep_old)?;
    if archived > 0 {
        println!(
            "   {} {} earlier output file(s) -> {}/",
            "Archiving".yellow(),
            archived,
            keep_old
        );
    }

    let output = out_dir.join(format!("{}_{}.tsv", prefix, fsutil::run_stamp()));
    fs::write(&output, &tsv)?;
    println!(
        "   {} {} ({} leaves)",
        "Writing".green(),
        output.display(),
        leaves.len()
    );

    Ok(FlattenSummary {
        input,
        output,
        leaves: leaves.len(),
        archived,
    })
}

/// Move earlier `{prefix}*.tsv` outputs into the keep-old dir
fn archive_outputs(dir: &Path, prefix: &str, keep_old: &str) -> Result<usize> {
    let old_dir = dir.join(keep_old);
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    let mut moved = 0;
    for path in entries {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };
        if path.is_file() && name.starts_with(prefix) && name.ends_with(".tsv") {
            fsutil::move_into(&old_dir, &path)?;
            moved += 1;
        }
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // === Leaf extraction Tests ===

    #[test]
    fn test_extract_scalar_paths() {
        let value = serde_json::json!({"a": 1, "b": {"c": "x", "d": null}});
        let leaves = extract_leaves(&value);
        assert_eq!(
            leaves,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b.c".to_string(), "x".to_string()),
                ("b.d".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_extract_array_paths() {
        let value = serde_json::json!({"items": [{"id": 1}, {"id": 2}], "flag": true});
        let leaves = extract_leaves(&value);
        assert_eq!(
            leaves,
            vec![
                ("items[0].id".to_string(), "1".to_string()),
                ("items[1].id".to_string(), "2".to_string()),
                ("flag".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_extract_preserves_document_order() {
        let value: Value = serde_json::from_str(r#"{"zebra": 1, "apple": 2}"#).unwrap();
        let leaves = extract_leaves(&value);
        assert_eq!(leaves[0].0, "zebra");
        assert_eq!(leaves[1].0, "apple");
    }

    // === Path splitting Tests ===

    #[test]
    fn test_split_segments() {
        assert_eq!(
            split_segments("courses[0].conditions[1].note"),
            vec!["courses", "[0]", "conditions", "[1]", "note"]
        );
    }

    #[test]
    fn test_split_segments_top_level_array() {
        assert_eq!(split_segments("[2].name"), vec!["[2]", "name"]);
        assert_eq!(split_segments("plain"), vec!["plain"]);
    }

    // === Leveled TSV Tests ===

    #[test]
    fn test_depth_rows_then_value_row() {
        let leaves = vec![
            ("a.b".to_string(), "1".to_string()),
            ("a.c".to_string(), "2".to_string()),
        ];
        assert_eq!(leveled_tsv(&leaves), "a\t\u{2192}\nb\tc\n1\t2");
    }

    #[test]
    fn test_arrow_requires_shared_prefix() {
        // Same segment name under different parents must keep its text
        let leaves = vec![
            ("a.x".to_string(), "1".to_string()),
            ("b.x".to_string(), "2".to_string()),
        ];
        assert_eq!(leveled_tsv(&leaves), "a\tb\nx\tx\n1\t2");
    }

    #[test]
    fn test_short_columns_pad_with_blanks() {
        let leaves = vec![
            ("a".to_string(), "1".to_string()),
            ("b.c".to_string(), "2".to_string()),
        ];
        assert_eq!(leveled_tsv(&leaves), "a\tb\n\tc\n1\t2");
    }

    #[test]
    fn test_array_siblings_collapse_parent() {
        let leaves = vec![
            ("rows[0].id".to_string(), "1".to_string()),
            ("rows[0].name".to_string(), "n".to_string()),
            ("rows[1].id".to_string(), "2".to_string()),
        ];
        // rows row: first spelled out, then arrows while the prefix holds
        assert_eq!(
            leveled_tsv(&leaves),
            "rows\t\u{2192}\t\u{2192}\n[0]\t\u{2192}\t[1]\nid\tname\tid\n1\tn\t2"
        );
    }

    // === Run Tests ===

    #[test]
    fn test_run_writes_tsv_and_archives_previous() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("export.json");
        fs::write(&input, r#"{"a": {"b": 1}}"#).unwrap();
        fs::write(dir.path().join("output_20240101_000000.tsv"), "stale").unwrap();

        let summary = run(Some(&input), "output", "old").unwrap();
        assert_eq!(summary.archived, 1);
        assert_eq!(summary.leaves, 1);
        assert!(dir.path().join("old/output_20240101_000000.tsv").exists());
        assert_eq!(fs::read_to_string(&summary.output).unwrap(), "a\nb\n1");
    }

    #[test]
    fn test_newest_json_errors_when_none() {
        let dir = TempDir::new().unwrap();
        assert!(newest_json(dir.path()).is_err());
    }

    #[test]
    fn test_newest_json_prefers_latest_mtime() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("first.json"), "{}").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(25));
        fs::write(dir.path().join("second.json"), "{}").unwrap();
        let newest = newest_json(dir.path()).unwrap();
        assert_eq!(newest.file_name().unwrap(), "second.json");
    }
}
